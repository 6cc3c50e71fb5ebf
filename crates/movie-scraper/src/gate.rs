//! Age-gate bypass per provider.
//!
//! Each provider owns one `GateManager`. Before any search or detail request
//! the adapter calls `ensure_access`, which performs the bypass when there is
//! no session yet or the previous one has expired:
//!
//! - cookie gates get an "entered" cookie scoped to the provider origin whose
//!   value is `<entered epoch ms>_<expiry epoch ms>`
//! - redirect gates get one GET against the gate endpoint, body discarded
//!
//! Transport failures while bypassing are returned to the caller unchanged
//! and leave the session untouched, so the next call tries again.

use crate::api::Transport;
use crate::cancel::CancelSignal;
use crate::error::{Result, ScrapeError};
use chrono::{DateTime, Duration, Utc};
use shared::{GateConfig, ProviderKind, MAX_GATE_VALIDITY_HOURS};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

/// How a provider's age gate is bypassed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateStrategy {
    None,
    Cookie { origin: Url, cookie_name: String },
    Redirect { endpoint: Url },
}

impl GateStrategy {
    /// Build from configuration; cookies are scoped to `base_url`
    pub fn from_config(config: &GateConfig, base_url: &Url) -> Result<Self> {
        match config {
            GateConfig::None => Ok(GateStrategy::None),
            GateConfig::Cookie { cookie_name } => Ok(GateStrategy::Cookie {
                origin: base_url.clone(),
                cookie_name: cookie_name.clone(),
            }),
            GateConfig::Redirect { endpoint } => {
                let endpoint = base_url
                    .join(endpoint)
                    .map_err(|e| ScrapeError::invalid_url(endpoint.as_str(), e))?;
                Ok(GateStrategy::Redirect { endpoint })
            }
        }
    }
}

/// A live bypass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSession {
    pub entered_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl GateSession {
    pub fn starting_at(now: DateTime<Utc>, validity: Duration) -> Self {
        Self {
            entered_at: now,
            expires_at: now.checked_add_signed(validity).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Expiry must be strictly in the future at time of use
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn cookie_value(&self) -> String {
        format!(
            "{}_{}",
            self.entered_at.timestamp_millis(),
            self.expires_at.timestamp_millis()
        )
    }
}

/// Gate state for one provider
#[derive(Debug)]
pub struct GateManager {
    provider: ProviderKind,
    strategy: GateStrategy,
    validity: Duration,
    session: Mutex<Option<GateSession>>,
}

impl GateManager {
    /// `validity` is capped at `MAX_GATE_VALIDITY_HOURS`
    pub fn new(provider: ProviderKind, strategy: GateStrategy, validity: std::time::Duration) -> Self {
        let cap = std::time::Duration::from_secs(MAX_GATE_VALIDITY_HOURS * 3600);
        let validity = Duration::from_std(validity.min(cap)).unwrap_or_else(|_| Duration::hours(48));
        Self {
            provider,
            strategy,
            validity,
            session: Mutex::new(None),
        }
    }

    /// Current session, if one was established
    pub async fn session(&self) -> Option<GateSession> {
        *self.session.lock().await
    }

    /// Make sure the provider is reachable right now
    pub async fn ensure_access(&self, transport: &dyn Transport, cancel: &CancelSignal) -> Result<bool> {
        self.ensure_access_at(transport, cancel, Utc::now()).await
    }

    /// Make sure the provider is reachable at `now`
    ///
    /// Returns `true` when a bypass was performed, `false` when the existing
    /// session was still valid. The session lock is held across the bypass.
    pub async fn ensure_access_at(
        &self,
        transport: &dyn Transport,
        cancel: &CancelSignal,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut session = self.session.lock().await;

        if let Some(current) = session.as_ref() {
            if current.is_valid_at(now) {
                return Ok(false);
            }
            debug!(
                provider = %self.provider,
                expired_at = %current.expires_at,
                "Age gate session expired"
            );
        }

        let fresh = GateSession::starting_at(now, self.validity);

        match &self.strategy {
            GateStrategy::None => {}
            GateStrategy::Cookie { origin, cookie_name } => {
                let cookie = format!(
                    "{}={}; Path=/; Max-Age={}",
                    cookie_name,
                    fresh.cookie_value(),
                    self.validity.num_seconds()
                );
                transport.set_cookie(origin, &cookie);
            }
            GateStrategy::Redirect { endpoint } => {
                cancel.guard(transport.get_text(endpoint)).await??;
            }
        }

        *session = Some(fresh);
        info!(
            provider = %self.provider,
            expires_at = %fresh.expires_at,
            "Age gate bypass established"
        );

        Ok(true)
    }
}
