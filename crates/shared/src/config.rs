//! Configuration management for the movie metadata scraper.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use crate::models::ProviderKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Upper bound for `gate_validity_hours` (one year)
pub const MAX_GATE_VALIDITY_HOURS: u64 = 24 * 365;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logging settings
    pub logging: LoggingConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Scraper settings
    pub scraper: ScraperConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds (None = no timeout)
    pub timeout_seconds: Option<u64>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// Scraper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Language tag sent as Accept-Language
    pub language: String,

    /// Provider priority, highest first
    pub priority: Vec<ProviderKind>,

    /// Provider whose identifier is the identity key when deduplicating candidates
    pub dedup_provider: ProviderKind,

    /// How long an age-gate bypass stays valid
    pub gate_validity_hours: u64,

    /// Per-provider settings
    pub providers: ProvidersConfig,
}

/// Settings for every known provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub gevi: ProviderConfig,
    pub aebn: ProviderConfig,
}

/// Settings for one catalog provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether the provider is queried at all
    pub enabled: bool,

    /// Site origin, e.g. https://www.gevi.gr
    pub base_url: String,

    /// Age-gate bypass strategy
    pub gate: GateConfig,
}

/// Age-gate bypass strategy for a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GateConfig {
    /// Provider has no age gate
    None,
    /// Inject an "entered" cookie scoped to the provider origin
    Cookie { cookie_name: String },
    /// GET a known endpoint once and discard the body
    Redirect { endpoint: String },
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            priority: ProviderKind::ALL.to_vec(),
            dedup_provider: ProviderKind::Gevi,
            gate_validity_hours: 48,
            providers: ProvidersConfig {
                gevi: ProviderConfig {
                    enabled: true,
                    base_url: "https://www.gevi.gr".to_string(),
                    gate: GateConfig::Redirect {
                        endpoint: "https://www.gevi.gr/age-verification?confirm=yes".to_string(),
                    },
                },
                aebn: ProviderConfig {
                    enabled: true,
                    base_url: "https://www.aebn.net".to_string(),
                    gate: GateConfig::Cookie {
                        cookie_name: "ageGated".to_string(),
                    },
                },
            },
        }
    }
}

impl ScraperConfig {
    /// Settings for a single provider
    pub fn provider(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Gevi => &self.providers.gevi,
            ProviderKind::Aebn => &self.providers.aebn,
        }
    }

    /// Enabled flag of every known provider
    pub fn provider_enabled(&self) -> BTreeMap<ProviderKind, bool> {
        ProviderKind::ALL
            .iter()
            .map(|kind| (*kind, self.provider(*kind).enabled))
            .collect()
    }

    /// Enabled providers, highest priority first
    ///
    /// Providers missing from `priority` are appended in declaration order.
    pub fn enabled_in_priority_order(&self) -> Vec<ProviderKind> {
        let mut ordered: Vec<ProviderKind> = Vec::with_capacity(ProviderKind::ALL.len());
        for kind in self.priority.iter().chain(ProviderKind::ALL.iter()) {
            if !ordered.contains(kind) {
                ordered.push(*kind);
            }
        }
        ordered.retain(|kind| self.provider(*kind).enabled);
        ordered
    }

    /// How long an age-gate bypass stays valid
    ///
    /// Clamped to `1..=MAX_GATE_VALIDITY_HOURS` hours.
    pub fn gate_validity(&self) -> Duration {
        let hours = self.gate_validity_hours.clamp(1, MAX_GATE_VALIDITY_HOURS);
        Duration::from_secs(hours * 3600)
    }

    /// Reject settings the scraper cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_GATE_VALIDITY_HOURS).contains(&self.gate_validity_hours) {
            anyhow::bail!(
                "gate_validity_hours must be between 1 and {}, got {}",
                MAX_GATE_VALIDITY_HOURS,
                self.gate_validity_hours
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                log_dir: "logs".to_string(),
                default_level: "info".to_string(),
                console: true,
                file: true,
                json_format: false,
            },
            http: HttpConfig {
                timeout_seconds: Some(30),
            },
            scraper: ScraperConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .scraper
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Load configuration from a TOML file or create default if not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::from_file(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            Self::default()
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }
}
