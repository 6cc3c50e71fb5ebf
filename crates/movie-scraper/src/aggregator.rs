//! Multi-provider search and resolution.
//!
//! Providers are consulted one after another in priority order. A provider
//! that is unreachable or returns nothing usable is logged and skipped; only
//! cancellation aborts the whole operation.

use crate::api::Transport;
use crate::cancel::CancelSignal;
use crate::error::{Result, ScrapeError};
use crate::providers::{Lookup, ProviderAdapter};
use shared::{CandidateResult, MetadataRecord, MovieQuery, ProviderKind, ScraperConfig};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Entry point used by the host
pub struct MetadataAggregator {
    adapters: Vec<ProviderAdapter>,
    dedup_provider: ProviderKind,
    transport: Arc<dyn Transport>,
}

impl MetadataAggregator {
    /// `adapters` must already be in priority order
    pub fn new(adapters: Vec<ProviderAdapter>, dedup_provider: ProviderKind, transport: Arc<dyn Transport>) -> Self {
        Self {
            adapters,
            dedup_provider,
            transport,
        }
    }

    /// Build adapters for every enabled provider
    pub fn from_config(config: &ScraperConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let adapters = config
            .enabled_in_priority_order()
            .into_iter()
            .map(|kind| ProviderAdapter::from_config(kind, config, transport.clone()))
            .collect::<Result<Vec<_>>>()?;

        info!(
            providers = ?adapters.iter().map(ProviderAdapter::kind).collect::<Vec<_>>(),
            dedup_provider = %config.dedup_provider,
            "Metadata aggregator ready"
        );

        Ok(Self::new(adapters, config.dedup_provider, transport))
    }

    /// Enabled providers, highest priority first
    pub fn providers(&self) -> Vec<ProviderKind> {
        self.adapters.iter().map(ProviderAdapter::kind).collect()
    }

    /// Search every enabled provider and merge the hits
    pub async fn list_candidates(&self, name: &str, cancel: &CancelSignal) -> Result<Vec<CandidateResult>> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(Vec::new());
        }

        let mut merged = Vec::new();
        for adapter in &self.adapters {
            let lookup = adapter.search(name, cancel).await?;
            log_outcome(adapter.kind(), "search", &lookup);
            if let Lookup::Found(candidates) = lookup {
                merged.extend(candidates);
            }
        }

        let candidates = dedup_candidates(merged, self.dedup_provider);
        info!(query = name, candidates = candidates.len(), "Candidate listing complete");
        Ok(candidates)
    }

    /// Resolve a query to one record
    ///
    /// Stored identifiers are tried first, then the free-text name, each
    /// pass in priority order. The first record found wins; if none is found
    /// the record is empty.
    pub async fn resolve(&self, query: &MovieQuery, cancel: &CancelSignal) -> Result<MetadataRecord> {
        for adapter in &self.adapters {
            let Some(identifier) = query
                .identifiers
                .get(&adapter.kind())
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
            else {
                continue;
            };

            let lookup = adapter.fetch_detail(identifier, cancel).await?;
            log_outcome(adapter.kind(), "detail_by_identifier", &lookup);
            if let Lookup::Found(record) = lookup {
                return Ok(record);
            }
        }

        let name = query.name.trim();
        if !name.is_empty() {
            for adapter in &self.adapters {
                let lookup = adapter.fetch_detail(name, cancel).await?;
                log_outcome(adapter.kind(), "detail_by_name", &lookup);
                if let Lookup::Found(record) = lookup {
                    return Ok(record);
                }
            }
        }

        info!(query = name, "No provider resolved the query");
        Ok(MetadataRecord::empty())
    }

    /// Download raw bytes (cover images) through the shared client
    ///
    /// URLs on a provider's host get that provider's age-gate first.
    pub async fn fetch_binary(&self, url: &str, cancel: &CancelSignal) -> Result<Vec<u8>> {
        let url = Url::parse(url.trim()).map_err(|e| ScrapeError::invalid_url(url, e))?;

        if let Some(adapter) = self.adapters.iter().find(|adapter| adapter.owns_url(&url)) {
            adapter.ensure_gate(cancel).await?;
        }

        debug!(url = %url, "Fetching binary resource");
        let bytes = cancel.guard(self.transport.get_bytes(&url)).await??;
        Ok(bytes)
    }
}

fn log_outcome<T>(provider: ProviderKind, operation: &str, lookup: &Lookup<T>) {
    let outcome = lookup.as_str();
    match lookup {
        Lookup::Found(_) => debug!(provider = %provider, operation, outcome, "Provider answered"),
        Lookup::NoContent => info!(provider = %provider, operation, outcome, "Provider had no content"),
        Lookup::Unavailable(reason) => warn!(
            provider = %provider,
            operation,
            outcome,
            reason = reason.as_str(),
            "Provider unavailable"
        ),
    }
}

/// Identity of a candidate across providers
///
/// The identifier issued by `key_provider` when the candidate carries one,
/// otherwise the display name; both compared lowercase.
pub fn candidate_key(candidate: &CandidateResult, key_provider: ProviderKind) -> String {
    match candidate.identifiers.get(&key_provider) {
        Some(id) if !id.trim().is_empty() => format!("id:{}", id.trim().to_lowercase()),
        _ => format!("name:{}", candidate.display_name.trim().to_lowercase()),
    }
}

/// Keep the first candidate per identity key, preserving order
pub fn dedup_candidates(candidates: Vec<CandidateResult>, key_provider: ProviderKind) -> Vec<CandidateResult> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate_key(candidate, key_provider)))
        .collect()
}
