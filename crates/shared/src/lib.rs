//! Shared library for the movie metadata scraper workspace.
//!
//! This crate provides common functionality used by the scraper library and
//! its command-line host:
//! - Configuration management
//! - Logging infrastructure
//! - Data models exchanged with the host (queries, candidates, records)

pub mod config;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::{
    Config, GateConfig, HttpConfig, LoggingConfig, ProviderConfig, ProvidersConfig, ScraperConfig,
    MAX_GATE_VALIDITY_HOURS,
};
pub use logging::LogConfig;
pub use models::*;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
