//! Error types for the scraping pipeline.
//!
//! Provider-level failures never surface through these types to the host:
//! adapters turn them into `Lookup::Unavailable`. What does surface is
//! cancellation, invalid input and transport errors from the binary
//! passthrough.

use thiserror::Error;

/// Failure of a single HTTP exchange
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Host unreachable for {url}: {message}")]
    Unreachable { url: String, message: String },
}

/// Error returned by the scraper's public operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid URL '{input}': {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ScrapeError {
    pub fn invalid_url(input: impl Into<String>, source: url::ParseError) -> Self {
        ScrapeError::InvalidUrl {
            input: input.into(),
            source,
        }
    }
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;
