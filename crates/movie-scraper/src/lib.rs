//! Movie metadata scraper library for adult catalog websites.
//!
//! This library searches the GEVI and AEBN catalogs for titles, passes their
//! age gates, and turns detail pages into metadata records for a media
//! server host.

pub mod aggregator;
pub mod api;
pub mod cancel;
pub mod error;
pub mod extract;
pub mod gate;
pub mod providers;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregator::{dedup_candidates, MetadataAggregator};
pub use api::{HttpClient, Transport};
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use error::{ScrapeError, TransportError};
pub use gate::{GateManager, GateStrategy};
pub use providers::{Lookup, ProviderAdapter, SiteLayout};
