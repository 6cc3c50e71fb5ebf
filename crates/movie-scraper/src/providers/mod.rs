//! Provider search and detail adapters.
//!
//! Every catalog site is described by a `SiteLayout` (URL building and
//! candidate extraction); `ProviderAdapter` runs the shared pipeline on top
//! of a layout: gate, fetch, age-gate check, extract.

pub mod aebn;
pub mod gevi;

pub use aebn::AebnLayout;
pub use gevi::GeviLayout;

use crate::api::Transport;
use crate::cancel::CancelSignal;
use crate::error::{Result, ScrapeError};
use crate::extract::{self, Page};
use crate::gate::{GateManager, GateStrategy};
use shared::{CandidateResult, MetadataRecord, ProviderKind, ScraperConfig};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of one provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// Page fetched and parsed
    Found(T),
    /// Page reachable but nothing usable (age gate, no match)
    NoContent,
    /// Provider could not be reached
    Unavailable(String),
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lookup::Found(_) => "found",
            Lookup::NoContent => "no_content",
            Lookup::Unavailable(_) => "unavailable",
        }
    }
}

/// Provider-specific page knowledge
pub trait SiteLayout: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Search page for a free-text query
    fn search_url(&self, base_url: &Url, query: &str) -> std::result::Result<Url, url::ParseError> {
        base_url.join(&format!("/search?q={}", urlencoding::encode(query)))
    }

    /// Candidates on a search results page, in page order
    ///
    /// Only links on the page's own site qualify.
    fn extract_candidates(&self, page: &Page) -> Vec<CandidateResult>;
}

/// Layout for a provider kind
pub fn layout_for(kind: ProviderKind) -> Box<dyn SiteLayout> {
    match kind {
        ProviderKind::Gevi => Box::new(GeviLayout),
        ProviderKind::Aebn => Box::new(AebnLayout),
    }
}

/// Search and detail operations for one provider
pub struct ProviderAdapter {
    kind: ProviderKind,
    base_url: Url,
    layout: Box<dyn SiteLayout>,
    gate: GateManager,
    transport: Arc<dyn Transport>,
}

impl ProviderAdapter {
    pub fn new(
        layout: Box<dyn SiteLayout>,
        base_url: Url,
        gate: GateManager,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            kind: layout.kind(),
            base_url,
            layout,
            gate,
            transport,
        }
    }

    /// Build the adapter for `kind` from configuration
    pub fn from_config(
        kind: ProviderKind,
        config: &ScraperConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let settings = config.provider(kind);
        let base_url = Url::parse(&settings.base_url)
            .map_err(|e| ScrapeError::invalid_url(settings.base_url.as_str(), e))?;
        let strategy = GateStrategy::from_config(&settings.gate, &base_url)?;
        let gate = GateManager::new(kind, strategy, config.gate_validity());

        Ok(Self::new(layout_for(kind), base_url, gate, transport))
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Whether `url` points at this provider's site
    pub fn owns_url(&self, url: &Url) -> bool {
        extract::same_site(url, &self.base_url)
    }

    /// Search the provider for `query`
    ///
    /// Candidates are deduplicated by canonical URL (case-insensitive),
    /// keeping the first occurrence.
    pub async fn search(&self, query: &str, cancel: &CancelSignal) -> Result<Lookup<Vec<CandidateResult>>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Lookup::Found(Vec::new()));
        }

        let url = match self.layout.search_url(&self.base_url, query) {
            Ok(url) => url,
            Err(e) => {
                warn!(provider = %self.kind, query = query, error = %e, "Cannot build search URL");
                return Ok(Lookup::Unavailable(e.to_string()));
            }
        };

        info!(provider = %self.kind, query = query, "Searching provider");

        let body = match self.load(&url, cancel).await? {
            Lookup::Found(body) => body,
            Lookup::NoContent => return Ok(Lookup::NoContent),
            Lookup::Unavailable(reason) => return Ok(Lookup::Unavailable(reason)),
        };

        let candidates = self.extract_candidates(&url, &body);
        debug!(
            provider = %self.kind,
            candidates = candidates.len(),
            "Search complete"
        );

        Ok(Lookup::Found(candidates))
    }

    /// Resolve a detail URL, site-relative key or free-text name to a record
    pub async fn fetch_detail(&self, identifier_or_name: &str, cancel: &CancelSignal) -> Result<Lookup<MetadataRecord>> {
        let input = identifier_or_name.trim();
        if input.is_empty() {
            return Ok(Lookup::NoContent);
        }

        let (url, fallback_title) = match self.direct_url(input) {
            Some(url) => {
                let title = extract::last_path_segment(&url).map(|slug| extract::humanize_slug(&slug));
                (url, title)
            }
            None => {
                let candidates = match self.search(input, cancel).await? {
                    Lookup::Found(candidates) => candidates,
                    Lookup::NoContent => return Ok(Lookup::NoContent),
                    Lookup::Unavailable(reason) => return Ok(Lookup::Unavailable(reason)),
                };

                let Some(first) = candidates.into_iter().next() else {
                    debug!(provider = %self.kind, query = input, "No search candidates for detail lookup");
                    return Ok(Lookup::NoContent);
                };
                let url = match first.source_url().map(Url::parse) {
                    Some(Ok(url)) => url,
                    _ => return Ok(Lookup::NoContent),
                };
                (url, Some(first.display_name))
            }
        };

        debug!(provider = %self.kind, url = %url, "Fetching detail page");

        let body = match self.load(&url, cancel).await? {
            Lookup::Found(body) => body,
            Lookup::NoContent => return Ok(Lookup::NoContent),
            Lookup::Unavailable(reason) => return Ok(Lookup::Unavailable(reason)),
        };

        let fallback_title = fallback_title.unwrap_or_else(|| input.to_string());
        Ok(Lookup::Found(self.extract_record(&url, &body, fallback_title)))
    }

    /// Establish the age-gate bypass if needed
    pub async fn ensure_gate(&self, cancel: &CancelSignal) -> Result<()> {
        self.gate
            .ensure_access(self.transport.as_ref(), cancel)
            .await
            .map(|_| ())
    }

    /// Gate, fetch and screen one page
    async fn load(&self, url: &Url, cancel: &CancelSignal) -> Result<Lookup<String>> {
        match self.ensure_gate(cancel).await {
            Ok(()) => {}
            Err(ScrapeError::Cancelled) => return Err(ScrapeError::Cancelled),
            Err(e) => {
                warn!(provider = %self.kind, error = %e, "Age gate bypass failed");
                return Ok(Lookup::Unavailable(e.to_string()));
            }
        }

        let body = match cancel.guard(self.transport.get_text(url)).await? {
            Ok(body) => body,
            Err(e) => {
                warn!(provider = %self.kind, url = %url, error = %e, "Provider unreachable");
                return Ok(Lookup::Unavailable(e.to_string()));
            }
        };

        if extract::is_age_gate(&body) {
            info!(provider = %self.kind, url = %url, "Age gate interstitial returned");
            return Ok(Lookup::NoContent);
        }

        Ok(Lookup::Found(body))
    }

    fn direct_url(&self, input: &str) -> Option<Url> {
        let lower = input.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Url::parse(input).ok()
        } else if input.starts_with('/') {
            self.base_url.join(input).ok()
        } else {
            None
        }
    }

    fn extract_candidates(&self, url: &Url, body: &str) -> Vec<CandidateResult> {
        let page = Page::parse(url.clone(), body);
        dedup_by_url(self.layout.extract_candidates(&page))
    }

    fn extract_record(&self, url: &Url, body: &str, fallback_title: String) -> MetadataRecord {
        let page = Page::parse(url.clone(), body);
        let title = page.primary_title().unwrap_or(fallback_title);
        MetadataRecord::resolved(self.kind, url.as_str(), title, page.meta_description())
    }
}

/// Keep the first candidate per canonical URL, compared case-insensitively
pub fn dedup_by_url(candidates: Vec<CandidateResult>) -> Vec<CandidateResult> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| {
            let key = candidate.source_url().unwrap_or_default().to_lowercase();
            seen.insert(key)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::cancel_pair;
    use crate::test_support::{test_config, MockTransport, AEBN_BASE, GEVI_BASE, GEVI_GATE};

    const GEVI_SEARCH: &str = "https://gevi.test/search?q=Test%20Movie";

    fn gevi(transport: MockTransport) -> (ProviderAdapter, Arc<MockTransport>) {
        adapter(ProviderKind::Gevi, transport)
    }

    fn adapter(kind: ProviderKind, transport: MockTransport) -> (ProviderAdapter, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let adapter = ProviderAdapter::from_config(kind, &test_config(), transport.clone()).unwrap();
        (adapter, transport)
    }

    #[tokio::test]
    async fn test_search_builds_encoded_url_and_gates_first() {
        let (adapter, transport) = gevi(
            MockTransport::with_gates().page(GEVI_SEARCH, r#"<a href="/movie/test-1">Test Movie</a>"#),
        );

        let lookup = adapter.search("Test Movie", &CancelSignal::never()).await.unwrap();
        let candidates = lookup.found().unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].display_name, "Test Movie");
        assert_eq!(candidates[0].source_url(), Some("https://gevi.test/movie/test-1"));

        assert_eq!(transport.requests(), vec![GEVI_GATE.to_string(), GEVI_SEARCH.to_string()]);
    }

    #[tokio::test]
    async fn test_search_age_gate_page_yields_no_content() {
        let (adapter, _) = gevi(MockTransport::with_gates().page(
            GEVI_SEARCH,
            r#"<h1>Please verify your age</h1><a href="/movie/test-1">Test Movie</a>"#,
        ));

        let lookup = adapter.search("Test Movie", &CancelSignal::never()).await.unwrap();
        assert_eq!(lookup, Lookup::NoContent);
    }

    #[tokio::test]
    async fn test_search_unreachable_is_unavailable() {
        let (adapter, _) = gevi(MockTransport::with_gates().unreachable(GEVI_SEARCH));
        let lookup = adapter.search("Test Movie", &CancelSignal::never()).await.unwrap();
        assert!(matches!(lookup, Lookup::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_search_gate_failure_is_unavailable_without_search_request() {
        let (adapter, transport) = gevi(MockTransport::new().status(GEVI_GATE, 503));
        let lookup = adapter.search("Test Movie", &CancelSignal::never()).await.unwrap();
        assert!(matches!(lookup, Lookup::Unavailable(_)));
        assert_eq!(transport.request_count(GEVI_SEARCH), 0);
    }

    #[tokio::test]
    async fn test_search_dedupes_by_url_case_insensitively() {
        let (adapter, _) = gevi(MockTransport::with_gates().page(
            GEVI_SEARCH,
            r#"<a href="/movie/Test-1">Test Movie</a>
               <a href="/MOVIE/test-1">Duplicate</a>
               <a href="/movie/other">Other</a>"#,
        ));

        let candidates = adapter
            .search("Test Movie", &CancelSignal::never())
            .await
            .unwrap()
            .found()
            .unwrap();
        let names: Vec<_> = candidates.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, vec!["Test Movie", "Other"]);
    }

    #[tokio::test]
    async fn test_search_cancellation_propagates() {
        let (adapter, _) = gevi(MockTransport::with_gates().hang(GEVI_SEARCH));
        let (handle, signal) = cancel_pair();

        let task = tokio::spawn(async move { adapter.search("Test Movie", &signal).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        handle.cancel();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ScrapeError::Cancelled)));
    }

    #[tokio::test]
    async fn test_detail_by_url_reads_title_and_description() {
        let detail = "https://gevi.test/movie/test-1";
        let (adapter, transport) = gevi(MockTransport::with_gates().page(
            detail,
            r#"<html><head><title>GEVI - Test Movie</title>
               <meta name="description" content="A test synopsis."></head>
               <body><h1>Test Movie</h1></body></html>"#,
        ));

        let record = adapter
            .fetch_detail(detail, &CancelSignal::never())
            .await
            .unwrap()
            .found()
            .unwrap();

        assert_eq!(record.title, "Test Movie");
        assert_eq!(record.description, "A test synopsis.");
        assert_eq!(record.genres, vec!["Adult".to_string()]);
        assert!(record.studios.is_empty());
        assert_eq!(record.rating.as_deref(), Some("XXX"));
        assert_eq!(record.source.unwrap().value, detail);
        assert_eq!(transport.request_count(GEVI_SEARCH), 0);
    }

    #[tokio::test]
    async fn test_detail_by_name_uses_first_candidate() {
        let (adapter, transport) = gevi(
            MockTransport::with_gates()
                .page(
                    GEVI_SEARCH,
                    r#"<a href="/movie/test-1">Test Movie</a><a href="/movie/test-2">Test Movie 2</a>"#,
                )
                .page("https://gevi.test/movie/test-1", "<p>no headings here</p>"),
        );

        let record = adapter
            .fetch_detail("Test Movie", &CancelSignal::never())
            .await
            .unwrap()
            .found()
            .unwrap();

        // No <h1>/<title>: the candidate's display name is kept
        assert_eq!(record.title, "Test Movie");
        assert_eq!(record.description, "");
        assert_eq!(transport.request_count("https://gevi.test/movie/test-2"), 0);
    }

    #[tokio::test]
    async fn test_detail_by_site_relative_key() {
        let (adapter, _) = adapter(
            ProviderKind::Aebn,
            MockTransport::new().page("https://aebn.test/movies/77/hot-summer", "<p>plain</p>"),
        );

        let record = adapter
            .fetch_detail("/movies/77/hot-summer", &CancelSignal::never())
            .await
            .unwrap()
            .found()
            .unwrap();
        assert_eq!(record.title, "Hot Summer");
        assert_eq!(record.source.unwrap().value, format!("{}movies/77/hot-summer", AEBN_BASE));
    }

    #[tokio::test]
    async fn test_detail_without_candidates_is_no_content() {
        let (adapter, _) = gevi(MockTransport::with_gates().page(GEVI_SEARCH, "<p>No results</p>"));
        let lookup = adapter.fetch_detail("Test Movie", &CancelSignal::never()).await.unwrap();
        assert_eq!(lookup, Lookup::NoContent);
    }

    #[tokio::test]
    async fn test_detail_age_gate_is_no_content() {
        let detail = "https://gevi.test/movie/test-1";
        let (adapter, _) = gevi(MockTransport::with_gates().page(
            detail,
            "<h1>Test Movie</h1><p>Please verify your age to continue</p>",
        ));
        let lookup = adapter.fetch_detail(detail, &CancelSignal::never()).await.unwrap();
        assert_eq!(lookup, Lookup::NoContent);
    }

    #[tokio::test]
    async fn test_detail_network_error_is_unavailable() {
        let detail = "https://gevi.test/movie/test-1";
        let (adapter, _) = gevi(MockTransport::with_gates().status(detail, 500));
        let lookup = adapter.fetch_detail(detail, &CancelSignal::never()).await.unwrap();
        assert!(matches!(lookup, Lookup::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_search_keeps_only_provider_links() {
        let (adapter, _) = gevi(MockTransport::with_gates().page(
            GEVI_SEARCH,
            r#"<a href="https://ads.example/video/promo">Buy now</a>
               <a href="/movie/test-1">Test Movie</a>"#,
        ));

        let candidates = adapter
            .search("Test Movie", &CancelSignal::never())
            .await
            .unwrap()
            .found()
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source_url(), Some("https://gevi.test/movie/test-1"));
    }

    #[tokio::test]
    async fn test_detail_by_name_never_follows_foreign_link() {
        let (adapter, transport) = gevi(MockTransport::with_gates().page(
            GEVI_SEARCH,
            r#"<a href="https://ads.example/video/promo">Test Movie</a>"#,
        ));

        let lookup = adapter.fetch_detail("Test Movie", &CancelSignal::never()).await.unwrap();
        assert_eq!(lookup, Lookup::NoContent);
        assert_eq!(transport.request_count("https://ads.example/video/promo"), 0);
    }

    #[tokio::test]
    async fn test_aebn_cookie_precedes_first_request() {
        let aebn_search = "https://aebn.test/search?q=Test%20Movie";
        let detail = "https://aebn.test/movies/1/test-movie";
        let (adapter, transport) = adapter(
            ProviderKind::Aebn,
            MockTransport::new()
                .page(aebn_search, r#"<a href="/movies/1/test-movie">x</a>"#)
                .page(detail, "<h1>Test Movie</h1>"),
        );
        let cancel = CancelSignal::never();

        adapter.search("Test Movie", &cancel).await.unwrap();
        adapter.fetch_detail(detail, &cancel).await.unwrap();

        assert_eq!(
            transport.events(),
            vec![
                format!("COOKIE {}", AEBN_BASE),
                format!("GET {}", aebn_search),
                format!("GET {}", detail),
            ]
        );
        assert!(transport.cookies()[0].1.starts_with("ageGated="));
    }

    #[test]
    fn test_owns_url_ignores_www() {
        let (adapter, _) = gevi(MockTransport::new());
        assert!(adapter.owns_url(&Url::parse("https://www.gevi.test/img/1.jpg").unwrap()));
        assert!(adapter.owns_url(&Url::parse(GEVI_BASE).unwrap()));
        assert!(!adapter.owns_url(&Url::parse("https://cdn.test/1.jpg").unwrap()));
    }

    #[test]
    fn test_dedup_by_url_keeps_first() {
        let candidates = vec![
            CandidateResult::new(ProviderKind::Aebn, "One", "https://aebn.test/movies/1/a"),
            CandidateResult::new(ProviderKind::Aebn, "Two", "HTTPS://AEBN.TEST/MOVIES/1/A"),
            CandidateResult::new(ProviderKind::Aebn, "Three", "https://aebn.test/movies/2/b"),
        ];
        let deduped = dedup_by_url(candidates);
        let names: Vec<_> = deduped.iter().map(|c| c.display_name.as_str()).collect();
        assert_eq!(names, vec!["One", "Three"]);
    }
}
