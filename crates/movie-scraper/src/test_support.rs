//! In-memory transport and fixtures for unit tests.

use crate::api::Transport;
use crate::error::TransportError;
use async_trait::async_trait;
use shared::{GateConfig, ProviderConfig, ProvidersConfig, ProviderKind, ScraperConfig};
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

pub const GEVI_BASE: &str = "https://gevi.test/";
pub const GEVI_GATE: &str = "https://gevi.test/enter";
pub const AEBN_BASE: &str = "https://aebn.test/";

/// Canned reply for one URL
#[derive(Debug, Clone)]
pub enum MockResponse {
    Page(String),
    Bytes(Vec<u8>),
    Status(u16),
    Unreachable,
    /// Never answers; only cancellation gets the caller out
    Hang,
}

/// Transport serving canned replies keyed by URL
///
/// Unknown URLs answer 404. Every request and cookie is recorded, both
/// separately and interleaved in `events` as `GET <url>` / `COOKIE <url>`.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: HashMap<String, MockResponse>,
    requests: Mutex<Vec<String>>,
    cookies: Mutex<Vec<(String, String)>>,
    events: Mutex<Vec<String>>,
}

fn normalize(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, response: MockResponse) -> Self {
        self.responses.insert(normalize(url), response);
        self
    }

    pub fn page(self, url: &str, body: &str) -> Self {
        self.respond(url, MockResponse::Page(body.to_string()))
    }

    pub fn bytes(self, url: &str, body: &[u8]) -> Self {
        self.respond(url, MockResponse::Bytes(body.to_vec()))
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.respond(url, MockResponse::Status(status))
    }

    pub fn unreachable(self, url: &str) -> Self {
        self.respond(url, MockResponse::Unreachable)
    }

    pub fn hang(self, url: &str) -> Self {
        self.respond(url, MockResponse::Hang)
    }

    /// Mock with the GEVI redirect gate endpoint answering
    pub fn with_gates() -> Self {
        Self::new().page(GEVI_GATE, "<html><body>Welcome</body></html>")
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        let url = normalize(url);
        self.requests().iter().filter(|r| **r == url).count()
    }

    pub fn cookies(&self) -> Vec<(String, String)> {
        self.cookies.lock().unwrap().clone()
    }

    /// Requests and cookie injections in the order they happened
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    async fn reply(&self, url: &Url) -> Result<MockResponse, TransportError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.events.lock().unwrap().push(format!("GET {}", url));
        let response = self
            .responses
            .get(url.as_str())
            .cloned()
            .unwrap_or(MockResponse::Status(404));

        match response {
            MockResponse::Status(status) => Err(TransportError::Status {
                url: url.to_string(),
                status,
            }),
            MockResponse::Unreachable => Err(TransportError::Unreachable {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
            MockResponse::Hang => std::future::pending().await,
            other => Ok(other),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_text(&self, url: &Url) -> Result<String, TransportError> {
        match self.reply(url).await? {
            MockResponse::Page(body) => Ok(body),
            MockResponse::Bytes(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            _ => unreachable!("errors handled in reply"),
        }
    }

    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        match self.reply(url).await? {
            MockResponse::Page(body) => Ok(body.into_bytes()),
            MockResponse::Bytes(bytes) => Ok(bytes),
            _ => unreachable!("errors handled in reply"),
        }
    }

    fn set_cookie(&self, url: &Url, cookie: &str) {
        self.events.lock().unwrap().push(format!("COOKIE {}", url));
        self.cookies
            .lock()
            .unwrap()
            .push((url.to_string(), cookie.to_string()));
    }
}

/// Scraper configuration pointing at the mock hosts
pub fn test_config() -> ScraperConfig {
    ScraperConfig {
        language: "en".to_string(),
        priority: ProviderKind::ALL.to_vec(),
        dedup_provider: ProviderKind::Gevi,
        gate_validity_hours: 48,
        providers: ProvidersConfig {
            gevi: ProviderConfig {
                enabled: true,
                base_url: GEVI_BASE.to_string(),
                gate: GateConfig::Redirect {
                    endpoint: GEVI_GATE.to_string(),
                },
            },
            aebn: ProviderConfig {
                enabled: true,
                base_url: AEBN_BASE.to_string(),
                gate: GateConfig::Cookie {
                    cookie_name: "ageGated".to_string(),
                },
            },
        },
    }
}
