//! Cookie-aware HTTP client with a fixed browser identity.

use crate::error::{ScrapeError, TransportError};
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// User-Agent presented on every outbound request
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// HTTP capability the scraper needs from its host
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the body as text
    async fn get_text(&self, url: &Url) -> Result<String, TransportError>;

    /// GET `url` and return the raw body
    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, TransportError>;

    /// Store a `Set-Cookie` style cookie for the origin of `url`
    fn set_cookie(&self, url: &Url, cookie: &str);
}

/// `reqwest` client sharing one cookie jar across all providers
pub struct HttpClient {
    client: Client,
    jar: Arc<Jar>,
}

impl HttpClient {
    /// Create a new client
    ///
    /// `language` is passed through as Accept-Language. `timeout` is left to
    /// the host; `None` means requests never time out on their own.
    pub fn new(language: &str, timeout: Option<Duration>) -> Result<Self, ScrapeError> {
        let jar = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        match HeaderValue::from_str(language) {
            Ok(value) if !language.trim().is_empty() => {
                headers.insert(ACCEPT_LANGUAGE, value);
            }
            _ => warn!(language = language, "Ignoring unusable language tag"),
        }

        let mut builder = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .cookie_provider(Arc::clone(&jar));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(ScrapeError::Client)?;

        Ok(Self { client, jar })
    }

    /// GET a URL, treating any non-success status as an error
    async fn get(&self, url: &Url) -> Result<Response, TransportError> {
        debug!(url = %url, "Making request");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| TransportError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Request failed");
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        debug!(url = %url, status = %status, "Request successful");
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get_text(&self, url: &Url) -> Result<String, TransportError> {
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|source| TransportError::Network {
                url: url.to_string(),
                source,
            })
    }

    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|source| TransportError::Network {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }

    fn set_cookie(&self, url: &Url, cookie: &str) {
        debug!(url = %url, "Setting cookie");
        self.jar.add_cookie_str(cookie, url);
    }
}
