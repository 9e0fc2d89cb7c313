//! Page retrieval and poem-link discovery.
//!
//! Fetching goes through two public services: a reader that renders any page
//! as Markdown, and a passthrough proxy returning the raw page when the reader
//! is down. Raw markup is also requested directly from the site, because only
//! the raw page carries the embedded render data.

mod locator;

use std::future::Future;
use std::time::Duration;

use poemday_shared::{FetchConfig, PoemError, Result};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use locator::{clean_url, locate_poem_url};

/// Maximum number of redirects to follow per request.
const MAX_REDIRECTS: usize = 5;

/// Maximum response size we consider valid (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// ContentFetcher
// ---------------------------------------------------------------------------

/// Source of page content for the extraction pipeline.
pub trait ContentFetcher {
    /// Markdown rendering of `url`. Fails only when every source failed.
    fn fetch_markdown(&self, url: &str) -> impl Future<Output = Result<String>> + Send;

    /// Raw markup of `url`, or `None` when it cannot be retrieved.
    fn fetch_markup(&self, url: &str) -> impl Future<Output = Option<String>> + Send;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// [`ContentFetcher`] backed by reqwest and the configured public services.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    reader_base: String,
    proxy_base: String,
}

impl HttpFetcher {
    /// Build a fetcher from the `[fetch]` config section.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PoemError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            reader_base: config.reader_base.trim_end_matches('/').to_string(),
            proxy_base: config.proxy_base.trim_end_matches('/').to_string(),
        })
    }

    /// Reader URL for `url`: the target is appended without its scheme.
    fn reader_url(&self, url: &str) -> String {
        let trimmed = url.trim();
        let bare = ["https://", "http://"]
            .iter()
            .find_map(|scheme| {
                trimmed
                    .get(..scheme.len())
                    .filter(|p| p.eq_ignore_ascii_case(scheme))
                    .map(|_| &trimmed[scheme.len()..])
            })
            .unwrap_or(trimmed);
        format!("{}/http://{bare}", self.reader_base)
    }

    /// Proxy URL for `url`, with the target percent-encoded as a query value.
    fn proxy_url(&self, url: &str) -> Result<String> {
        let endpoint = format!("{}/raw", self.proxy_base);
        Url::parse_with_params(&endpoint, &[("url", url.trim())])
            .map(String::from)
            .map_err(|e| PoemError::config(format!("invalid proxy base {}: {e}", self.proxy_base)))
    }

    /// GET `url` and decode the body as UTF-8 whatever charset is declared.
    async fn get_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PoemError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PoemError::Network(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(PoemError::Network(format!(
                    "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PoemError::Network(format!("{url}: failed to read body: {e}")))?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl ContentFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch_markdown(&self, url: &str) -> Result<String> {
        let mut failures: Vec<String> = Vec::new();

        let reader = self.reader_url(url);
        match self.get_text(&reader).await {
            Ok(body) => {
                info!(bytes = body.len(), "fetched via reader");
                return Ok(body);
            }
            Err(e) => {
                warn!(error = %e, "reader failed");
                failures.push(format!("reader: {e}"));
            }
        }

        match self.proxy_url(url) {
            Ok(proxy) => match self.get_text(&proxy).await {
                Ok(body) => {
                    info!(bytes = body.len(), "fetched via proxy");
                    return Ok(body);
                }
                Err(e) => {
                    warn!(error = %e, "proxy failed");
                    failures.push(format!("proxy: {e}"));
                }
            },
            Err(e) => failures.push(format!("proxy: {e}")),
        }

        Err(PoemError::Network(format!(
            "all sources failed for {url}: {}",
            failures.join("; ")
        )))
    }

    #[instrument(skip(self))]
    async fn fetch_markup(&self, url: &str) -> Option<String> {
        match self.get_text(url.trim()).await {
            Ok(body) => return Some(body),
            Err(e) => debug!(error = %e, "direct markup fetch failed"),
        }

        let proxy = self.proxy_url(url).ok()?;
        match self.get_text(&proxy).await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!(error = %e, "proxied markup fetch failed");
                None
            }
        }
    }
}
