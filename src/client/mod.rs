//! HTTP page fetcher
//!
//! One GET per call against the configured origin, with a bounded
//! retry-with-delay loop. Transport failures and 5xx responses are
//! retryable; every other status is success as far as the client is
//! concerned, since a missing record on this site still renders as a
//! regular page. Callers inspect body content, not status codes.

use std::time::Duration;

use reqwest::Client as ReqwestClient;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};

/// Baseline request headers, simulating a desktop browser
const DEFAULT_HEADERS: &[(&str, &str)] = &[
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    ),
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.5"),
];

/// Configuration for the page fetcher
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Site origin requests are issued against
    pub base_url: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// Sleep between attempts
    pub retry_delay: Duration,

    /// Optional proxy URL
    pub proxy: Option<String>,

    /// Header overrides merged onto the baseline headers; override wins on
    /// key collision
    pub headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: crate::DEFAULT_ORIGIN.to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            proxy: None,
            headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Create a new builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the site origin
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the retry bound and the delay between attempts
    pub fn retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.config.max_retries = max_retries;
        self.config.retry_delay = retry_delay;
        self
    }

    /// Route requests through a proxy
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Add a header override
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.push((key.into(), value.into()));
        self
    }

    /// Build the configuration
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// HTTP client for fetching raw page text
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    config: ClientConfig,
}

#[cfg(test)]
impl HttpClient {
    /// Point the client at a test server
    pub fn set_base_url(&mut self, url: String) {
        self.config.base_url = url;
    }
}

impl HttpClient {
    /// Build a client from the given configuration.
    ///
    /// Fails on an unusable proxy URL; an empty origin is only rejected at
    /// fetch time so a config can be staged incrementally.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = ReqwestClient::builder().timeout(config.timeout);
        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| Error::Config(format!("invalid proxy URL {proxy_url}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build()?;
        Ok(Self { client, config })
    }

    /// Site origin requests are issued against
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Fetch one page and return its body text.
    ///
    /// Attempts the request up to `max_retries + 1` times, sleeping
    /// `retry_delay` before each retry, and surfaces the last error when
    /// every attempt fails.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self, path: &str) -> Result<String> {
        if self.config.base_url.is_empty() {
            return Err(Error::Config("base origin is not configured".to_string()));
        }

        let mut last_err = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.config.retry_delay).await;
            }
            match self.do_request(path).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        attempts = self.config.max_retries + 1,
                        error = %e,
                        "request failed"
                    );
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Other("request failed".to_string())))
    }

    async fn do_request(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.request_headers())
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Error::Server {
                status: status.as_u16(),
            });
        }

        // 4xx included: the site answers missing records with a regular
        // page, so the body goes back to the caller as-is.
        Ok(response.text().await?)
    }

    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let defaults = DEFAULT_HEADERS
            .iter()
            .map(|(k, v)| (*k, *v))
            .chain(
                self.config
                    .headers
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            );
        for (key, value) in defaults {
            let Ok(name) = HeaderName::from_bytes(key.as_bytes()) else {
                warn!("skipping invalid header name {key:?}");
                continue;
            };
            let Ok(value) = HeaderValue::from_str(value) else {
                warn!("skipping invalid value for header {key:?}");
                continue;
            };
            headers.insert(name, value);
        }
        headers
    }
}
