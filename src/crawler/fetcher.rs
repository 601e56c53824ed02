//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the archiver, including:
//! - Building the HTTP client with browser-like default headers and cookies
//! - GET requests with a per-attempt timeout
//! - Retrying failed attempts with exponential backoff
//! - Error classification

use crate::config::{parse_cookie_string, FetchConfig};
use crate::crawler::retry::RetryPolicy;
use crate::extract::PageDocument;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::Client;
use thiserror::Error;

/// Errors raised while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Builds an HTTP client with proper configuration
///
/// Every request carries the configured user agent, the extra headers and,
/// when cookies are configured, a single `Cookie` header.
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(FetchError)` - A header could not be encoded or the client failed to build
///
/// # Example
///
/// ```no_run
/// use forum_archiver::config::FetchConfig;
/// use forum_archiver::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(default_headers(config)?)
        .timeout(config.timeout())
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(FetchError::Client)
}

fn default_headers(config: &FetchConfig) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| FetchError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    if let Some(cookie) = cookie_header(config.cookies.as_deref()) {
        let value = HeaderValue::from_str(&cookie).map_err(|e| FetchError::InvalidHeader {
            name: COOKIE.to_string(),
            reason: e.to_string(),
        })?;
        headers.insert(COOKIE, value);
    }

    Ok(headers)
}

/// Renders the configured cookie string as a normalized `Cookie` header value
fn cookie_header(raw: Option<&str>) -> Option<String> {
    let cookies = parse_cookie_string(raw?);
    if cookies.is_empty() {
        return None;
    }

    Some(
        cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Fetches forum pages over HTTP with retries
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher from the fetch configuration
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_http_client(config)?,
            retry: RetryPolicy::new(config.max_retries, config.backoff_base()),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fetches a URL and returns the response body
    ///
    /// Transport errors and non-2xx statuses are both retried.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let client = &self.client;
        self.retry
            .run(|attempt| async move {
                tracing::debug!("GET {} (attempt {})", url, attempt + 1);
                let response = client.get(url).send().await.map_err(|e| FetchError::Http {
                    url: url.to_string(),
                    source: e,
                })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }

                response.text().await.map_err(|e| FetchError::Http {
                    url: url.to_string(),
                    source: e,
                })
            })
            .await
    }

    /// Fetches a URL and parses it as HTML
    pub async fn fetch_document(&self, url: &str) -> Result<PageDocument, FetchError> {
        let body = self.fetch_text(url).await?;
        Ok(PageDocument::parse(&body))
    }
}
