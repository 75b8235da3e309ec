//! Network access for intercepted requests.
//!
//! The strategies only see the [`Fetcher`] trait, so tests can script the
//! network and the host adapter plugs in [`FetchClient`].
//!
//! A fetch is a failure only when no response arrives (DNS, connect, TLS,
//! timeout, body read, oversized body). A 404 or 500 is a successful fetch
//! whose response is not `ok()`.

pub mod url;

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, resolve};

use crate::http::{Request, Response, ResponseSource};
use shellcache_core::{AppConfig, Error};

/// Errors from a network fetch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("{actual} bytes exceeds {limit}")]
    TooLarge { actual: usize, limit: usize },
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        Error::Network(err.to_string())
    }
}

/// Source of live responses.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `request` from the network.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shellcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`Fetcher`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify(&self, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| self.classify(&e))?;

        let status = response.status();
        let limit = self.config.max_bytes;

        if let Some(len) = response.content_length()
            && len as usize > limit
        {
            return Err(FetchError::TooLarge { actual: len as usize, limit });
        }

        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| self.classify(&e))?;

        if body.len() > limit {
            return Err(FetchError::TooLarge { actual: body.len(), limit });
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response { status, headers, body, source: ResponseSource::Network })
    }
}
