//! Per-request strategy selection.

use std::fmt;
use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;

use crate::fetch::Fetcher;
use crate::http::{Request, Response};
use crate::lifecycle::GenerationManager;
use crate::strategy::{BackgroundHook, CacheFirst, NetworkFirst};

/// Strategy a request is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    NetworkFirst,
    CacheFirst,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::NetworkFirst => f.write_str("network_first"),
            Route::CacheFirst => f.write_str("cache_first"),
        }
    }
}

/// Requests to `api_host` go network-first; everything else cache-first.
///
/// Only the URL host is consulted: scheme, port, path and method do not
/// affect the decision.
pub fn classify(url: &Url, api_host: &str) -> Route {
    match url.host_str() {
        Some(host) if host.eq_ignore_ascii_case(api_host) => Route::NetworkFirst,
        _ => Route::CacheFirst,
    }
}

pub struct Router {
    api_host: String,
    network_first: NetworkFirst,
    cache_first: CacheFirst,
}

impl Router {
    pub fn new(api_host: impl Into<String>, generations: Arc<GenerationManager>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            api_host: api_host.into(),
            network_first: NetworkFirst::new(generations.clone(), fetcher.clone()),
            cache_first: CacheFirst::new(generations, fetcher),
        }
    }

    /// Attach a background completion observer to both strategies.
    pub fn with_hook(self, hook: BackgroundHook) -> Self {
        Self {
            api_host: self.api_host,
            network_first: self.network_first.with_hook(hook.clone()),
            cache_first: self.cache_first.with_hook(hook),
        }
    }

    pub fn classify(&self, request: &Request) -> Route {
        classify(&request.url, &self.api_host)
    }

    /// Dispatch `request` to its strategy. Always yields a response.
    pub async fn route(&self, request: &Request) -> Response {
        let route = self.classify(request);
        tracing::debug!("{} {} -> {}", request.method, request.url, route);

        match route {
            Route::NetworkFirst => self.network_first.handle(request).await,
            Route::CacheFirst => self.cache_first.handle(request).await,
        }
    }
}
