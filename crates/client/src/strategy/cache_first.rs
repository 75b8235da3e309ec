//! Cache-first with background revalidation: for static app assets.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use shellcache_core::cache::hash::is_cacheable_method;

use super::{BackgroundHook, log_fetch_error, spawn_refresh};
use crate::fetch::Fetcher;
use crate::http::{Request, Response, ResponseSource};
use crate::lifecycle::GenerationManager;

/// 503 with a bare `Offline` body and no content type.
pub fn offline_response() -> Response {
    Response {
        status: StatusCode::SERVICE_UNAVAILABLE,
        headers: HeaderMap::new(),
        body: Bytes::from_static(b"Offline"),
        source: ResponseSource::Synthesized,
    }
}

pub struct CacheFirst {
    generations: Arc<GenerationManager>,
    fetcher: Arc<dyn Fetcher>,
    hook: Option<BackgroundHook>,
}

impl CacheFirst {
    pub fn new(generations: Arc<GenerationManager>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { generations, fetcher, hook: None }
    }

    pub fn with_hook(mut self, hook: BackgroundHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Serve `request` from the current generation if stored, refreshing the
    /// entry in the background; otherwise fetch it, store it and return it.
    pub async fn handle(&self, request: &Request) -> Response {
        if let Some(cached) = self.lookup(request).await {
            spawn_refresh(self.generations.clone(), self.fetcher.clone(), request.clone(), self.hook.clone());
            return cached;
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.ok() && is_cacheable_method(request.method.as_str()) {
                    self.store(request, &response).await;
                }
                response
            }
            Err(e) => {
                log_fetch_error(request, &e);
                offline_response()
            }
        }
    }

    /// A store error is treated as a miss.
    async fn lookup(&self, request: &Request) -> Option<Response> {
        let result = match self.generations.store().await {
            Ok(store) => store.match_request(request.method.as_str(), request.url.as_str()).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(found) => found.map(Response::from_snapshot),
            Err(e) => {
                tracing::warn!("cache lookup failed for {}: {}", request.url, e);
                None
            }
        }
    }

    async fn store(&self, request: &Request, response: &Response) {
        let snapshot = response.to_snapshot(request);
        let result = match self.generations.store().await {
            Ok(store) => store.put(&snapshot).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::warn!("failed to cache {}: {}", request.url, e);
        }
    }
}
