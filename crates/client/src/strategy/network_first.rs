//! Network-first: for volatile remote API data.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;

use shellcache_core::cache::hash::is_cacheable_method;

use super::{BackgroundHook, log_fetch_error, spawn_store};
use crate::fetch::Fetcher;
use crate::http::{Request, Response, ResponseSource};
use crate::lifecycle::GenerationManager;

/// Message returned when the API is unreachable and nothing is cached.
pub const OFFLINE_MESSAGE: &str = "Offline — no cached data available";

#[derive(Serialize)]
struct OfflineBody {
    error: &'static str,
}

/// 503 with a JSON error body, for API clients that parse every response.
pub fn offline_response() -> Response {
    let body = serde_json::to_vec(&OfflineBody { error: OFFLINE_MESSAGE }).unwrap_or_default();

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Response {
        status: StatusCode::SERVICE_UNAVAILABLE,
        headers,
        body: Bytes::from(body),
        source: ResponseSource::Synthesized,
    }
}

pub struct NetworkFirst {
    generations: Arc<GenerationManager>,
    fetcher: Arc<dyn Fetcher>,
    hook: Option<BackgroundHook>,
}

impl NetworkFirst {
    pub fn new(generations: Arc<GenerationManager>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { generations, fetcher, hook: None }
    }

    pub fn with_hook(mut self, hook: BackgroundHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Serve `request` from the network, falling back to the cache, then to
    /// [`offline_response`].
    ///
    /// Successful GET responses are written back without waiting for the
    /// write.
    pub async fn handle(&self, request: &Request) -> Response {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.ok() && is_cacheable_method(request.method.as_str()) {
                    spawn_store(self.generations.clone(), request.clone(), response.clone(), self.hook.clone());
                }
                response
            }
            Err(e) => {
                log_fetch_error(request, &e);
                self.cached(request).await.unwrap_or_else(offline_response)
            }
        }
    }

    async fn cached(&self, request: &Request) -> Option<Response> {
        let store = match self.generations.store().await {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("cache unavailable for {}: {}", request.url, e);
                return None;
            }
        };

        match store.match_request(request.method.as_str(), request.url.as_str()).await {
            Ok(Some(snapshot)) => Some(Response::from_snapshot(snapshot)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("cache lookup failed for {}: {}", request.url, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::BackgroundOutcome;
    use crate::testing::{ScriptedFetcher, Step, channel_hook};
    use reqwest::Url;
    use shellcache_core::CacheDb;

    const API: &str = "https://api.wmata.com/StationPrediction.svc/json/GetPrediction/A01";

    async fn setup() -> (CacheDb, Arc<ScriptedFetcher>, Arc<GenerationManager>) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let generations = Arc::new(GenerationManager::new(
            db.clone(),
            "v1",
            Url::parse("https://metro.example/").unwrap(),
            fetcher.clone(),
        ));
        (db, fetcher, generations)
    }

    #[test]
    fn test_offline_response_shape() {
        let response = offline_response();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.content_type(), Some("application/json"));
        assert_eq!(response.source, ResponseSource::Synthesized);
        assert_eq!(
            std::str::from_utf8(&response.body).unwrap(),
            r#"{"error":"Offline — no cached data available"}"#
        );
    }

    #[tokio::test]
    async fn test_success_returns_live_body_and_stores_snapshot() {
        let (db, fetcher, generations) = setup().await;
        fetcher.push(API, Step::ok(r#"{"Trains":[{"Min":"3"}]}"#));
        let (hook, mut events) = channel_hook();
        let strategy = NetworkFirst::new(generations, fetcher).with_hook(hook);

        let request = Request::get(API).unwrap();
        let response = strategy.handle(&request).await;

        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(response.body.as_ref(), br#"{"Trains":[{"Min":"3"}]}"#);

        let event = events.recv().await.unwrap();
        assert_eq!(event.outcome, BackgroundOutcome::Stored);

        let stored = db.generation("v1").await.unwrap().match_request("GET", API).await.unwrap().unwrap();
        assert_eq!(stored.body, br#"{"Trains":[{"Min":"3"}]}"#);
    }

    #[tokio::test]
    async fn test_write_failure_still_returns_live_response() {
        let (db, fetcher, generations) = setup().await;
        generations.store().await.unwrap();
        // a newer version activated and removed this generation
        db.delete_generation("v1").await.unwrap();
        fetcher.push(API, Step::ok("live trains"));
        let (hook, mut events) = channel_hook();
        let strategy = NetworkFirst::new(generations, fetcher).with_hook(hook);

        let response = strategy.handle(&Request::get(API).unwrap()).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(response.body.as_ref(), b"live trains");
        assert!(matches!(events.recv().await.unwrap().outcome, BackgroundOutcome::WriteFailed(_)));
        assert!(!db.has_generation("v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_error_status_returned_without_caching() {
        let (db, fetcher, generations) = setup().await;
        fetcher.push(API, Step::status(500, "upstream down"));
        let strategy = NetworkFirst::new(generations, fetcher);

        let response = strategy.handle(&Request::get(API).unwrap()).await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.source, ResponseSource::Network);
        let store = db.open_generation("v1").await.unwrap();
        assert!(store.match_request("GET", API).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_with_snapshot_returns_snapshot() {
        let (_db, fetcher, generations) = setup().await;
        fetcher.push(API, Step::ok("cached trains"));
        fetcher.push(API, Step::Fail);
        let (hook, mut events) = channel_hook();
        let strategy = NetworkFirst::new(generations, fetcher).with_hook(hook);
        let request = Request::get(API).unwrap();

        strategy.handle(&request).await;
        events.recv().await.unwrap();

        let response = strategy.handle(&request).await;
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.as_ref(), b"cached trains");
        assert_eq!(response.content_type(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_failure_without_snapshot_is_offline_json() {
        let (_db, fetcher, generations) = setup().await;
        fetcher.push(API, Step::Fail);
        let strategy = NetworkFirst::new(generations, fetcher);

        let response = strategy.handle(&Request::get(API).unwrap()).await;

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.content_type(), Some("application/json"));
        let json: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Offline — no cached data available" }));
    }

    #[tokio::test]
    async fn test_non_get_success_is_returned_but_not_stored() {
        let (db, fetcher, generations) = setup().await;
        fetcher.push(API, Step::ok("accepted"));
        let (hook, mut events) = channel_hook();
        let strategy = NetworkFirst::new(generations, fetcher).with_hook(hook);

        let request = Request::new(reqwest::Method::POST, API).unwrap();
        let response = strategy.handle(&request).await;

        assert_eq!(response.body.as_ref(), b"accepted");
        tokio::task::yield_now().await;
        assert!(events.try_recv().is_err());
        assert!(db.open_generation("v1").await.unwrap().is_empty().await.unwrap());
    }
}
