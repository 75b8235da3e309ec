//! Fetch strategies and the detached background work they start.
//!
//! - [`NetworkFirst`]: live network, then the stored snapshot, then a JSON 503.
//! - [`CacheFirst`]: stored snapshot with background refresh, then the
//!   network, then a plain-text 503.
//!
//! Background work runs on `tokio::spawn` with the handle dropped, so it is
//! detached from the request that started it and keeps running if that
//! request is cancelled. Its failures are only logged. A [`BackgroundHook`]
//! can observe completions; it exists for test instrumentation.

pub mod cache_first;
pub mod network_first;

use std::sync::Arc;

use reqwest::{StatusCode, Url};

pub use cache_first::CacheFirst;
pub use network_first::NetworkFirst;

use crate::fetch::{FetchError, Fetcher};
use crate::http::{Request, Response};
use crate::lifecycle::GenerationManager;

/// How a detached background task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundOutcome {
    /// A fresh snapshot replaced the stored entry.
    Stored,
    /// The network answered with a non-2xx status; nothing was written.
    NotCached(StatusCode),
    /// The background fetch failed.
    FetchFailed(String),
    /// The store write failed.
    WriteFailed(String),
}

/// Completion notice for a detached background task.
#[derive(Debug, Clone)]
pub struct BackgroundEvent {
    pub url: Url,
    pub outcome: BackgroundOutcome,
}

/// Observer for background completions.
pub type BackgroundHook = Arc<dyn Fn(BackgroundEvent) + Send + Sync>;

fn notify(hook: Option<&BackgroundHook>, url: Url, outcome: BackgroundOutcome) {
    if let Some(hook) = hook {
        hook(BackgroundEvent { url, outcome });
    }
}

/// An oversized response takes the same fallback as a network failure but
/// is logged at warn, since the host was reachable.
fn log_fetch_error(request: &Request, err: &FetchError) {
    match err {
        FetchError::TooLarge { .. } => tracing::warn!("discarding oversized response for {}: {}", request.url, err),
        _ => tracing::debug!("network fetch failed for {}: {}", request.url, err),
    }
}

/// Write `response` for `request` into the current generation.
async fn store_response(generations: &GenerationManager, request: &Request, response: &Response) -> BackgroundOutcome {
    let snapshot = response.to_snapshot(request);
    let result = match generations.store().await {
        Ok(store) => store.put(&snapshot).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => BackgroundOutcome::Stored,
        Err(e) => BackgroundOutcome::WriteFailed(e.to_string()),
    }
}

/// Detached write of an already-fetched response.
fn spawn_store(
    generations: Arc<GenerationManager>, request: Request, response: Response, hook: Option<BackgroundHook>,
) {
    tokio::spawn(async move {
        let outcome = store_response(&generations, &request, &response).await;
        if let BackgroundOutcome::WriteFailed(reason) = &outcome {
            tracing::warn!("failed to cache response for {}: {}", request.url, reason);
        }
        notify(hook.as_ref(), request.url, outcome);
    });
}

/// Detached fetch-and-overwrite used for stale-while-revalidate.
fn spawn_refresh(
    generations: Arc<GenerationManager>, fetcher: Arc<dyn Fetcher>, request: Request, hook: Option<BackgroundHook>,
) {
    tokio::spawn(async move {
        let outcome = match fetcher.fetch(&request).await {
            Ok(response) if response.ok() => store_response(&generations, &request, &response).await,
            Ok(response) => BackgroundOutcome::NotCached(response.status),
            Err(e) => BackgroundOutcome::FetchFailed(e.to_string()),
        };

        match &outcome {
            BackgroundOutcome::Stored => tracing::debug!("refreshed cached {}", request.url),
            other => tracing::debug!("background refresh of {} discarded: {:?}", request.url, other),
        }

        notify(hook.as_ref(), request.url, outcome);
    });
}
