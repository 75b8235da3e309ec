//! The worker facade: install, activate and request hooks on one component.
//!
//! A host adapter owns a [`ServiceWorker`] and calls:
//! 1. [`ServiceWorker::on_install`] once at startup (pre-caches the shell)
//! 2. [`ServiceWorker::on_activate`] after a successful install (drops stale
//!    generations)
//! 3. [`ServiceWorker::on_request`] for every intercepted request

use std::fmt;
use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;
use shellcache_core::{AppConfig, CacheDb, Error};
use tokio::sync::Mutex;

use crate::fetch::{Fetcher, canonicalize};
use crate::http::{Request, Response};
use crate::lifecycle::{ActivateReport, GenerationManager, InstallReport};
use crate::router::{Route, Router};
use crate::strategy::BackgroundHook;

/// Lifecycle state of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this instance will never control requests.
    Redundant,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

pub struct ServiceWorker {
    generations: Arc<GenerationManager>,
    router: Router,
    manifest: Vec<String>,
    state: Mutex<WorkerState>,
}

impl ServiceWorker {
    /// Build a worker from loaded configuration.
    pub fn from_config(config: &AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = canonicalize(&config.app_origin).map_err(|e| Error::InvalidUrl(format!("app_origin: {e}")))?;
        Ok(Self::new(db, &config.cache_version, origin, config.app_shell.clone(), &config.api_host, fetcher))
    }

    pub fn new(
        db: CacheDb, cache_version: &str, origin: Url, manifest: Vec<String>, api_host: &str, fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let generations = Arc::new(GenerationManager::new(db, cache_version, origin, fetcher.clone()));
        let router = Router::new(api_host, generations.clone(), fetcher);
        Self { generations, router, manifest, state: Mutex::new(WorkerState::Parsed) }
    }

    pub fn with_background_hook(mut self, hook: BackgroundHook) -> Self {
        self.router = self.router.with_hook(hook);
        self
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.lock().await
    }

    pub fn generations(&self) -> &GenerationManager {
        &self.generations
    }

    /// Pre-cache the app shell into the current generation.
    ///
    /// On failure the worker becomes [`WorkerState::Redundant`] and the error
    /// is returned for the host to retry with a fresh instance.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        self.transition(&[WorkerState::Parsed], WorkerState::Installing).await?;

        match self.generations.initialize(&self.manifest).await {
            Ok(report) => {
                *self.state.lock().await = WorkerState::Installed;
                tracing::info!(
                    generation = %report.generation,
                    precached = report.precached.len(),
                    skip_waiting = report.skip_waiting,
                    "install complete"
                );
                Ok(report)
            }
            Err(e) => {
                *self.state.lock().await = WorkerState::Redundant;
                tracing::error!(generation = %self.generations.current(), "install failed: {e}");
                Err(e)
            }
        }
    }

    /// Remove stale generations and take control of requests.
    ///
    /// May be repeated once activated; later calls only delete generations
    /// that appeared since.
    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        let previous = self
            .transition(&[WorkerState::Installed, WorkerState::Activated], WorkerState::Activating)
            .await?;

        match self.generations.activate().await {
            Ok(report) => {
                *self.state.lock().await = WorkerState::Activated;
                tracing::info!(
                    generation = %report.generation,
                    deleted = report.deleted.len(),
                    clients_claimed = report.clients_claimed,
                    "activation complete"
                );
                Ok(report)
            }
            Err(e) => {
                *self.state.lock().await = previous;
                tracing::error!(generation = %self.generations.current(), "activation failed: {e}");
                Err(e)
            }
        }
    }

    /// Answer an intercepted request.
    pub async fn on_request(&self, request: &Request) -> Response {
        self.router.route(request).await
    }

    pub fn classify(&self, request: &Request) -> Route {
        self.router.classify(request)
    }

    /// Move to `to` if the current state is one of `from`; returns the state left.
    async fn transition(&self, from: &[WorkerState], to: WorkerState) -> Result<WorkerState, Error> {
        let mut state = self.state.lock().await;
        if !from.contains(&*state) {
            return Err(Error::InvalidInput(format!("cannot move worker from {} to {}", *state, to)));
        }
        Ok(std::mem::replace(&mut *state, to))
    }
}
