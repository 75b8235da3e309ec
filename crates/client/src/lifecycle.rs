//! Generation lifecycle: install-time pre-caching and activate-time cleanup.
//!
//! The manager owns the name of the current generation and is shared with
//! both strategies, which obtain the store they read and write through
//! [`GenerationManager::store`].

use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;
use shellcache_core::{CacheDb, Error, Generation};
use tokio::sync::OnceCell;

use crate::fetch::{Fetcher, resolve};
use crate::http::Request;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub generation: String,
    /// Canonical URLs stored, in manifest order.
    pub precached: Vec<String>,
    /// The new generation supersedes any running instance without waiting.
    pub skip_waiting: bool,
}

/// Result of a successful activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub generation: String,
    /// Generations removed because their name differs from the current one.
    pub deleted: Vec<String>,
    /// Interception applies to already-open clients immediately.
    pub clients_claimed: bool,
}

/// Creates, populates and retires cache generations.
pub struct GenerationManager {
    db: CacheDb,
    current: String,
    origin: Url,
    fetcher: Arc<dyn Fetcher>,
    store: OnceCell<Generation>,
}

impl GenerationManager {
    pub fn new(db: CacheDb, current: impl Into<String>, origin: Url, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { db, current: current.into(), origin, fetcher, store: OnceCell::new() }
    }

    /// Name of the current generation.
    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Handle to the current generation.
    ///
    /// The generation is created on first use only; later calls reuse the
    /// handle without touching the database. If another instance deletes the
    /// generation, reads through the handle miss and writes fail.
    pub async fn store(&self) -> Result<Generation, Error> {
        self.store
            .get_or_try_init(|| self.db.open_generation(&self.current))
            .await
            .cloned()
    }

    /// Pre-cache the app shell into the current generation.
    ///
    /// All-or-nothing: every manifest URL is fetched before anything is
    /// written, and a network failure or non-2xx status on any of them fails
    /// the whole install with [`Error::PrecacheFailed`].
    pub async fn initialize(&self, manifest: &[String]) -> Result<InstallReport, Error> {
        let mut requests = Vec::with_capacity(manifest.len());
        for path in manifest {
            let url = resolve(&self.origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
            requests.push(Request { method: reqwest::Method::GET, url, headers: Default::default() });
        }

        let store = self.store().await?;

        let mut snapshots = Vec::with_capacity(requests.len());
        for request in &requests {
            let response = self.fetcher.fetch(request).await.map_err(|e| Error::PrecacheFailed {
                url: request.url.to_string(),
                reason: e.to_string(),
            })?;

            if !response.ok() {
                return Err(Error::PrecacheFailed {
                    url: request.url.to_string(),
                    reason: format!("status {}", response.status.as_u16()),
                });
            }

            snapshots.push(response.to_snapshot(request));
        }

        let precached: Vec<String> = requests.iter().map(|r| r.url.to_string()).collect();
        store.put_all(snapshots).await?;

        tracing::info!(generation = %self.current, count = precached.len(), "pre-cached app shell");

        Ok(InstallReport { generation: self.current.clone(), precached, skip_waiting: true })
    }

    /// Delete every generation whose name differs from the current one.
    ///
    /// Idempotent: with no stale generations this deletes nothing.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        let mut deleted = Vec::new();
        for name in self.db.generation_names().await? {
            if name != self.current && self.db.delete_generation(&name).await? {
                deleted.push(name);
            }
        }

        if !deleted.is_empty() {
            tracing::info!(generation = %self.current, deleted = ?deleted, "removed stale generations");
        }

        Ok(ActivateReport { generation: self.current.clone(), deleted, clients_claimed: true })
    }
}
