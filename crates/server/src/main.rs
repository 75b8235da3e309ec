//! shellcache server entry point.
//!
//! Installs and activates the current cache generation, then serves the
//! worker's hooks as MCP tools on stdio. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{FetchClient, FetchConfig, ServiceWorker};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(generation = %config.cache_version, db = %config.db_path.display(), "starting shellcache");

    let db = CacheDb::open(&config.db_path).await.context("opening cache database")?;
    let fetcher = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let worker = ServiceWorker::from_config(&config, db.clone(), fetcher)?;

    // An install failure exits non-zero; the next start retries with a fresh worker.
    worker.on_install().await.context("install failed")?;
    worker.on_activate().await.context("activation failed")?;

    let handler = handler::ShellCacheServer::new(Arc::new(worker));
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    db.close().await.context("closing cache database")?;

    Ok(())
}
