//! cache_entries tool implementation.
//!
//! Lists the URLs stored in one generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::ServiceWorker;

use crate::error::json_result;

/// Parameters for the cache_entries tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntriesParams {
    /// Generation to list (default: the current one).
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_entries tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntriesOutput {
    pub generation: String,
    /// Stored URLs in first-write order.
    pub urls: Vec<String>,
}

/// Implementation of the cache_entries tool.
pub async fn entries_impl(worker: &ServiceWorker, params: CacheEntriesParams) -> Result<CallToolResult, McpError> {
    let name = params.generation.unwrap_or_else(|| worker.generations().current().to_string());
    let urls = worker.generations().db().generation(&name).await?.keys().await?;

    json_result(&CacheEntriesOutput { generation: name, urls })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellcache_client::{FetchClient, FetchConfig};
    use shellcache_core::{AppConfig, CacheDb, Snapshot};
    use std::sync::Arc;

    async fn worker(db: CacheDb) -> ServiceWorker {
        let fetcher = Arc::new(FetchClient::new(FetchConfig::default()).unwrap());
        ServiceWorker::from_config(&AppConfig::default(), db, fetcher).unwrap()
    }

    fn snapshot(url: &str) -> Snapshot {
        Snapshot {
            url: url.to_string(),
            method: "GET".into(),
            status: 200,
            status_text: "OK".into(),
            headers: vec![],
            body: b"x".to_vec(),
            stored_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[tokio::test]
    async fn test_unknown_generation_is_an_error() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let worker = worker(db).await;
        let params = CacheEntriesParams { generation: Some("nope".into()) };

        let err = entries_impl(&worker, params).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }

    #[tokio::test]
    async fn test_defaults_to_current_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("metro-tracker-v1").await.unwrap();
        generation.put(&snapshot("http://localhost:8080/")).await.unwrap();
        generation.put(&snapshot("http://localhost:8080/index.html")).await.unwrap();
        let worker = worker(db).await;

        let result = entries_impl(&worker, CacheEntriesParams::default()).await.unwrap();
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        let output: CacheEntriesOutput = serde_json::from_str(text).unwrap();

        assert_eq!(output.generation, "metro-tracker-v1");
        assert_eq!(output.urls, vec!["http://localhost:8080/", "http://localhost:8080/index.html"]);
    }
}
