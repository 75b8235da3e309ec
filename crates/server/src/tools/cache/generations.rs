//! cache_generations tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::ServiceWorker;

use crate::error::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationEntry {
    pub name: String,
    pub created_at: String,
    /// Number of stored responses.
    pub entries: u64,
    /// Whether this is the generation the worker serves from.
    pub current: bool,
}

/// Output from the cache_generations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGenerationsOutput {
    pub current: String,
    /// Worker lifecycle state.
    pub state: String,
    pub generations: Vec<GenerationEntry>,
}

/// Implementation of the cache_generations tool.
pub async fn generations_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let current = worker.generations().current().to_string();
    let generations = worker
        .generations()
        .db()
        .generations()
        .await?
        .into_iter()
        .map(|info| GenerationEntry {
            current: info.name == current,
            name: info.name,
            created_at: info.created_at,
            entries: info.entries,
        })
        .collect();

    let output = CacheGenerationsOutput { current, state: worker.state().await.to_string(), generations };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellcache_client::{FetchClient, FetchConfig};
    use shellcache_core::{AppConfig, CacheDb};
    use std::sync::Arc;

    fn text(result: &CallToolResult) -> String {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content")
            .to_string()
    }

    #[tokio::test]
    async fn test_lists_generations_with_current_flag() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("metro-tracker-v0").await.unwrap();
        db.open_generation("metro-tracker-v1").await.unwrap();
        let fetcher = Arc::new(FetchClient::new(FetchConfig::default()).unwrap());
        let worker = ServiceWorker::from_config(&AppConfig::default(), db, fetcher).unwrap();

        let result = generations_impl(&worker).await.unwrap();
        let output: CacheGenerationsOutput = serde_json::from_str(&text(&result)).unwrap();

        assert_eq!(output.current, "metro-tracker-v1");
        assert_eq!(output.state, "parsed");
        assert_eq!(output.generations.len(), 2);
        let current: Vec<_> = output.generations.iter().filter(|g| g.current).map(|g| g.name.as_str()).collect();
        assert_eq!(current, vec!["metro-tracker-v1"]);
    }
}
