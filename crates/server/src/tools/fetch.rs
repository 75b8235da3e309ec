//! fetch tool implementation.
//!
//! Hands a request to the worker's request hook and renders whatever it
//! answers: a live response, a cached snapshot or an offline fallback.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::http::Method;
use shellcache_client::{Request, ResponseSource, ServiceWorker};

use crate::error::{ToolError, json_result};

/// Input parameters for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute http(s) URL to request.
    pub url: String,

    /// HTTP method (default: GET). Only GET responses are cached.
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    /// Canonical request URL.
    pub url: String,
    /// Strategy that handled the request.
    pub route: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossy.
    pub body: String,
    /// network, cache or synthesized.
    pub source: String,
}

fn source_label(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Network => "network",
        ResponseSource::Cache => "cache",
        ResponseSource::Synthesized => "synthesized",
    }
}

/// Implementation of the fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: FetchParams) -> Result<CallToolResult, McpError> {
    let method = parse_method(&params.method)?;
    let request = Request::new(method, &params.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

    let route = worker.classify(&request);
    let response = worker.on_request(&request).await;

    let output = FetchOutput {
        url: request.url.to_string(),
        route: route.to_string(),
        status: response.status.as_u16(),
        headers: response
            .headers
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
        source: source_label(response.source).to_string(),
    };

    json_result(&output)
}

fn parse_method(method: &str) -> Result<Method, ToolError> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| ToolError::InvalidInput(format!("invalid method: {method}")))
}
