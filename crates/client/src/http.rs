//! Request and response types flowing through the router.
//!
//! Response bodies are [`Bytes`], so a response can be delivered to the
//! caller and captured into a [`Snapshot`] without consuming a single-read
//! stream twice.

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
pub use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use shellcache_core::Snapshot;

use crate::fetch::url::{UrlError, canonicalize};

/// An intercepted request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Canonical URL (fragment removed).
    pub url: Url,
    pub headers: HeaderMap,
}

impl Request {
    /// Build a request, canonicalizing the URL.
    pub fn new(method: Method, url: &str) -> Result<Self, UrlError> {
        Ok(Self { method, url: canonicalize(url)?, headers: HeaderMap::new() })
    }

    pub fn get(url: &str) -> Result<Self, UrlError> {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Live network response
    Network,
    /// Stored snapshot from the current generation
    Cache,
    /// Offline fallback built locally
    Synthesized,
}

/// A response handed back to the caller.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl Response {
    /// Whether the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Capture this response as a snapshot answering `request`.
    pub fn to_snapshot(&self, request: &Request) -> Snapshot {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
            .collect();

        Snapshot {
            url: request.url.to_string(),
            method: request.method.as_str().to_string(),
            status: self.status.as_u16(),
            status_text: self.status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: self.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild a response from a stored snapshot.
    ///
    /// Headers that no longer parse are dropped.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut headers = HeaderMap::with_capacity(snapshot.headers.len());
        for (name, value) in &snapshot.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_bytes(value)) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::debug!("dropping unparseable stored header {name} for {}", snapshot.url),
            }
        }

        let status = StatusCode::from_u16(snapshot.status).unwrap_or(StatusCode::OK);

        Self { status, headers, body: Bytes::from(snapshot.body), source: ResponseSource::Cache }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::CONTENT_TYPE;

    fn sample_response() -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.append("x-trace", HeaderValue::from_static("a"));
        headers.append("x-trace", HeaderValue::from_static("b"));
        Response {
            status: StatusCode::OK,
            headers,
            body: Bytes::from_static(br#"{"Trains":[]}"#),
            source: ResponseSource::Network,
        }
    }

    #[test]
    fn test_request_strips_fragment() {
        let request = Request::get("https://App.Test/index.html#top").unwrap();
        assert_eq!(request.url.as_str(), "https://app.test/index.html");
        assert_eq!(request.method, Method::GET);
    }

    #[test]
    fn test_request_rejects_relative() {
        assert!(Request::get("/index.html").is_err());
    }

    #[test]
    fn test_snapshot_captures_response() {
        let request = Request::get("https://api.wmata.com/StationPrediction.svc/json/GetPrediction/A01").unwrap();
        let response = sample_response();
        let snapshot = response.to_snapshot(&request);

        assert_eq!(snapshot.url, request.url.as_str());
        assert_eq!(snapshot.method, "GET");
        assert_eq!(snapshot.status, 200);
        assert_eq!(snapshot.status_text, "OK");
        assert_eq!(snapshot.header("content-type"), Some("application/json"));
        assert_eq!(snapshot.body, br#"{"Trains":[]}"#);
        // the response is still readable after the capture
        assert_eq!(response.body.as_ref(), br#"{"Trains":[]}"#);
    }

    #[test]
    fn test_from_snapshot_restores_headers() {
        let request = Request::get("https://app.test/").unwrap();
        let snapshot = sample_response().to_snapshot(&request);
        let restored = Response::from_snapshot(snapshot);

        assert_eq!(restored.source, ResponseSource::Cache);
        assert_eq!(restored.status, StatusCode::OK);
        assert_eq!(restored.content_type(), Some("application/json"));
        assert_eq!(restored.headers.get_all("x-trace").iter().count(), 2);
    }

    #[test]
    fn test_from_snapshot_keeps_non_utf8_header_bytes() {
        let request = Request::get("https://api.wmata.com/Rail.svc/json/jStations").unwrap();
        let mut response = sample_response();
        response.headers.insert("x-station", HeaderValue::from_bytes(b"Gallery Pl\xe9").unwrap());

        let restored = Response::from_snapshot(response.to_snapshot(&request));

        assert_eq!(restored.headers.get("x-station").map(|v| v.as_bytes()), Some(&b"Gallery Pl\xe9"[..]));
    }

    #[test]
    fn test_ok_range() {
        let mut response = sample_response();
        assert!(response.ok());
        response.status = StatusCode::NO_CONTENT;
        assert!(response.ok());
        response.status = StatusCode::NOT_MODIFIED;
        assert!(!response.ok());
        response.status = StatusCode::NOT_FOUND;
        assert!(!response.ok());
    }
}
