//! Scripted network for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tokio::sync::mpsc;

use crate::fetch::{FetchError, Fetcher};
use crate::http::{Request, Response, ResponseSource};
use crate::strategy::{BackgroundEvent, BackgroundHook};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Step {
    Respond { status: u16, body: String },
    /// A 200 that arrives after `after`.
    Delayed { after: Duration, body: String },
    Fail,
    /// Body over the fetch size limit.
    Oversized,
    /// Never completes.
    Hang,
}

impl Step {
    pub fn ok(body: &str) -> Self {
        Step::Respond { status: 200, body: body.to_string() }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Step::Respond { status, body: body.to_string() }
    }

    pub fn delayed(millis: u64, body: &str) -> Self {
        Step::Delayed { after: Duration::from_millis(millis), body: body.to_string() }
    }
}

/// Replies per URL in the order pushed; an unscripted fetch is a network
/// failure.
#[derive(Default)]
pub struct ScriptedFetcher {
    steps: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedFetcher {
    pub fn push(&self, url: &str, step: Step) {
        self.steps
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(step);
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let url = request.url.to_string();
        *self.calls.lock().unwrap().entry(url.clone()).or_default() += 1;

        let step = self
            .steps
            .lock()
            .unwrap()
            .get_mut(&url)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Fail);

        match step {
            Step::Respond { status, body } => Ok(text_response(status, body)),
            Step::Delayed { after, body } => {
                tokio::time::sleep(after).await;
                Ok(text_response(200, body))
            }
            Step::Fail => Err(FetchError::Network(format!("connection refused: {url}"))),
            Step::Oversized => Err(FetchError::TooLarge { actual: 6 * 1024 * 1024, limit: 5 * 1024 * 1024 }),
            Step::Hang => std::future::pending().await,
        }
    }
}

fn text_response(status: u16, body: String) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    Response {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: Bytes::from(body),
        source: ResponseSource::Network,
    }
}

/// A hook that forwards background completions into a channel.
pub fn channel_hook() -> (BackgroundHook, mpsc::UnboundedReceiver<BackgroundEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let hook: BackgroundHook = std::sync::Arc::new(move |event| {
        let _ = tx.send(event);
    });
    (hook, rx)
}
