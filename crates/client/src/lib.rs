//! Request interception for shellcache.
//!
//! This crate provides the fetch pipeline, the generation lifecycle, the
//! request router with its two caching strategies, and the [`ServiceWorker`]
//! facade a host adapter drives.

pub mod fetch;
pub mod http;
pub mod lifecycle;
pub mod router;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fetch::{FetchClient, FetchConfig, FetchError, Fetcher};
pub use http::{Request, Response, ResponseSource};
pub use lifecycle::{ActivateReport, GenerationManager, InstallReport};
pub use router::{Route, Router, classify};
pub use strategy::{BackgroundEvent, BackgroundHook, BackgroundOutcome, CacheFirst, NetworkFirst};
pub use worker::{ServiceWorker, WorkerState};
