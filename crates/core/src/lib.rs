//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Generation-scoped response cache with SQLite backend
//! - Request identity hashing
//! - Unified error types
//! - Layered configuration

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, Generation, GenerationInfo, Snapshot};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
