//! MCP tool implementations.
//!
//! `fetch` is the request hook; the `cache_*` tools inspect the store.

pub mod cache;
pub mod fetch;
