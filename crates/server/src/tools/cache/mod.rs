//! Cache inspection tools.
//!
//! Read-only views over the generations held by the worker's store.

pub mod entries;
pub mod generations;

pub use entries::{CacheEntriesParams, entries_impl};
pub use generations::generations_impl;
