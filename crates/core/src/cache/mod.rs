//! SQLite-backed response cache organised into generations.
//!
//! A generation is a named namespace of response snapshots, the unit the
//! install/activate lifecycle creates and deletes. Entries are keyed by a
//! hashed request identity (method + canonical URL) and replaced wholesale
//! on every write.
//!
//! - Async access via tokio-rusqlite
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Cascading delete of a generation's entries

pub mod connection;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod snapshots;

pub use crate::Error;

pub use connection::CacheDb;
pub use generations::{Generation, GenerationInfo};
pub use snapshots::Snapshot;
