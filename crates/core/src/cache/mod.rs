//! Generation-scoped response cache backed by SQLite.
//!
//! The database plays the role of the browser's cache storage: it holds any
//! number of named generations, each mapping normalized requests to captured
//! response snapshots. It supports:
//!
//! - Request keys hashed from method and absolute URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-generation deletion (entries cascade)

pub mod connection;
pub mod entries;
pub mod generations;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedEntry;
pub use generations::{CacheStore, GenerationInfo};
