//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Request/response model shared by the worker and the server
//! - Generation-scoped cache store with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheStore, CachedEntry};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Destination, Headers, Request, RequestMode, Response, ResponseKind};
