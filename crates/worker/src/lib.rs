//! Offline-first request caching worker.
//!
//! This crate provides:
//! - Network access behind the [`fetch::Network`] trait (reqwest-backed by default)
//! - Request classification into API, static, navigation and other traffic
//! - One caching strategy per category, writing into the current generation
//! - Synthetic offline responses
//! - The install/activate lifecycle and the registration API

pub mod classify;
pub mod fallback;
pub mod fetch;
pub mod lifecycle;
pub mod settings;
pub mod strategy;
pub mod wait;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{Category, Classifier, Route};
pub use fallback::FallbackContent;
pub use fetch::{FetchConfig, FetchError, HttpNetwork, Network};
pub use lifecycle::{Container, InMemoryClients, Registration, UpdateOutcome, WorkerSlot, WorkerState};
pub use settings::WorkerSettings;
pub use strategy::{Served, Source};
pub use wait::WaitUntil;
pub use worker::{Message, Reply, ServiceWorker};
