//! Shared server state: the registration container and its collaborators.

use shellcache_core::{AppConfig, CacheDb, Error};
use shellcache_worker::WorkerSettings;
use shellcache_worker::fetch::{Network, parse_origin};
use shellcache_worker::lifecycle::{Container, InMemoryClients, LifecycleEvent, Registration};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::broadcast::{self, error::TryRecvError};

/// How many lifecycle events `sw_status` reports.
const RECENT_EVENTS: usize = 32;

pub struct AppState {
    pub config: AppConfig,
    pub container: Container,
    pub clients: Arc<InMemoryClients>,
    events: Mutex<EventLog>,
}

/// Lifecycle events received from the container, oldest first.
struct EventLog {
    receiver: broadcast::Receiver<LifecycleEvent>,
    recent: VecDeque<LifecycleEvent>,
}

impl AppState {
    pub fn new(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = config.require_origin().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let origin = parse_origin(origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        let clients = InMemoryClients::new();
        let container = Container::new(origin, db, network, clients.clone());
        let events = Mutex::new(EventLog { receiver: container.subscribe(), recent: VecDeque::new() });
        Ok(Self { config, container, clients, events })
    }

    /// Worker settings from configuration, optionally under another version.
    pub fn settings(&self, version: Option<&str>) -> Result<WorkerSettings, Error> {
        let settings = WorkerSettings::from_config(&self.config)?;
        Ok(match version {
            Some(v) if !v.trim().is_empty() => settings.with_version(v.trim()),
            _ => settings,
        })
    }

    /// Registration for `scope`, defaulting to the configured scope.
    pub async fn registration(&self, scope: Option<&str>) -> Result<Arc<Registration>, Error> {
        let scope = scope.unwrap_or(&self.config.scope);
        self.container
            .get(scope)
            .await
            .ok_or_else(|| Error::NotRegistered(format!("no registration for scope {scope}")))
    }

    pub fn db(&self) -> &CacheDb {
        self.container.db()
    }

    /// Events published since the last call. They are also kept for
    /// [`AppState::recent_events`].
    pub async fn take_events(&self) -> Vec<LifecycleEvent> {
        let mut log = self.events.lock().await;
        let mut fresh = Vec::new();
        loop {
            match log.receiver.try_recv() {
                Ok(event) => fresh.push(event),
                Err(TryRecvError::Lagged(skipped)) => tracing::warn!("missed {} lifecycle events", skipped),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        for event in &fresh {
            tracing::info!("lifecycle event: {:?}", event);
            log.recent.push_back(event.clone());
            if log.recent.len() > RECENT_EVENTS {
                log.recent.pop_front();
            }
        }
        fresh
    }

    /// The last lifecycle events, oldest first.
    pub async fn recent_events(&self) -> Vec<LifecycleEvent> {
        self.take_events().await;
        self.events.lock().await.recent.iter().cloned().collect()
    }
}
