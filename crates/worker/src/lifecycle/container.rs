//! Registration API: register a worker script for a scope, look up the
//! registration covering a URL, unregister.

use shellcache_core::{CacheDb, Error};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use url::Url;

use super::clients::ClientDirectory;
use super::events::LifecycleEvent;
use super::registration::{EVENT_CAPACITY, Registration, UpdateOutcome};
use crate::fetch::{Network, in_scope, resolve, same_origin};
use crate::settings::WorkerSettings;

/// Registrations of one origin, keyed by scope.
///
/// Every registration publishes its lifecycle events on the container's
/// channel, so one subscriber sees the whole origin.
pub struct Container {
    origin: Url,
    db: CacheDb,
    network: Arc<dyn Network>,
    clients: Arc<dyn ClientDirectory>,
    registrations: RwLock<BTreeMap<String, Arc<Registration>>>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl Container {
    pub fn new(origin: Url, db: CacheDb, network: Arc<dyn Network>, clients: Arc<dyn ClientDirectory>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { origin, db, network, clients, registrations: RwLock::new(BTreeMap::new()), events }
    }

    /// Receive lifecycle events of every registration from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Register `script` for `scope` and run an update with `settings`.
    ///
    /// Both locations are resolved against the origin and must stay on it.
    /// Registering an existing scope reuses its registration, so a new
    /// version in `settings` becomes an update.
    pub async fn register(
        &self, script: &str, scope: &str, settings: WorkerSettings,
    ) -> Result<(Arc<Registration>, UpdateOutcome), Error> {
        let script_url = self.resolve_local("script", script)?;
        let scope_url = self.resolve_local("scope", scope)?;

        let registration = {
            let mut registrations = self.registrations.write().await;
            registrations
                .entry(scope_url.to_string())
                .or_insert_with(|| {
                    tracing::info!("new registration for scope {}", scope_url);
                    Arc::new(
                        Registration::new(
                            scope_url.clone(),
                            script_url.clone(),
                            self.db.clone(),
                            self.network.clone(),
                            self.clients.clone(),
                        )
                        .with_events(self.events.clone()),
                    )
                })
                .clone()
        };

        if registration.script_url() != &script_url {
            tracing::warn!(
                "scope {} is registered with {}, ignoring {}",
                scope_url,
                registration.script_url(),
                script_url
            );
        }

        let outcome = registration.update(settings).await?;
        Ok((registration, outcome))
    }

    /// The registration whose scope is the longest prefix of `url`.
    pub async fn matching(&self, url: &Url) -> Option<Arc<Registration>> {
        let registrations = self.registrations.read().await;
        registrations
            .values()
            .filter(|r| in_scope(r.scope(), url))
            .max_by_key(|r| r.scope().path().len())
            .cloned()
    }

    pub async fn get(&self, scope: &str) -> Option<Arc<Registration>> {
        let scope = resolve(&self.origin, scope).ok()?;
        self.registrations.read().await.get(scope.as_str()).cloned()
    }

    pub async fn registrations(&self) -> Vec<Arc<Registration>> {
        self.registrations.read().await.values().cloned().collect()
    }

    /// Remove the registration for `scope`. Returns false if there was none.
    pub async fn unregister(&self, scope: &str) -> Result<bool, Error> {
        let scope_url = self.resolve_local("scope", scope)?;
        let removed = self.registrations.write().await.remove(scope_url.as_str());
        match removed {
            Some(registration) => {
                registration.shutdown().await;
                tracing::info!("unregistered scope {}", scope_url);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn resolve_local(&self, what: &str, input: &str) -> Result<Url, Error> {
        let url = resolve(&self.origin, input).map_err(|e| Error::InvalidUrl(format!("{what} {input}: {e}")))?;
        if !same_origin(&self.origin, &url) {
            return Err(Error::InvalidUrl(format!("{what} must be on {}: {url}", self.origin)));
        }
        Ok(url)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container").field("origin", &self.origin.as_str()).finish()
    }
}
