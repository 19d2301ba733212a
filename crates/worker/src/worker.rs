//! One worker generation and its event handlers.
//!
//! The host delivers events (install, activate, fetch, message) and the
//! [`Registration`](crate::lifecycle::Registration) drives the state machine
//! around them. Handlers never change state themselves.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use shellcache_core::{CacheDb, CacheStore, Error, Request, Response};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use url::Url;

use crate::classify::{Category, Route};
use crate::fetch::{FetchError, Network};
use crate::lifecycle::clients::ClientDirectory;
use crate::lifecycle::state::WorkerState;
use crate::settings::WorkerSettings;
use crate::strategy::{self, CachePolicy, Served, StrategyContext};
use crate::wait::WaitUntil;

/// Control message posted to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Activate as soon as install has finished, without waiting.
    SkipWaiting,
    /// Ask for the generation identifier.
    GetVersion,
}

/// Reply to a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Ack { ok: bool },
    Version { version: String },
}

/// Events delivered by the host.
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Message(Message),
}

/// Outcome of [`ServiceWorker::dispatch`], one variant per event.
#[derive(Debug)]
pub enum EventResult {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetch(FetchOutcome),
    Reply(Reply),
}

impl EventResult {
    pub fn name(&self) -> &'static str {
        match self {
            EventResult::Installed(_) => "installed",
            EventResult::Activated(_) => "activated",
            EventResult::Fetch(_) => "fetch",
            EventResult::Reply(_) => "reply",
        }
    }
}

/// How a fetch event was handled.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted; the host sends the request itself.
    Bypass,
    /// Served by the strategy bound to `category`.
    Respond { category: Category, result: Result<Served, FetchError> },
}

/// Summary of an install run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub version: String,
    /// Local manifest entries written to the generation.
    pub cached: usize,
    /// Remote manifest entries written to the generation.
    pub remote_cached: usize,
    /// Entries that could not be fetched or stored, with the reason.
    pub failed: Vec<String>,
}

/// Summary of an activate run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ActivateReport {
    pub version: String,
    /// Generations deleted because they were not this one.
    pub deleted: Vec<String>,
    /// Clients whose controller changed to this generation.
    pub claimed: usize,
}

/// A worker generation.
pub struct ServiceWorker {
    settings: WorkerSettings,
    scope: Url,
    db: CacheDb,
    store: CacheStore,
    policy: CachePolicy,
    network: Arc<dyn Network>,
    clients: Arc<dyn ClientDirectory>,
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
    waits: WaitUntil,
}

impl ServiceWorker {
    pub fn new(
        settings: WorkerSettings, scope: Url, db: CacheDb, network: Arc<dyn Network>,
        clients: Arc<dyn ClientDirectory>,
    ) -> Self {
        let store = db.generation(&settings.version);
        let policy = CachePolicy::from_settings(&settings);
        let skip_waiting = AtomicBool::new(settings.skip_waiting_on_install);
        let (state, _) = watch::channel(WorkerState::Uninstalled);

        Self { settings, scope, db, store, policy, network, clients, state, skip_waiting, waits: WaitUntil::new() }
    }

    pub fn version(&self) -> &str {
        &self.settings.version
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Subscribe to state changes.
    pub fn watch_state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Background tasks spawned while serving fetches.
    pub fn waits(&self) -> &WaitUntil {
        &self.waits
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Move to `next`, rejecting transitions the lifecycle doesn't allow.
    pub(crate) fn transition(&self, next: WorkerState) -> Result<(), Error> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|current| {
            if current.can_transition_to(next) {
                tracing::info!("worker {} {} -> {}", self.settings.version, current, next);
                *current = next;
                true
            } else {
                outcome = Err(Error::InvalidState(format!(
                    "worker {} cannot move from {} to {}",
                    self.settings.version, current, next
                )));
                false
            }
        });
        outcome
    }

    /// Route one event to its handler.
    pub async fn dispatch(&self, event: Event) -> Result<EventResult, Error> {
        match event {
            Event::Install => self.on_install().await.map(EventResult::Installed),
            Event::Activate => self.on_activate().await.map(EventResult::Activated),
            Event::Fetch(request) => Ok(EventResult::Fetch(self.handle_fetch(&request).await)),
            Event::Message(message) => Ok(EventResult::Reply(self.on_message(message))),
        }
    }

    /// Pre-populate this generation from the asset manifest.
    ///
    /// Local entries are fetched concurrently and written in one transaction
    /// when all of them succeed; otherwise the ones that did succeed are
    /// written one by one. Remote entries are best effort. Only failing to
    /// create the generation itself is an error.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        let version = self.settings.version.clone();
        let store = self
            .db
            .open_generation(&version)
            .await
            .map_err(|e| Error::InstallFailed(format!("cannot open generation {version}: {e}")))?;

        let mut failed = Vec::new();

        let local: Vec<Request> = self.settings.manifest.local().map(|url| Request::get(url.clone())).collect();
        let fetched = join_all(local.iter().map(|req| self.network.fetch(req))).await;

        let mut ok: Vec<(Request, Response)> = Vec::with_capacity(local.len());
        for (request, result) in local.into_iter().zip(fetched) {
            match result {
                Ok(response) if response.is_success() => ok.push((request, response)),
                Ok(response) => failed.push(format!("{}: status {}", request.url, response.status)),
                Err(e) => failed.push(format!("{}: {}", request.url, e)),
            }
        }

        let cached = if failed.is_empty() {
            match store.put_all(&ok).await {
                Ok(()) => ok.len(),
                Err(e) => {
                    tracing::warn!("batch write for {} failed, retrying per entry: {}", version, e);
                    put_each(&store, &ok, &mut failed).await
                }
            }
        } else {
            tracing::warn!("{} manifest entries failed for {}, caching the rest individually", failed.len(), version);
            put_each(&store, &ok, &mut failed).await
        };

        let mut remote_cached = 0;
        for url in self.settings.manifest.remote() {
            let request = Request::get(url.clone());
            match self.network.fetch(&request).await {
                Ok(response) if self.policy.may_store(&request, &response) => match store.put(&request, &response).await {
                    Ok(()) => remote_cached += 1,
                    Err(e) => failed.push(format!("{url}: {e}")),
                },
                Ok(response) => tracing::debug!("remote asset {} not cacheable (status {})", url, response.status),
                Err(e) => tracing::debug!("remote asset {} unavailable: {}", url, e),
            }
        }

        tracing::info!(
            "installed {}: {} local, {} remote, {} failed",
            version,
            cached,
            remote_cached,
            failed.len()
        );

        Ok(InstallReport { version, cached, remote_cached, failed })
    }

    /// Delete every other generation and take control of open clients.
    ///
    /// Running it again for the same generation deletes nothing and claims
    /// nothing new.
    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        let version = self.settings.version.clone();
        let deleted = self.db.delete_generations_except(&version).await?;
        for name in &deleted {
            tracing::info!("deleted stale generation {}", name);
        }

        let claimed = self.clients.claim(&self.scope, &version).await;
        Ok(ActivateReport { version, deleted, claimed })
    }

    /// Classify and serve an intercepted request.
    pub async fn handle_fetch(&self, request: &Request) -> FetchOutcome {
        let category = match self.settings.classifier.classify(request) {
            Route::Bypass => return FetchOutcome::Bypass,
            Route::Intercept(category) => category,
        };

        tracing::debug!("{} {} -> {}", request.method, request.url, category);

        let ctx = StrategyContext {
            network: self.network.as_ref(),
            cache: &self.store,
            policy: &self.policy,
            fallback: &self.settings.fallback,
            app_shell: &self.settings.app_shell,
            waits: &self.waits,
        };

        let result = strategy::execute(category, request, &ctx).await;
        FetchOutcome::Respond { category, result }
    }

    /// Handle a control message. Skip-waiting only records the request;
    /// the registration decides when to activate.
    pub fn on_message(&self, message: Message) -> Reply {
        match message {
            Message::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                Reply::Ack { ok: true }
            }
            Message::GetVersion => Reply::Version { version: self.settings.version.clone() },
        }
    }
}

impl std::fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("version", &self.settings.version)
            .field("scope", &self.scope.as_str())
            .field("state", &self.state())
            .finish()
    }
}

async fn put_each(store: &CacheStore, pairs: &[(Request, Response)], failed: &mut Vec<String>) -> usize {
    let mut cached = 0;
    for (request, response) in pairs {
        match store.put(request, response).await {
            Ok(()) => cached += 1,
            Err(e) => {
                tracing::warn!("failed to cache {}: {}", request.url, e);
                failed.push(format!("{}: {}", request.url, e));
            }
        }
    }
    cached
}
