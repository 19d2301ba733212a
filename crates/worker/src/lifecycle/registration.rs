//! A registration: the installing, waiting and active workers of one scope.
//!
//! Install and activate are serialized by an async mutex. Fetches only take
//! a read lock on the worker slots and are served by whichever worker is
//! active when they arrive.

use serde::{Deserialize, Serialize};
use shellcache_core::{CacheDb, Error, Request};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};
use url::Url;

use super::clients::ClientDirectory;
use super::events::LifecycleEvent;
use super::state::WorkerState;
use crate::classify::Category;
use crate::fetch::{FetchError, Network};
use crate::settings::WorkerSettings;
use crate::strategy::{Served, Source};
use crate::worker::{ActivateReport, Event, EventResult, FetchOutcome, InstallReport, Message, Reply, ServiceWorker};

pub(crate) const EVENT_CAPACITY: usize = 64;

/// Which worker a control message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerSlot {
    Installing,
    Waiting,
    Active,
}

impl fmt::Display for WorkerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkerSlot::Installing => "installing",
            WorkerSlot::Waiting => "waiting",
            WorkerSlot::Active => "active",
        })
    }
}

/// Result of [`Registration::update`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// The version is already active or waiting.
    Unchanged { version: String },
    /// The version is already registered but its generation had been
    /// deleted; the manifest was installed into it again.
    Reinstalled { version: String, install: InstallReport },
    /// Install failed; the worker stays in the installing slot.
    Stalled { version: String, reason: String },
    /// Installed and waiting for the active worker's clients to go away.
    Waiting { version: String, install: InstallReport },
    /// Installed and activated.
    Activated { version: String, install: InstallReport, activate: ActivateReport },
}

/// Snapshot of one worker for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct WorkerStatus {
    pub version: String,
    pub state: WorkerState,
}

/// Snapshot of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct RegistrationStatus {
    pub scope: String,
    pub script_url: String,
    pub installing: Option<WorkerStatus>,
    pub waiting: Option<WorkerStatus>,
    pub active: Option<WorkerStatus>,
}

/// A fetch answered through the registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// `None` when the request was not intercepted.
    pub category: Option<Category>,
    pub served: Served,
}

#[derive(Default)]
struct Workers {
    installing: Option<Arc<ServiceWorker>>,
    waiting: Option<Arc<ServiceWorker>>,
    active: Option<Arc<ServiceWorker>>,
}

impl Workers {
    fn slot(&self, slot: WorkerSlot) -> Option<Arc<ServiceWorker>> {
        match slot {
            WorkerSlot::Installing => self.installing.clone(),
            WorkerSlot::Waiting => self.waiting.clone(),
            WorkerSlot::Active => self.active.clone(),
        }
    }
}

pub struct Registration {
    scope: Url,
    script_url: Url,
    db: CacheDb,
    network: Arc<dyn Network>,
    clients: Arc<dyn ClientDirectory>,
    lifecycle: Mutex<()>,
    workers: RwLock<Workers>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl Registration {
    pub fn new(
        scope: Url, script_url: Url, db: CacheDb, network: Arc<dyn Network>, clients: Arc<dyn ClientDirectory>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            scope,
            script_url,
            db,
            network,
            clients,
            lifecycle: Mutex::new(()),
            workers: RwLock::new(Workers::default()),
            events,
        }
    }

    /// Publish lifecycle events on `events` instead of a private channel.
    pub fn with_events(mut self, events: broadcast::Sender<LifecycleEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub fn script_url(&self) -> &Url {
        &self.script_url
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Receive lifecycle events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub async fn worker(&self, slot: WorkerSlot) -> Option<Arc<ServiceWorker>> {
        self.workers.read().await.slot(slot)
    }

    pub async fn active_version(&self) -> Option<String> {
        self.worker(WorkerSlot::Active).await.map(|w| w.version().to_string())
    }

    /// Install a generation built from `settings` and activate it when allowed.
    pub async fn update(&self, settings: WorkerSettings) -> Result<UpdateOutcome, Error> {
        let _guard = self.lifecycle.lock().await;

        let registered = {
            let workers = self.workers.read().await;
            [&workers.active, &workers.waiting]
                .into_iter()
                .flatten()
                .find(|w| w.version() == settings.version)
                .cloned()
        };
        if let Some(worker) = registered {
            if self.db.has_generation(&settings.version).await? {
                tracing::debug!("generation {} already registered", settings.version);
                return Ok(UpdateOutcome::Unchanged { version: settings.version });
            }
            tracing::warn!("generation {} missing from the store, reinstalling", settings.version);
            let install = install(&worker).await?;
            return Ok(UpdateOutcome::Reinstalled { version: settings.version, install });
        }

        let version = settings.version.clone();
        let worker = Arc::new(ServiceWorker::new(
            settings,
            self.scope.clone(),
            self.db.clone(),
            self.network.clone(),
            self.clients.clone(),
        ));
        worker.transition(WorkerState::Installing)?;

        let stalled = self.workers.write().await.installing.replace(worker.clone());
        if let Some(stalled) = stalled {
            self.retire(&stalled);
        }
        self.emit(LifecycleEvent::UpdateFound { version: version.clone() });

        let install = match install(&worker).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("install of {} failed: {}", version, e);
                let reason = e.to_string();
                self.emit(LifecycleEvent::InstallFailed { version: version.clone(), reason: reason.clone() });
                return Ok(UpdateOutcome::Stalled { version, reason });
            }
        };
        self.emit(LifecycleEvent::Installed { version: version.clone() });

        if worker.skip_waiting_requested() {
            let activate = self.activate_locked(&worker).await?;
            return Ok(UpdateOutcome::Activated { version, install, activate });
        }

        worker.transition(WorkerState::Waiting)?;
        let superseded = {
            let mut workers = self.workers.write().await;
            workers.installing = None;
            workers.waiting.replace(worker.clone())
        };
        if let Some(superseded) = superseded {
            self.retire(&superseded);
        }

        if self.can_activate(&worker).await {
            let activate = self.activate_locked(&worker).await?;
            return Ok(UpdateOutcome::Activated { version, install, activate });
        }

        let active = self.active_version().await.unwrap_or_default();
        tracing::info!("generation {} waiting for {} to release its clients", version, active);
        self.emit(LifecycleEvent::NewGenerationWaiting { version: version.clone(), active });
        Ok(UpdateOutcome::Waiting { version, install })
    }

    /// Activate the waiting worker if skip-waiting was requested or the
    /// active worker no longer controls any client.
    pub async fn try_activate_waiting(&self) -> Result<Option<ActivateReport>, Error> {
        let _guard = self.lifecycle.lock().await;
        let Some(waiting) = self.worker(WorkerSlot::Waiting).await else {
            return Ok(None);
        };
        if !self.can_activate(&waiting).await {
            return Ok(None);
        }
        self.activate_locked(&waiting).await.map(Some)
    }

    /// Deliver a control message to one of the workers.
    ///
    /// `SKIP_WAITING` sent to the waiting worker activates it right away.
    /// Sent to an installing worker, the flag is set at once and the install
    /// in progress activates on completion instead of waiting.
    pub async fn post_message(&self, target: WorkerSlot, message: Message) -> Result<Reply, Error> {
        let worker = self
            .worker(target)
            .await
            .ok_or_else(|| Error::InvalidState(format!("no {target} worker")))?;

        let reply = match worker.dispatch(Event::Message(message)).await? {
            EventResult::Reply(reply) => reply,
            other => return Err(unexpected("message", &other)),
        };

        if message == Message::SkipWaiting {
            let _guard = self.lifecycle.lock().await;
            let still_waiting = self
                .workers
                .read()
                .await
                .waiting
                .as_ref()
                .is_some_and(|w| Arc::ptr_eq(w, &worker));
            if still_waiting {
                self.activate_locked(&worker).await?;
            }
        }

        Ok(reply)
    }

    /// Serve a request through the active worker, or straight from the
    /// network when there is none or it declines to intercept.
    pub async fn fetch(&self, request: &Request) -> Result<Fetched, FetchError> {
        let active = self.worker(WorkerSlot::Active).await;

        let outcome = match &active {
            Some(worker) => match worker.dispatch(Event::Fetch(request.clone())).await {
                Ok(EventResult::Fetch(outcome)) => outcome,
                Ok(other) => {
                    tracing::error!("{}", unexpected("fetch", &other));
                    FetchOutcome::Bypass
                }
                Err(e) => {
                    tracing::error!("fetch handler of {} failed: {}", worker.version(), e);
                    FetchOutcome::Bypass
                }
            },
            None => FetchOutcome::Bypass,
        };

        match outcome {
            FetchOutcome::Respond { category, result } => {
                result.map(|served| Fetched { category: Some(category), served })
            }
            FetchOutcome::Bypass => {
                let response = self.network.fetch(request).await?;
                Ok(Fetched { category: None, served: Served::new(response, Source::Network) })
            }
        }
    }

    /// Await background cache writes of every worker.
    pub async fn settle(&self) {
        let workers: Vec<Arc<ServiceWorker>> = {
            let w = self.workers.read().await;
            [&w.installing, &w.waiting, &w.active].into_iter().flatten().cloned().collect()
        };
        for worker in workers {
            worker.waits().settle().await;
        }
    }

    pub async fn status(&self) -> RegistrationStatus {
        let workers = self.workers.read().await;
        let describe = |w: &Option<Arc<ServiceWorker>>| {
            w.as_ref().map(|w| WorkerStatus { version: w.version().to_string(), state: w.state() })
        };
        RegistrationStatus {
            scope: self.scope.to_string(),
            script_url: self.script_url.to_string(),
            installing: describe(&workers.installing),
            waiting: describe(&workers.waiting),
            active: describe(&workers.active),
        }
    }

    /// Drop every worker. Generations stay in the store.
    pub(crate) async fn shutdown(&self) {
        let _guard = self.lifecycle.lock().await;
        let workers = std::mem::take(&mut *self.workers.write().await);
        for worker in [workers.installing, workers.waiting, workers.active].into_iter().flatten() {
            self.retire(&worker);
        }
    }

    async fn can_activate(&self, worker: &ServiceWorker) -> bool {
        if worker.skip_waiting_requested() {
            return true;
        }
        match self.active_version().await {
            Some(active) => self.clients.controlled_by(&active).await == 0,
            None => true,
        }
    }

    /// Caller holds the lifecycle lock.
    ///
    /// Whatever else sits in the waiting slot is older than `worker` and its
    /// generation is gone after activation, so it is retired too.
    async fn activate_locked(&self, worker: &Arc<ServiceWorker>) -> Result<ActivateReport, Error> {
        worker.transition(WorkerState::Activating)?;
        let report = match worker.dispatch(Event::Activate).await? {
            EventResult::Activated(report) => report,
            other => return Err(unexpected("activate", &other)),
        };
        worker.transition(WorkerState::Active)?;

        let (previous, superseded) = {
            let mut workers = self.workers.write().await;
            let superseded = workers.waiting.take().filter(|w| !Arc::ptr_eq(w, worker));
            if workers.installing.as_ref().is_some_and(|w| Arc::ptr_eq(w, worker)) {
                workers.installing = None;
            }
            (workers.active.replace(worker.clone()), superseded)
        };
        for retired in [previous, superseded].into_iter().flatten() {
            self.retire(&retired);
        }

        tracing::info!("generation {} active, claimed {} clients", report.version, report.claimed);
        self.emit(LifecycleEvent::ControllerChange { version: report.version.clone(), claimed: report.claimed });
        Ok(report)
    }

    fn retire(&self, worker: &ServiceWorker) {
        if let Err(e) = worker.transition(WorkerState::Redundant) {
            tracing::debug!("{}", e);
            return;
        }
        self.emit(LifecycleEvent::Redundant { version: worker.version().to_string() });
    }

    fn emit(&self, event: LifecycleEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

async fn install(worker: &ServiceWorker) -> Result<InstallReport, Error> {
    match worker.dispatch(Event::Install).await? {
        EventResult::Installed(report) => Ok(report),
        other => Err(unexpected("install", &other)),
    }
}

fn unexpected(event: &str, result: &EventResult) -> Error {
    Error::InvalidState(format!("{event} event answered with {}", result.name()))
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("scope", &self.scope.as_str())
            .field("script_url", &self.script_url.as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::clients::InMemoryClients;
    use crate::testing::{ORIGIN, StubNetwork, memory_db, url};
    use shellcache_core::{AppConfig, Response};

    fn settings(version: &str) -> WorkerSettings {
        let config = AppConfig {
            version: version.into(),
            origin: Some(ORIGIN.into()),
            manifest: vec!["/".into(), "/app.html".into(), "/assets/css/main.css".into()],
            ..Default::default()
        };
        WorkerSettings::from_config(&config).unwrap()
    }

    struct Harness {
        db: CacheDb,
        network: Arc<StubNetwork>,
        clients: Arc<InMemoryClients>,
        registration: Arc<Registration>,
    }

    async fn harness() -> Harness {
        let db = memory_db().await;
        let network = StubNetwork::new();
        network.route_text(&url("/"), "text/html", "<h1>landing</h1>");
        network.route_text(&url("/app.html"), "text/html", "<div id=app></div>");
        network.route_text(&url("/assets/css/main.css"), "text/css", "body{margin:0}");
        let clients = InMemoryClients::new();
        let registration = Arc::new(Registration::new(
            url("/"),
            url("/service-worker.js"),
            db.clone(),
            network.clone(),
            clients.clone(),
        ));
        Harness { db, network, clients, registration }
    }

    #[tokio::test]
    async fn test_first_install_activates_immediately() {
        let h = harness().await;
        let mut events = h.registration.subscribe();

        let outcome = h.registration.update(settings("v1")).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Activated { ref version, .. } if version == "v1"));

        let status = h.registration.status().await;
        assert_eq!(status.active, Some(WorkerStatus { version: "v1".into(), state: WorkerState::Active }));
        assert!(status.waiting.is_none());
        assert!(status.installing.is_none());

        assert_eq!(events.recv().await.unwrap(), LifecycleEvent::UpdateFound { version: "v1".into() });
        assert_eq!(events.recv().await.unwrap(), LifecycleEvent::Installed { version: "v1".into() });
        assert!(matches!(events.recv().await.unwrap(), LifecycleEvent::ControllerChange { .. }));
    }

    #[tokio::test]
    async fn test_same_version_is_unchanged() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        let calls = h.network.call_count();

        let outcome = h.registration.update(settings("v1")).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Unchanged { version: "v1".into() });
        assert_eq!(h.network.call_count(), calls);
    }

    #[tokio::test]
    async fn test_new_generation_waits_for_controlled_clients() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        let client = h.clients.open_controlled(url("/app.html"), Some("v1".into())).await;
        let mut events = h.registration.subscribe();

        let outcome = h.registration.update(settings("v2")).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Waiting { .. }));

        let status = h.registration.status().await;
        assert_eq!(status.active.unwrap().version, "v1");
        assert_eq!(status.waiting.unwrap().state, WorkerState::Waiting);

        let mut saw_waiting = false;
        while let Ok(event) = events.try_recv() {
            if event == (LifecycleEvent::NewGenerationWaiting { version: "v2".into(), active: "v1".into() }) {
                saw_waiting = true;
            }
        }
        assert!(saw_waiting);

        // Both generations exist until activation.
        assert!(h.db.has_generation("v1").await.unwrap());
        assert!(h.db.has_generation("v2").await.unwrap());

        assert!(h.registration.try_activate_waiting().await.unwrap().is_none());
        h.clients.close(client).await;
        let report = h.registration.try_activate_waiting().await.unwrap().unwrap();
        assert_eq!(report.deleted, vec!["v1".to_string()]);
        assert_eq!(h.registration.active_version().await.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_skip_waiting_message_activates_waiting_worker() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        let client = h.clients.open_controlled(url("/app.html"), Some("v1".into())).await;
        h.registration.update(settings("v2")).await.unwrap();
        let old = h.registration.worker(WorkerSlot::Active).await.unwrap();

        let reply = h.registration.post_message(WorkerSlot::Waiting, Message::SkipWaiting).await.unwrap();
        assert_eq!(reply, Reply::Ack { ok: true });

        assert_eq!(h.registration.active_version().await.as_deref(), Some("v2"));
        assert_eq!(old.state(), WorkerState::Redundant);
        assert_eq!(h.clients.controller_of(client).await.as_deref(), Some("v2"));
        assert_eq!(h.db.generation_names().await.unwrap(), vec!["v2".to_string()]);
    }

    #[tokio::test]
    async fn test_skip_waiting_on_install_setting() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        h.clients.open_controlled(url("/app.html"), Some("v1".into())).await;

        let mut s = settings("v2");
        s.skip_waiting_on_install = true;
        let outcome = h.registration.update(s).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Activated { .. }));
    }

    #[tokio::test]
    async fn test_skip_waiting_install_retires_older_waiting_worker() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        let client = h.clients.open_controlled(url("/app.html"), Some("v1".into())).await;
        h.registration.update(settings("v2")).await.unwrap();
        let v2 = h.registration.worker(WorkerSlot::Waiting).await.unwrap();

        let mut s = settings("v3");
        s.skip_waiting_on_install = true;
        let outcome = h.registration.update(s).await.unwrap();
        let UpdateOutcome::Activated { activate, .. } = outcome else {
            panic!("expected v3 to activate, got {outcome:?}");
        };
        assert_eq!(activate.deleted, vec!["v1".to_string(), "v2".to_string()]);
        assert_eq!(v2.state(), WorkerState::Redundant);
        assert!(h.registration.status().await.waiting.is_none());

        // Nothing left that could roll the registration back to v2.
        h.clients.close(client).await;
        assert!(h.registration.try_activate_waiting().await.unwrap().is_none());
        let result = h.registration.post_message(WorkerSlot::Waiting, Message::SkipWaiting).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));

        assert_eq!(h.registration.active_version().await.as_deref(), Some("v3"));
        assert_eq!(h.db.generation_names().await.unwrap(), vec!["v3".to_string()]);
    }

    #[tokio::test]
    async fn test_cleared_generation_is_reinstalled() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        h.db.clear().await.unwrap();

        let outcome = h.registration.update(settings("v1")).await.unwrap();
        let UpdateOutcome::Reinstalled { version, install } = outcome else {
            panic!("expected a reinstall, got {outcome:?}");
        };
        assert_eq!(version, "v1");
        assert_eq!(install.cached, 3);
        assert_eq!(h.db.generation_names().await.unwrap(), vec!["v1".to_string()]);

        let css = url("/assets/a.css");
        h.network.route_text(&css, "text/css", "a{}");
        h.registration.fetch(&Request::get(css.clone())).await.unwrap();
        h.registration.settle().await;
        let second = h.registration.fetch(&Request::get(css.clone())).await.unwrap();
        assert_eq!(second.served.source, Source::Cache);
        assert_eq!(h.network.calls_to(&css), 1);
    }

    #[tokio::test]
    async fn test_skip_waiting_posted_during_install() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        let client = h.clients.open_controlled(url("/app.html"), Some("v1".into())).await;

        h.network.pause();
        let registration = h.registration.clone();
        let update = tokio::spawn(async move { registration.update(settings("v2")).await });

        let installing = loop {
            if let Some(worker) = h.registration.worker(WorkerSlot::Installing).await {
                break worker;
            }
            tokio::task::yield_now().await;
        };

        let registration = h.registration.clone();
        let message =
            tokio::spawn(async move { registration.post_message(WorkerSlot::Installing, Message::SkipWaiting).await });
        while !installing.skip_waiting_requested() {
            tokio::task::yield_now().await;
        }
        assert_eq!(installing.state(), WorkerState::Installing);

        h.network.resume();
        let outcome = update.await.unwrap().unwrap();
        assert!(matches!(outcome, UpdateOutcome::Activated { ref version, .. } if version == "v2"));
        assert_eq!(message.await.unwrap().unwrap(), Reply::Ack { ok: true });

        assert_eq!(h.registration.active_version().await.as_deref(), Some("v2"));
        assert_eq!(h.clients.controller_of(client).await.as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_install_failure_stalls_and_keeps_active() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        let mut events = h.registration.subscribe();

        let outcome = h.registration.update(settings("")).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Stalled { .. }));

        let status = h.registration.status().await;
        assert_eq!(status.active.unwrap().version, "v1");
        assert_eq!(status.installing.unwrap().state, WorkerState::Installing);

        let mut saw_failure = false;
        while let Ok(event) = events.try_recv() {
            saw_failure |= matches!(event, LifecycleEvent::InstallFailed { .. });
        }
        assert!(saw_failure);

        // v1 keeps serving.
        h.network.set_offline(true);
        let fetched = h.registration.fetch(&Request::get(url("/assets/css/main.css"))).await.unwrap();
        assert_eq!(fetched.served.source, Source::Cache);
    }

    #[tokio::test]
    async fn test_get_version_message() {
        let h = harness().await;
        h.registration.update(settings("food-ninja-v2.2.0")).await.unwrap();

        let reply = h.registration.post_message(WorkerSlot::Active, Message::GetVersion).await.unwrap();
        assert_eq!(reply, Reply::Version { version: "food-ninja-v2.2.0".into() });
    }

    #[tokio::test]
    async fn test_message_to_empty_slot() {
        let h = harness().await;
        let result = h.registration.post_message(WorkerSlot::Waiting, Message::SkipWaiting).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_superseding_generation_replaces_entries() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        let v1 = h.db.generation("v1");
        assert_eq!(v1.len().await.unwrap(), 3);

        h.network.route_text(&url("/assets/css/main.css"), "text/css", "body{margin:1px}");
        h.registration.update(settings("v2")).await.unwrap();

        assert!(!h.db.has_generation("v1").await.unwrap());
        assert_eq!(v1.len().await.unwrap(), 0);
        let v2 = h.db.generation("v2");
        assert_eq!(v2.len().await.unwrap(), 3);
        let css = v2.match_url(&url("/assets/css/main.css")).await.unwrap().unwrap();
        assert_eq!(css.text(), Some("body{margin:1px}"));
    }

    #[tokio::test]
    async fn test_fetch_without_controller_goes_to_network() {
        let h = harness().await;
        let fetched = h.registration.fetch(&Request::get(url("/assets/css/main.css"))).await.unwrap();
        assert_eq!(fetched.category, None);
        assert_eq!(fetched.served.source, Source::Network);
        assert!(h.db.generation_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_non_get_is_transparent() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        let predict = url("/predict");
        h.network.route_text(&predict, "application/json", r#"{"food_name":"pho"}"#);
        let before = h.db.generation("v1").len().await.unwrap();

        let fetched = h.registration.fetch(&Request::new("POST", predict.clone())).await.unwrap();
        h.registration.settle().await;

        assert_eq!(fetched.category, None);
        assert_eq!(fetched.served.response.text(), Some(r#"{"food_name":"pho"}"#));
        assert_eq!(h.db.generation("v1").len().await.unwrap(), before);
        assert_eq!(h.network.methods_called().last().map(String::as_str), Some("POST"));
    }

    #[tokio::test]
    async fn test_fetch_non_get_offline_propagates() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        h.network.set_offline(true);

        let result = h.registration.fetch(&Request::new("POST", url("/predict"))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_offline_prediction_from_cache() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        let predict = url("/predict");
        h.network.route(
            &predict,
            Response::new(200, r#"{"food_name":"pho"}"#).with_header("Content-Type", "application/json"),
        );

        h.registration.fetch(&Request::get(predict.clone())).await.unwrap();
        h.registration.settle().await;

        h.network.set_offline(true);
        let fetched = h.registration.fetch(&Request::get(predict)).await.unwrap();
        assert_eq!(fetched.category, Some(Category::Api));
        assert_eq!(fetched.served.source, Source::Cache);
        let body: serde_json::Value = serde_json::from_slice(&fetched.served.response.body).unwrap();
        assert_eq!(body["food_name"], "pho");
    }

    #[tokio::test]
    async fn test_offline_navigation_gets_app_shell() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        h.network.set_offline(true);

        let fetched = h.registration.fetch(&Request::navigate(url("/history"))).await.unwrap();
        assert_eq!(fetched.served.source, Source::AppShell);
        assert_eq!(fetched.served.response.text(), Some("<div id=app></div>"));
    }

    #[tokio::test]
    async fn test_shutdown_retires_workers() {
        let h = harness().await;
        h.registration.update(settings("v1")).await.unwrap();
        let active = h.registration.worker(WorkerSlot::Active).await.unwrap();

        h.registration.shutdown().await;
        assert_eq!(active.state(), WorkerState::Redundant);
        assert!(h.registration.status().await.active.is_none());
        assert!(h.db.has_generation("v1").await.unwrap());
    }
}
