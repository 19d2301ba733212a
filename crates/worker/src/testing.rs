//! Test doubles shared by the worker's unit tests.

use async_trait::async_trait;
use shellcache_core::{CacheDb, Request, RequestMode, Response, ResponseKind};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use url::Url;

use crate::fetch::{FetchError, Network};

pub const ORIGIN: &str = "https://app.example";

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub async fn memory_db() -> CacheDb {
    CacheDb::open_in_memory().await.unwrap()
}

/// Scripted network: fixed responses per URL, a call log, an offline switch
/// and a pause switch that holds requests until resumed.
#[derive(Default)]
pub struct StubNetwork {
    routes: Mutex<HashMap<String, Response>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, String)>>,
    offline: AtomicBool,
    paused: AtomicBool,
    resumed: Notify,
}

impl StubNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, url: &Url, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn route_text(&self, url: &Url, content_type: &str, body: &str) {
        self.route(url, Response::new(200, body).with_header("Content-Type", content_type));
    }

    /// Make one URL fail at the transport level.
    pub fn fail(&self, url: &Url) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Hold every request until [`StubNetwork::resume`].
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.resumed.notify_waiters();
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, url: &Url) -> usize {
        self.calls.lock().unwrap().iter().filter(|(_, u)| u == url.as_str()).count()
    }

    pub fn methods_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        while self.paused.load(Ordering::SeqCst) {
            let resumed = self.resumed.notified();
            if !self.paused.load(Ordering::SeqCst) {
                break;
            }
            resumed.await;
        }

        let key = request.url.to_string();
        self.calls.lock().unwrap().push((request.method.clone(), key.clone()));

        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&key) {
            return Err(FetchError::Connect(format!("stub network unreachable: {key}")));
        }

        let routed = self.routes.lock().unwrap().get(&key).cloned();
        let response = routed.unwrap_or_else(|| Response::new(404, "not found"));

        let same_origin = request.url.origin() == Url::parse(ORIGIN).unwrap().origin();
        if request.mode == RequestMode::NoCors && !same_origin {
            return Ok(Response::opaque(response.body));
        }

        let kind = if same_origin { response.kind } else { ResponseKind::Cors };
        Ok(Response { url: Some(request.url.clone()), kind, ..response })
    }
}
