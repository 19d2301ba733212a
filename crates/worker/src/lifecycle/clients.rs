//! Open client views (pages/tabs) and which generation controls them.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use url::Url;

use crate::fetch::in_scope;

pub type ClientId = u64;

/// One open client view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ClientInfo {
    pub id: ClientId,
    pub url: String,
    /// Generation currently controlling the client, if any.
    pub controller: Option<String>,
}

/// Registry of open client views, supplied by the host.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn open_clients(&self) -> Vec<ClientInfo>;

    /// Make `generation` the controller of every client inside `scope`.
    ///
    /// Returns the number of clients whose controller changed. Claiming is
    /// idempotent: a second call with the same generation returns 0.
    async fn claim(&self, scope: &Url, generation: &str) -> usize;

    /// Number of open clients controlled by `generation`.
    async fn controlled_by(&self, generation: &str) -> usize;
}

#[derive(Debug, Clone)]
struct ClientEntry {
    url: Url,
    controller: Option<String>,
}

/// In-process client directory.
#[derive(Debug, Default)]
pub struct InMemoryClients {
    next_id: AtomicU64,
    clients: RwLock<HashMap<ClientId, ClientEntry>>,
}

impl InMemoryClients {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Open an uncontrolled client view at `url`.
    pub async fn open(&self, url: Url) -> ClientId {
        self.open_controlled(url, None).await
    }

    /// Open a client view that is already controlled, as after a reload.
    pub async fn open_controlled(&self, url: Url, controller: Option<String>) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.clients.write().await.insert(id, ClientEntry { url, controller });
        id
    }

    /// Close a client view. Returns false if it wasn't open.
    pub async fn close(&self, id: ClientId) -> bool {
        self.clients.write().await.remove(&id).is_some()
    }

    pub async fn controller_of(&self, id: ClientId) -> Option<String> {
        self.clients.read().await.get(&id).and_then(|c| c.controller.clone())
    }
}

#[async_trait]
impl ClientDirectory for InMemoryClients {
    async fn open_clients(&self) -> Vec<ClientInfo> {
        let clients = self.clients.read().await;
        let mut out: Vec<ClientInfo> = clients
            .iter()
            .map(|(id, c)| ClientInfo { id: *id, url: c.url.to_string(), controller: c.controller.clone() })
            .collect();
        out.sort_by_key(|c| c.id);
        out
    }

    async fn claim(&self, scope: &Url, generation: &str) -> usize {
        let mut clients = self.clients.write().await;
        let mut changed = 0;
        for client in clients.values_mut() {
            if in_scope(scope, &client.url) && client.controller.as_deref() != Some(generation) {
                client.controller = Some(generation.to_string());
                changed += 1;
            }
        }
        changed
    }

    async fn controlled_by(&self, generation: &str) -> usize {
        let clients = self.clients.read().await;
        clients.values().filter(|c| c.controller.as_deref() == Some(generation)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::url;

    #[tokio::test]
    async fn test_open_and_close() {
        let clients = InMemoryClients::new();
        let a = clients.open(url("/app.html")).await;
        let b = clients.open(url("/index.html")).await;
        assert_ne!(a, b);
        assert_eq!(clients.open_clients().await.len(), 2);

        assert!(clients.close(a).await);
        assert!(!clients.close(a).await);
        assert_eq!(clients.open_clients().await.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_is_scoped_and_idempotent() {
        let clients = InMemoryClients::new();
        let inside = clients.open(url("/app/home")).await;
        let outside = clients.open(url("/admin")).await;
        let scope = url("/app/");

        assert_eq!(clients.claim(&scope, "v1").await, 1);
        assert_eq!(clients.claim(&scope, "v1").await, 0);
        assert_eq!(clients.controller_of(inside).await.as_deref(), Some("v1"));
        assert_eq!(clients.controller_of(outside).await, None);
        assert_eq!(clients.controlled_by("v1").await, 1);
    }

    #[tokio::test]
    async fn test_claim_replaces_previous_controller() {
        let clients = InMemoryClients::new();
        let id = clients.open_controlled(url("/app.html"), Some("v1".into())).await;

        assert_eq!(clients.claim(&url("/"), "v2").await, 1);
        assert_eq!(clients.controller_of(id).await.as_deref(), Some("v2"));
        assert_eq!(clients.controlled_by("v1").await, 0);
    }
}
