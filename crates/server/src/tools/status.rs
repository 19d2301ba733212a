//! sw_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;
use shellcache_core::cache::GenerationInfo;
use shellcache_worker::lifecycle::{ClientDirectory, ClientInfo, LifecycleEvent, RegistrationStatus};

use super::json_result;
use crate::state::AppState;

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwStatusOutput {
    pub origin: String,
    pub registrations: Vec<RegistrationStatus>,
    pub generations: Vec<GenerationInfo>,
    pub clients: Vec<ClientInfo>,
    /// Most recent lifecycle events, oldest first.
    pub events: Vec<LifecycleEvent>,
}

/// Snapshot of every registration, stored generation, open client and the
/// latest lifecycle events.
pub async fn status_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let mut registrations = Vec::new();
    for registration in state.container.registrations().await {
        registrations.push(registration.status().await);
    }

    let generations = state.db().generations().await?;
    let clients = state.clients.open_clients().await;
    let events = state.recent_events().await;

    json_result(&SwStatusOutput {
        origin: state.container.origin().to_string(),
        registrations,
        generations,
        clients,
        events,
    })
}
