//! client_open / client_close tool implementations.
//!
//! Simulated page views. A waiting generation activates once the last view
//! controlled by the old one closes.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_worker::fetch::resolve;
use shellcache_worker::lifecycle::{ClientId, LifecycleEvent, RegistrationStatus};

use super::json_result;
use crate::error::ToolError;
use crate::state::AppState;

/// Parameters for the client_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientOpenParams {
    /// Page URL; origin-relative paths resolve against the served origin.
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientOpenOutput {
    pub id: ClientId,
    pub url: String,
    /// Generation controlling the new view, if a registration covers it.
    pub controller: Option<String>,
}

/// Parameters for the client_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientCloseParams {
    /// Client identifier returned by client_open.
    pub id: ClientId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientCloseOutput {
    pub closed: bool,
    /// Generations that activated because this view closed.
    pub activated: Vec<String>,
    pub registrations: Vec<RegistrationStatus>,
    pub events: Vec<LifecycleEvent>,
}

pub async fn open_impl(state: &AppState, params: ClientOpenParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }
    let url = resolve(state.container.origin(), &params.url)
        .map_err(|e| ToolError::InvalidInput(format!("invalid url {}: {e}", params.url)))?;

    let controller = match state.container.matching(&url).await {
        Some(registration) => registration.active_version().await,
        None => None,
    };
    let id = state.clients.open_controlled(url.clone(), controller.clone()).await;
    tracing::debug!("client {} opened at {} (controller: {:?})", id, url, controller);

    json_result(&ClientOpenOutput { id, url: url.to_string(), controller })
}

pub async fn close_impl(state: &AppState, params: ClientCloseParams) -> Result<CallToolResult, McpError> {
    let closed = state.clients.close(params.id).await;

    let mut activated = Vec::new();
    let mut registrations = Vec::new();
    for registration in state.container.registrations().await {
        if closed && let Some(report) = registration.try_activate_waiting().await? {
            activated.push(report.version);
        }
        registrations.push(registration.status().await);
    }

    let events = state.take_events().await;
    json_result(&ClientCloseOutput { closed, activated, registrations, events })
}
