//! sw_register tool implementation.
//!
//! Registers the worker script for a scope and installs a generation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_worker::lifecycle::{LifecycleEvent, RegistrationStatus, UpdateOutcome};

use super::json_result;
use crate::state::AppState;

/// Parameters for the sw_register tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwRegisterParams {
    /// Worker script location (default: configured script_url).
    #[serde(default)]
    pub script_url: Option<String>,

    /// Registration scope path (default: configured scope).
    #[serde(default)]
    pub scope: Option<String>,

    /// Generation identifier to install (default: configured version).
    #[serde(default)]
    pub version: Option<String>,
}

/// Output from the sw_register tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwRegisterOutput {
    pub outcome: UpdateOutcome,
    pub status: RegistrationStatus,
    /// Lifecycle events published while registering.
    pub events: Vec<LifecycleEvent>,
}

pub async fn register_impl(state: &AppState, params: SwRegisterParams) -> Result<CallToolResult, McpError> {
    let settings = state.settings(params.version.as_deref())?;
    let script = params.script_url.as_deref().unwrap_or(&state.config.script_url);
    let scope = params.scope.as_deref().unwrap_or(&state.config.scope);

    let (registration, outcome) = state.container.register(script, scope, settings).await?;
    let status = registration.status().await;
    let events = state.take_events().await;

    json_result(&SwRegisterOutput { outcome, status, events })
}
