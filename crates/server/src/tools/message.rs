//! sw_message tool implementation.
//!
//! Posts a control message (`SKIP_WAITING`, `GET_VERSION`) to one of the
//! registration's workers.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_worker::lifecycle::{LifecycleEvent, RegistrationStatus, WorkerSlot};
use shellcache_worker::{Message, Reply};

use super::json_result;
use crate::state::AppState;

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    #[serde(flatten)]
    pub message: Message,

    /// Worker to address. SKIP_WAITING defaults to the waiting worker,
    /// GET_VERSION to the active one.
    #[serde(default)]
    pub target: Option<WorkerSlot>,

    /// Registration scope (default: configured scope).
    #[serde(default)]
    pub scope: Option<String>,
}

/// Output from the sw_message tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwMessageOutput {
    pub target: WorkerSlot,
    pub reply: Reply,
    pub status: RegistrationStatus,
    pub events: Vec<LifecycleEvent>,
}

pub async fn message_impl(state: &AppState, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let target = params.target.unwrap_or(match params.message {
        Message::SkipWaiting => WorkerSlot::Waiting,
        Message::GetVersion => WorkerSlot::Active,
    });

    let registration = state.registration(params.scope.as_deref()).await?;
    let reply = registration.post_message(target, params.message).await?;
    let status = registration.status().await;
    let events = state.take_events().await;

    json_result(&SwMessageOutput { target, reply, status, events })
}
