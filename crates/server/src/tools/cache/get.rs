//! cache_get tool implementation.
//!
//! Looks up the entry a generation holds for a request.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{Error, Request};
use shellcache_worker::fetch::resolve;

use crate::error::ToolError;
use crate::state::AppState;
use crate::tools::{ResponseView, json_result};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the cached request; origin-relative paths resolve against the served origin.
    pub url: String,

    /// Generation to read (default: the active generation, else the configured version).
    #[serde(default)]
    pub generation: Option<String>,

    /// Request method the entry was stored under (default: GET).
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheGetOutput {
    pub generation: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub stored_at: String,
    pub response: ResponseView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(state: &AppState, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }
    let url = resolve(state.container.origin(), &params.url)
        .map_err(|e| ToolError::InvalidInput(format!("invalid url {}: {e}", params.url)))?;

    let generation = match params.generation {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => default_generation(state).await,
    };

    let request = Request::new(params.method.trim(), url);
    let entry = state
        .db()
        .generation(&generation)
        .entry(&request)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("{} {} in {}", request.method, request.url, generation)))?;

    json_result(&CacheGetOutput {
        generation: entry.generation,
        key_hash: entry.key_hash,
        method: entry.method,
        url: entry.url,
        stored_at: entry.stored_at,
        response: ResponseView::from(&entry.response),
    })
}

async fn default_generation(state: &AppState) -> String {
    if let Ok(registration) = state.registration(None).await
        && let Some(active) = registration.active_version().await
    {
        return active;
    }
    state.config.version.clone()
}
