//! cache_clear tool implementation.
//!
//! Deletes one generation, or every generation when none is named.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Generation to delete. Omit to delete all generations.
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheClearOutput {
    /// Names of the deleted generations.
    pub deleted: Vec<String>,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(state: &AppState, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let deleted = match params.generation {
        Some(name) => {
            if state.db().delete_generation(&name).await? {
                vec![name]
            } else {
                Vec::new()
            }
        }
        None => state.db().clear().await?,
    };

    tracing::info!("cleared {} generation(s)", deleted.len());
    json_result(&CacheClearOutput { deleted })
}
