//! sw_fetch tool implementation.
//!
//! Issues a request through the registration, the way a controlled page would.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{Destination, Error, Request};
use shellcache_worker::Source;
use shellcache_worker::fetch::resolve;

use super::{ResponseView, json_result};
use crate::error::ToolError;
use crate::state::AppState;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// URL to request; origin-relative paths resolve against the served origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional Accept header. Navigations default to an HTML accept list.
    #[serde(default)]
    pub accept: Option<String>,

    /// Request destination, e.g. "document" or "image" (default: empty).
    #[serde(default)]
    pub destination: Destination,

    /// Registration scope to route through (default: configured scope).
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwFetchOutput {
    pub url: String,
    pub method: String,
    /// Strategy category, or null when the request was not intercepted.
    pub category: Option<&'static str>,
    pub source: Source,
    pub response: ResponseView,
}

pub async fn fetch_impl(state: &AppState, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let method = params.method.trim();
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ToolError::InvalidInput(format!("invalid method: {:?}", params.method)).into());
    }

    let url = resolve(state.container.origin(), &params.url)
        .map_err(|e| ToolError::InvalidInput(format!("invalid url {}: {e}", params.url)))?;

    let mut request = if params.destination == Destination::Document {
        Request::navigate(url)
    } else {
        Request::get(url).with_destination(params.destination)
    }
    .with_method(method);
    if let Some(accept) = &params.accept {
        request = request.with_header("Accept", accept.as_str());
    }

    let registration = state.registration(params.scope.as_deref()).await?;
    let fetched = registration.fetch(&request).await.map_err(Error::from)?;
    registration.settle().await;

    tracing::debug!(
        "sw_fetch {} {} -> {} via {}",
        request.method,
        request.url,
        fetched.served.response.status,
        fetched.served.source.as_str()
    );

    json_result(&SwFetchOutput {
        url: request.url.to_string(),
        method: request.method.clone(),
        category: fetched.category.map(|c| c.as_str()),
        source: fetched.served.source,
        response: ResponseView::from(&fetched.served.response),
    })
}
