//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::state::AppState;
use crate::tools::cache::{CacheClearParams, CacheGetParams, clear_impl, get_impl};
use crate::tools::clients::{ClientCloseParams, ClientOpenParams, close_impl, open_impl};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::message::{SwMessageParams, message_impl};
use crate::tools::register::{SwRegisterParams, register_impl};
use crate::tools::status::status_impl;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use std::sync::Arc;

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellcacheServer {
    tool_router: ToolRouter<Self>,
    state: Arc<AppState>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShellcacheServer {
    /// Create a new server handler.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { tool_router: Self::tool_router(), state }
    }

    /// Register the worker for a scope and install a cache generation.
    ///
    /// A new generation waits while pages are controlled by the previous one,
    /// unless it was told to skip waiting.
    #[tool(
        description = "Register the caching worker for a scope and install a cache generation. Returns the update outcome and the registration's worker slots."
    )]
    async fn sw_register(&self, params: Parameters<SwRegisterParams>) -> Result<CallToolResult, McpError> {
        register_impl(&self.state, params.0).await
    }

    /// Issue a request through the active worker.
    #[tool(
        description = "Fetch a URL through the active worker. Returns the request category, where the response came from (network, cache, app_shell, fallback) and the response."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "Post SKIP_WAITING or GET_VERSION to the installing, waiting or active worker.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.state, params.0).await
    }

    #[tool(description = "Report registrations, stored cache generations and open client views.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state).await
    }

    #[tool(description = "Open a simulated page view. It is controlled by the active generation of the covering scope.")]
    async fn client_open(&self, params: Parameters<ClientOpenParams>) -> Result<CallToolResult, McpError> {
        open_impl(&self.state, params.0).await
    }

    /// Close a page view; a waiting generation activates once nothing uses the old one.
    #[tool(description = "Close a simulated page view. Activates waiting generations that no longer have controlled pages blocking them.")]
    async fn client_close(&self, params: Parameters<ClientCloseParams>) -> Result<CallToolResult, McpError> {
        close_impl(&self.state, params.0).await
    }

    #[tool(description = "Get the cached entry for a URL from a generation (default: the active one).")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state, params.0).await
    }

    #[tool(description = "Delete a cache generation, or all generations when none is named.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        clear_impl(&self.state, params.0).await
    }
}

impl ServerHandler for ShellcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!(
                "Offline-first caching worker for {}. Register with sw_register, then route requests with sw_fetch.",
                self.state.container.origin()
            )),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::state;

    #[tokio::test]
    async fn test_router_lists_all_tools() {
        let (state, _) = state().await;
        let server = ShellcacheServer::new(Arc::new(state));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_clear",
                "cache_get",
                "client_close",
                "client_open",
                "sw_fetch",
                "sw_message",
                "sw_register",
                "sw_status"
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let (state, _) = state().await;
        let info = ShellcacheServer::new(Arc::new(state)).get_info();
        assert_eq!(info.server_info.name, "shellcache");
        assert!(info.instructions.unwrap().contains("https://app.example"));
    }
}
