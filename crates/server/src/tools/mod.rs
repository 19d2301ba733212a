//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shellcache server.

pub mod cache;
pub mod clients;
pub mod fetch;
pub mod message;
pub mod register;
pub mod status;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use shellcache_core::Response;

use crate::error::ToolError;

/// One response header.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
}

/// Response rendered for tool output. Binary bodies are reported by size only.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    pub status: u16,
    pub status_text: String,
    pub kind: &'static str,
    pub content_type: Option<String>,
    pub headers: Vec<HeaderField>,
    pub body: Option<String>,
    pub body_bytes: usize,
}

impl From<&Response> for ResponseView {
    fn from(response: &Response) -> Self {
        Self {
            status: response.status,
            status_text: response.status_text.clone(),
            kind: response.kind.as_str(),
            content_type: response.content_type().map(String::from),
            headers: response
                .headers
                .iter()
                .map(|(name, value)| HeaderField { name: name.to_string(), value: value.to_string() })
                .collect(),
            body: response.text().map(String::from),
            body_bytes: response.body.len(),
        }
    }
}

/// Encode `output` as the pretty-printed JSON text of a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(ToolError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use rmcp::model::CallToolResult;
    use shellcache_core::{AppConfig, CacheDb, Request, Response};
    use shellcache_worker::fetch::{FetchError, Network};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::state::AppState;

    pub const ORIGIN: &str = "https://app.example";

    #[derive(Default)]
    pub struct StubNetwork {
        routes: Mutex<HashMap<String, Response>>,
        offline: AtomicBool,
    }

    impl StubNetwork {
        pub fn route(&self, path: &str, content_type: &str, body: &str) {
            let url = format!("{ORIGIN}{path}");
            let response = Response::new(200, body).with_header("Content-Type", content_type);
            self.routes.lock().unwrap().insert(url, response);
        }

        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Network for StubNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(FetchError::Connect("offline".into()));
            }
            let routed = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
            Ok(routed.unwrap_or_else(|| Response::new(404, "not found")))
        }
    }

    pub async fn state() -> (AppState, Arc<StubNetwork>) {
        let network = Arc::new(StubNetwork::default());
        network.route("/", "text/html", "<h1>landing</h1>");
        network.route("/app.html", "text/html", "<div id=app></div>");

        let config = AppConfig {
            version: "food-ninja-v2.2.0".into(),
            origin: Some(ORIGIN.into()),
            manifest: vec!["/".into(), "/app.html".into()],
            ..Default::default()
        };
        let db = CacheDb::open_in_memory().await.unwrap();
        let state = AppState::new(config, db, network.clone()).unwrap();
        (state, network)
    }

    /// Registered and activated with the configured version.
    pub async fn registered_state() -> (AppState, Arc<StubNetwork>) {
        let (state, network) = state().await;
        let settings = state.settings(None).unwrap();
        state.container.register("/service-worker.js", "/", settings).await.unwrap();
        (state, network)
    }

    pub fn output(result: &CallToolResult) -> serde_json::Value {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
