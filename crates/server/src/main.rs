//! shellcache server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_core::{AppConfig, CacheDb};
use shellcache_worker::fetch::parse_origin;
use shellcache_worker::{FetchConfig, HttpNetwork};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let origin = parse_origin(config.require_origin()?).context("invalid origin")?;

    tracing::info!("Starting shellcache server for {} on stdio transport", origin);

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache database {}", config.db_path.display()))?;
    let network = HttpNetwork::new(FetchConfig::from_app_config(&config, origin))?;
    let state = state::AppState::new(config, db, Arc::new(network))?;

    let settings = state.settings(None)?;
    let (_, outcome) = state
        .container
        .register(&state.config.script_url, &state.config.scope, settings)
        .await?;
    tracing::info!("registered {} for scope {}: {:?}", state.config.script_url, state.config.scope, outcome);
    state.take_events().await;

    let handler = handler::ShellcacheServer::new(Arc::new(state));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
