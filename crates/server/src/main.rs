//! mcp-pagectx server entry point.
//!
//! Boots the MCP server on stdio transport. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use pagectx_context::{CompactConfig, Compactor, PayloadAssembler, PayloadLimits};
use pagectx_core::cache::{ArtifactBackend, open_backend};
use pagectx_core::{AppConfig, SnapshotStore};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let backend = open_backend(&config).context("failed to open snapshot cache")?;
    tracing::info!(backend = backend.name(), "Starting mcp-pagectx server on stdio transport");

    let state = tools::ToolState::new(
        SnapshotStore::new(backend),
        Compactor::new(CompactConfig::from(&config)),
        PayloadAssembler::new(PayloadLimits::from(&config)),
    );

    let handler = handler::PagectxServer::new(state);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
