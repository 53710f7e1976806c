//! Campaign log tool server speaking MCP over stdio.
//!
//! stdout carries the protocol, so all logging goes to stderr.

use anyhow::Result;
use rmcp::ServiceExt;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use ttrpg_agent_bridge::domains::tools::TtrpgToolServer;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let server = TtrpgToolServer::new();
    info!(tools = ?server.tool_names(), "Starting TTRPG tool server on stdio");

    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    info!("Tool server shutting down");
    Ok(())
}
