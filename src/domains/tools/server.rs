//! MCP server handler for the campaign log tools.
//!
//! The handler only advertises tools; every route is built in
//! [`build_tool_router`].

use rmcp::{ServerHandler, handler::server::tool::ToolRouter, model::*, tool_handler};
use std::sync::Arc;

use super::build_tool_router;
use super::store::CampaignLog;

/// Stdio tool server offering the campaign log tools.
#[derive(Clone)]
pub struct TtrpgToolServer {
    log: Arc<CampaignLog>,

    /// Tool router for handling tool calls.
    tool_router: ToolRouter<Self>,
}

impl TtrpgToolServer {
    /// Create a server with an empty campaign log.
    pub fn new() -> Self {
        Self::with_log(Arc::new(CampaignLog::new()))
    }

    /// Create a server backed by `log`.
    pub fn with_log(log: Arc<CampaignLog>) -> Self {
        Self {
            tool_router: build_tool_router::<Self>(log.clone()),
            log,
        }
    }

    /// The campaign log the tools write to.
    pub fn log(&self) -> &Arc<CampaignLog> {
        &self.log
    }

    /// Names of the registered tools.
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect()
    }
}

impl Default for TtrpgToolServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for TtrpgToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "TTRPG campaign tools. Record what happened in a session and look up past sessions."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "TTRPG".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }
}
