//! Last campaign log tool definition.

use futures::FutureExt;
use rmcp::{
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::domains::tools::store::CampaignLog;

/// The last campaign log tool takes no parameters.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct GetLastCampaignLogParams {}

/// Last campaign log tool - returns the most recent entry.
pub struct GetLastCampaignLogTool;

impl GetLastCampaignLogTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "ttrpgmcp_get_last_campaign_log";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Get the last campaign log entry";

    pub fn execute(log: &CampaignLog) -> CallToolResult {
        info!("Last campaign log requested");
        match log.last() {
            Ok(entry) => CallToolResult {
                content: vec![Content::text(format!(
                    "{} ({}): {}",
                    entry.title, entry.date, entry.content
                ))],
                structured_content: serde_json::to_value(&entry).ok(),
                is_error: Some(false),
                meta: None,
            },
            Err(e) => CallToolResult::error(vec![Content::text(e.to_string())]),
        }
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<GetLastCampaignLogParams>().into(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Create a ToolRoute for the stdio server.
    pub fn create_route<S>(log: Arc<CampaignLog>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |_ctx: ToolCallContext<'_, S>| {
            let log = log.clone();
            async move { Ok(Self::execute(&log)) }.boxed()
        })
    }
}
