//! Create campaign log tool definition.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domains::tools::store::CampaignLog;

/// Parameters for the create campaign log tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateCampaignLogParams {
    /// Title of the session entry.
    pub title: String,

    /// What happened during the session.
    pub content: String,

    /// Session date as YYYY-MM-DD. Defaults to today.
    #[serde(default)]
    pub date: Option<String>,
}

/// Create campaign log tool - appends an entry to the campaign log.
pub struct CreateCampaignLogTool;

impl CreateCampaignLogTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "ttrpgmcp_create_campaign_log";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Create a new campaign log entry";

    #[instrument(skip_all, fields(title = %params.title))]
    pub fn execute(params: &CreateCampaignLogParams, log: &CampaignLog) -> CallToolResult {
        match log.create(&params.title, &params.content, params.date.as_deref()) {
            Ok(entry) => {
                info!("Created campaign log entry {}", entry.id);
                CallToolResult {
                    content: vec![Content::text(format!(
                        "Campaign log entry {} created: {} ({})",
                        entry.id, entry.title, entry.date
                    ))],
                    structured_content: serde_json::to_value(&entry).ok(),
                    is_error: Some(false),
                    meta: None,
                }
            }
            Err(e) => {
                warn!("Rejected campaign log entry: {}", e);
                CallToolResult::error(vec![Content::text(e.to_string())])
            }
        }
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<CreateCampaignLogParams>().into(),
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
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let log = log.clone();
            async move {
                let params: CreateCampaignLogParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &log))
            }
            .boxed()
        })
    }
}
