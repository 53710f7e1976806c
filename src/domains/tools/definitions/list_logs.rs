//! List campaign logs tool definition.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::domains::tools::store::CampaignLog;

const DEFAULT_LIMIT: usize = 5;

/// Parameters for the list campaign logs tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListCampaignLogsParams {
    /// Maximum number of entries to return, newest first. Defaults to 5.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// List campaign logs tool - returns recent entries.
pub struct ListCampaignLogsTool;

impl ListCampaignLogsTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "ttrpgmcp_list_campaign_logs";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str =
        "List the most recent campaign log entries, newest first";

    pub fn execute(params: &ListCampaignLogsParams, log: &CampaignLog) -> CallToolResult {
        let entries = log.recent(params.limit.unwrap_or(DEFAULT_LIMIT));

        let summary = if entries.is_empty() {
            "No campaign log entries yet.".to_string()
        } else {
            entries
                .iter()
                .map(|e| format!("#{} {} ({})", e.id, e.title, e.date))
                .collect::<Vec<_>>()
                .join("\n")
        };

        CallToolResult {
            content: vec![Content::text(summary)],
            structured_content: Some(json!({ "entries": entries })),
            is_error: Some(false),
            meta: None,
        }
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: schema_for_type::<ListCampaignLogsParams>().into(),
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
                let params: ListCampaignLogsParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &log))
            }
            .boxed()
        })
    }
}
