//! Tool Router - builds the rmcp ToolRouter for the campaign log tools.
//!
//! Each tool knows how to create its own route; this module only wires them
//! to one shared [`CampaignLog`].

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;

use super::definitions::{CreateCampaignLogTool, GetLastCampaignLogTool, ListCampaignLogsTool};
use super::store::CampaignLog;

/// Build the tool router with all registered tools.
pub fn build_tool_router<S>(log: Arc<CampaignLog>) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    ToolRouter::new()
        .with_route(CreateCampaignLogTool::create_route(log.clone()))
        .with_route(GetLastCampaignLogTool::create_route(log.clone()))
        .with_route(ListCampaignLogsTool::create_route(log))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestServer {}

    #[test]
    fn test_build_router() {
        let router: ToolRouter<TestServer> = build_tool_router(Arc::new(CampaignLog::new()));
        let tools = router.list_all();
        assert_eq!(tools.len(), 3);

        let names: Vec<_> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert!(names.contains(&"ttrpgmcp_create_campaign_log"));
        assert!(names.contains(&"ttrpgmcp_get_last_campaign_log"));
        assert!(names.contains(&"ttrpgmcp_list_campaign_logs"));
    }

    #[test]
    fn test_every_tool_has_object_schema() {
        let router: ToolRouter<TestServer> = build_tool_router(Arc::new(CampaignLog::new()));
        for tool in router.list_all() {
            assert_eq!(
                tool.input_schema.get("type").and_then(|t| t.as_str()),
                Some("object"),
                "{}",
                tool.name
            );
        }
    }
}
