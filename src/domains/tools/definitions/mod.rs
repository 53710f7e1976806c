//! Tool definitions module.
//!
//! Each tool is defined in its own file.

mod create_log;
mod last_log;
mod list_logs;

pub use create_log::{CreateCampaignLogParams, CreateCampaignLogTool};
pub use last_log::{GetLastCampaignLogParams, GetLastCampaignLogTool};
pub use list_logs::{ListCampaignLogsParams, ListCampaignLogsTool};
