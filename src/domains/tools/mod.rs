//! Campaign log tools.
//!
//! The tools served by the `ttrpg-tools` binary, a stdio MCP server the
//! bridge can launch as its tool server.
//!
//! - `definitions/` - one file per tool
//! - `router.rs` - ToolRouter builder
//! - `server.rs` - rmcp `ServerHandler`
//! - `store.rs` - in-memory campaign log

pub mod definitions;
mod error;
pub mod router;
mod server;
mod store;

pub use error::ToolError;
pub use router::build_tool_router;
pub use server::TtrpgToolServer;
pub use store::{CampaignLog, CampaignLogEntry};
