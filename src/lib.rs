//! TTRPG agent bridge.
//!
//! An HTTP service that answers questions by running a model-directed
//! tool-use loop against one long-lived MCP tool server subprocess.
//!
//! # Architecture
//!
//! - **core**: configuration, errors, the execution context and the HTTP transport
//! - **domains**: business logic organized by bounded contexts
//!   - **toolserver**: the stdio connection to the tool server
//!   - **session**: the process-wide holder of that connection
//!   - **orchestrator**: the tool-use loop
//!   - **requests**: the synchronous request state machine
//!   - **tools**: campaign log tools served by the `ttrpg-tools` binary
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ttrpg_agent_bridge::core::{Config, ExecutionContext};
//! use ttrpg_agent_bridge::domains::session::SessionRegistry;
//!
//! fn main() -> ttrpg_agent_bridge::Result<()> {
//!     let config = Config::from_env();
//!     let context = ExecutionContext::start("tool-session")?;
//!     let registry = Arc::new(SessionRegistry::new(
//!         config.tool_server.name,
//!         config.tool_server.launch,
//!     ));
//!     let conn = context.run_blocking(async move { registry.get_or_init_connection().await })?;
//!     println!("tool server is {}", conn.state());
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

pub use core::{Config, Error, Result};
