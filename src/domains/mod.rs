//! Domains module containing business logic organized by bounded contexts.
//!
//! - **toolserver**: client side of the MCP stdio protocol
//! - **session**: the process-wide connection slot
//! - **orchestrator**: model-directed tool use
//! - **requests**: the synchronous request boundary
//! - **tools**: the stand-in TTRPG tool server served by `ttrpg-tools`

pub mod orchestrator;
pub mod requests;
pub mod session;
pub mod tools;
pub mod toolserver;
