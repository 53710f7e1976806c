//! Tool-server domain.
//!
//! Owns the client side of the MCP stdio channel. The rmcp client service
//! carries the protocol; this module adds the connection lifecycle on top.
//!
//! - `connection.rs` - [`ToolServerConnection`] and its state machine
//! - `launch.rs` - subprocess launch parameters
//! - `error.rs` - the connection/protocol/invocation/transport taxonomy

mod connection;
mod error;
mod launch;

pub use connection::{ConnectionState, ToolDescriptor, ToolOutput, ToolServerConnection};
pub use error::{ToolServerError, ToolServerResult};
pub use launch::LaunchSpec;
