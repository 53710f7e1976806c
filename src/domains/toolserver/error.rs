//! Tool-server error types.

use thiserror::Error;

use super::ConnectionState;

/// Result type for tool-server operations.
pub type ToolServerResult<T> = Result<T, ToolServerError>;

/// Errors raised by a [`super::ToolServerConnection`].
#[derive(Debug, Clone, Error)]
pub enum ToolServerError {
    /// The subprocess failed to start or the handshake failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation attempted in the wrong state, or the server violated the protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The tool reported a failure for a specific call.
    #[error("Tool '{tool}' failed: {message}")]
    Invocation { tool: String, message: String },

    /// The channel broke after the connection was ready.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ToolServerError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an invocation error for the named tool.
    pub fn invocation(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invocation {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Error for an operation that requires `Ready`.
    pub(crate) fn not_ready(operation: &str, state: ConnectionState) -> Self {
        match state {
            ConnectionState::Closed | ConnectionState::Failed => {
                Self::transport(format!("cannot {operation}: connection is {state}"))
            }
            ConnectionState::Uninitialized | ConnectionState::Connecting => {
                Self::protocol(format!("cannot {operation}: connection is {state}"))
            }
            ConnectionState::Ready => Self::protocol(format!("cannot {operation}")),
        }
    }

    /// Whether this error means the channel can no longer be used.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
