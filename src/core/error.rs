//! Error types and handling for the bridge.
//!
//! Startup and shutdown failures of the bridge process. Per-request failures
//! never reach this type; they are answered over HTTP.

use thiserror::Error;

/// A specialized Result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the bridge.
#[derive(Debug, Error)]
pub enum Error {
    /// Error from the execution context.
    #[error("Execution error: {0}")]
    Execution(#[from] super::executor::ExecutionError),

    /// Error from the HTTP transport.
    #[error("Transport error: {0}")]
    Transport(#[from] super::transport::TransportError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::TransportError;

    #[test]
    fn test_bind_failure_keeps_address() {
        let source = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err: Error = TransportError::bind("0.0.0.0:5005", source).into();
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.to_string().contains("0.0.0.0:5005"), "{err}");
    }

    #[test]
    fn test_stopped_context_is_execution_error() {
        let err: Error = crate::core::ExecutionError::Stopped.into();
        assert!(err.to_string().starts_with("Execution error"), "{err}");
    }
}
