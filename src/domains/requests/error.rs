//! Request-level error types.

use serde::Serialize;
use thiserror::Error;

use crate::core::executor::ExecutionError;
use crate::domains::orchestrator::OrchestrationError;

/// User-facing message returned for every failed request.
pub const APOLOGY: &str = "I'm sorry, I encountered an error while processing your request.";

/// Terminal failure of one inbound request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request body could not be interpreted.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No ready tool-server connection was available.
    #[error("Tool server unavailable: {0}")]
    Connection(String),

    /// The orchestration collaborator failed.
    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    /// The execution context could not run the request.
    #[error("Execution failed: {0}")]
    Execution(#[from] ExecutionError),
}

impl RequestError {
    /// Create a bad request error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Generic message plus the machine-readable cause.
    pub fn to_failure(&self) -> Failure {
        Failure {
            response: APOLOGY.to_string(),
            error: self.to_string(),
        }
    }
}

/// Body of a failed `/process_sync` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub response: String,
    pub error: String,
}
