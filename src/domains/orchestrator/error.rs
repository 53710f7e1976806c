//! Orchestration error types.

use thiserror::Error;

use crate::domains::toolserver::ToolServerError;

/// Failures of an orchestration run.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// No API key is configured for the model provider.
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    /// The request to the model provider could not be completed.
    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The model provider answered with an error status.
    #[error("Model provider returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The provider's answer did not have the expected shape.
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    /// A tool call failed.
    #[error(transparent)]
    ToolServer(#[from] ToolServerError),

    /// The model kept requesting tools past the turn limit.
    #[error("Exceeded the limit of {0} tool-use turns")]
    TurnLimit(usize),
}

impl OrchestrationError {
    /// Create a malformed response error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}
