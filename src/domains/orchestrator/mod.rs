//! Orchestrator domain.
//!
//! An [`Orchestrator`] takes the live tool-server connection and a prompt,
//! drives a model-directed tool-use loop and returns the final text.
//!
//! - `openai.rs` - Chat Completions function-calling implementation
//! - `trace.rs` - per-run trace identifiers
//! - `error.rs` - orchestration failures

mod error;
mod openai;
mod trace;

use serde_json::Value;
use std::sync::Arc;

use crate::domains::toolserver::ToolServerConnection;

pub use error::OrchestrationError;
pub use openai::OpenAiOrchestrator;
pub use trace::TraceId;

/// Result of one orchestration run.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutput {
    /// Final text produced by the model, when it produced any.
    pub final_output: Option<String>,
    /// Raw final message as returned by the model provider.
    pub raw: Value,
}

impl AgentOutput {
    /// Output carrying final text.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            raw: Value::String(text.clone()),
            final_output: Some(text),
        }
    }

    /// Final text, or the string form of the raw result when there is none.
    pub fn into_text(self) -> String {
        self.final_output.unwrap_or_else(|| self.raw.to_string())
    }
}

/// Runs a completion against the tools of a connection.
#[async_trait::async_trait]
pub trait Orchestrator: Send + Sync {
    /// Answer `prompt`, calling tools on `connection` as the model directs.
    async fn run(
        &self,
        connection: Arc<ToolServerConnection>,
        prompt: &str,
        trace: &TraceId,
    ) -> Result<AgentOutput, OrchestrationError>;
}
