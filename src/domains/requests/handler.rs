//! Synchronous request entry point.
//!
//! Each inbound request moves through
//! `Received -> EnsuringConnection -> Orchestrating -> Completed | Failed`.
//! The work after `Received` runs on the execution context while the calling
//! thread blocks.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, info_span};

use super::error::RequestError;
use crate::core::executor::ExecutionContext;
use crate::domains::orchestrator::{Orchestrator, TraceId};
use crate::domains::session::SessionRegistry;

const PREVIEW_CHARS: usize = 100;

/// Phase of an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Received,
    EnsuringConnection,
    Orchestrating,
    Completed,
    Failed,
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::EnsuringConnection => "ensuring_connection",
            Self::Orchestrating => "orchestrating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Extract the question from a `/process_sync` body.
///
/// A missing or `null` question is the empty string; a non-string question
/// is used as its JSON text. The body itself must be a JSON object.
pub fn parse_question(body: &[u8]) -> Result<String, RequestError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| RequestError::bad_request(format!("body is not valid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| RequestError::bad_request("body must be a JSON object"))?;

    Ok(match object.get("question") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(question)) => question.clone(),
        Some(other) => other.to_string(),
    })
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Runs one question through the shared connection and the orchestrator.
#[derive(Clone)]
pub struct RequestHandler {
    context: Arc<ExecutionContext>,
    registry: Arc<SessionRegistry>,
    orchestrator: Arc<dyn Orchestrator>,
}

impl RequestHandler {
    pub fn new(
        context: Arc<ExecutionContext>,
        registry: Arc<SessionRegistry>,
        orchestrator: Arc<dyn Orchestrator>,
    ) -> Self {
        Self {
            context,
            registry,
            orchestrator,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Answer `question`, blocking the calling thread until done.
    ///
    /// Must be called from a thread that may block, never from async code.
    pub fn handle(&self, question: &str) -> Result<String, RequestError> {
        let span = info_span!("request", phase = %RequestPhase::Received);
        let _entered = span.enter();

        info!("Question: {}", question);

        match self.process(question.to_string()) {
            Ok(response) => {
                debug!(phase = %RequestPhase::Completed);
                info!("Generated response: {}...", preview(&response));
                Ok(response)
            }
            Err(e) => {
                error!(phase = %RequestPhase::Failed, error = ?e, "Error processing request: {}", e);
                Err(e)
            }
        }
    }

    fn process(&self, prompt: String) -> Result<String, RequestError> {
        let registry = self.registry.clone();
        let orchestrator = self.orchestrator.clone();

        self.context.run_blocking(async move {
            debug!(phase = %RequestPhase::EnsuringConnection);
            let connection = registry.get_or_init_connection().await;
            if !connection.is_ready() {
                let reason = connection
                    .failure()
                    .unwrap_or_else(|| format!("connection is {}", connection.state()));
                return Err(RequestError::connection(reason));
            }

            let trace = TraceId::generate();
            debug!(phase = %RequestPhase::Orchestrating, trace_id = %trace);
            let output = orchestrator.run(connection, &prompt, &trace).await?;
            Ok(output.into_text())
        })?
    }
}

impl fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandler")
            .field("context", &self.context)
            .field("registry", &self.registry)
            .finish()
    }
}
