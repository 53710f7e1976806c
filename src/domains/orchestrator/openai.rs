//! OpenAI Chat Completions orchestrator.
//!
//! Each turn sends the conversation plus the connection's tools as
//! `function` definitions. Tool calls in the reply are executed on the
//! connection and fed back as `tool` messages; a reply without tool calls
//! ends the run.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{AgentOutput, OrchestrationError, Orchestrator, TraceId};
use crate::core::config::OrchestratorConfig;
use crate::domains::toolserver::{ToolDescriptor, ToolServerConnection};

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

/// Convert a tool descriptor into a Chat Completions function definition.
fn function_definition(tool: &ToolDescriptor) -> Value {
    let parameters = match &tool.input_schema {
        Value::Object(_) => tool.input_schema.clone(),
        _ => json!({ "type": "object", "properties": {} }),
    };
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description.clone().unwrap_or_default(),
            "parameters": parameters
        }
    })
}

/// Agent name as a message participant name, which only allows `[A-Za-z0-9_-]`.
fn participant_name(agent_name: &str) -> String {
    agent_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .take(64)
        .collect()
}

fn parse_arguments(call: &ToolCall) -> Result<Value, OrchestrationError> {
    if call.function.arguments.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(&call.function.arguments).map_err(|e| {
        OrchestrationError::malformed(format!(
            "arguments for tool '{}' are not JSON: {e}",
            call.function.name
        ))
    })
}

/// Orchestrator backed by the OpenAI Chat Completions API.
pub struct OpenAiOrchestrator {
    config: OrchestratorConfig,
    http: reqwest::Client,
}

impl OpenAiOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    async fn complete(
        &self,
        api_key: &str,
        messages: &[Value],
        functions: &[Value],
    ) -> Result<AssistantMessage, OrchestrationError> {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
        });
        if !functions.is_empty() {
            body["tools"] = Value::Array(functions.to_vec());
        }

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrchestrationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| OrchestrationError::malformed(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| OrchestrationError::malformed("completion has no choices"))
    }
}

#[async_trait::async_trait]
impl Orchestrator for OpenAiOrchestrator {
    #[instrument(skip_all, fields(trace_id = %trace, workflow = %self.config.workflow_name))]
    async fn run(
        &self,
        connection: Arc<ToolServerConnection>,
        prompt: &str,
        trace: &TraceId,
    ) -> Result<AgentOutput, OrchestrationError> {
        info!("View trace: {}", trace.viewer_url());

        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(OrchestrationError::MissingApiKey)?;

        let mut tools = connection.tools();
        if tools.is_empty() && connection.is_ready() {
            tools = connection.list_tools().await?;
        }
        let functions: Vec<Value> = tools.iter().map(function_definition).collect();

        let mut messages = vec![
            json!({
                "role": "system",
                "name": participant_name(&self.config.agent_name),
                "content": self.config.instructions,
            }),
            json!({ "role": "user", "content": prompt }),
        ];

        for turn in 1..=self.config.max_turns {
            let message = self.complete(api_key, &messages, &functions).await?;

            let calls = message.tool_calls.clone().unwrap_or_default();
            if calls.is_empty() {
                debug!(turn, "Agent produced final output");
                let raw = serde_json::to_value(&message)
                    .map_err(|e| OrchestrationError::malformed(e.to_string()))?;
                return Ok(AgentOutput {
                    final_output: message.content,
                    raw,
                });
            }

            messages.push(json!({
                "role": "assistant",
                "content": message.content,
                "tool_calls": calls,
            }));

            for call in &calls {
                let arguments = parse_arguments(call)?;
                info!(turn, tool = %call.function.name, "Agent calling tool");
                let output = connection.invoke(&call.function.name, arguments).await?;
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": output.text,
                }));
            }
        }

        Err(OrchestrationError::TurnLimit(self.config.max_turns))
    }
}
