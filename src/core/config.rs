//! Configuration management for the bridge.
//!
//! Almost everything is compiled in through [`Default`]. [`Config::from_env`]
//! loads `.env` and overlays the listen port and the model provider key. It
//! reports what it ignored through `tracing`, so logging must already be up.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::transport::HttpConfig;
use crate::domains::toolserver::LaunchSpec;

/// Environment variable selecting the HTTP listen port.
pub const PORT_ENV: &str = "AGENT_SERVICE_PORT";

/// Older name of [`PORT_ENV`], still honoured.
pub const LEGACY_PORT_ENV: &str = "PYTHON_SERVICE_PORT";

/// Environment variable holding the model provider key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const AGENT_INSTRUCTIONS: &str = "\
You are a helpful assistant for a tabletop RPG game. Use the MCP resources and tools to assist users with their questions and tasks.
If the user asks for image generation use the MCP tools for that
If the user asks for music or sound effects, use the Spotify API to find suitable tracks.";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service identification and metadata.
    pub server: ServerConfig,

    /// HTTP surface configuration.
    pub http: HttpConfig,

    /// Tool-server subprocess configuration.
    pub tool_server: ToolServerConfig,

    /// Orchestration collaborator configuration.
    pub orchestrator: OrchestratorConfig,
}

/// Service identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the service.
    pub name: String,

    /// The version of the service.
    pub version: String,
}

/// Which tool server to run and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServerConfig {
    /// Declared name of the server (reported by `/health` as `servers.ttrpg`).
    pub name: String,

    /// Launch parameters of the subprocess.
    pub launch: LaunchSpec,
}

/// Configuration of the model-directed tool-use loop.
#[derive(Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Name of the agent, sent with its instructions.
    pub agent_name: String,

    /// Workflow name attached to traces.
    pub workflow_name: String,

    /// System instructions given to the model.
    pub instructions: String,

    /// Model identifier.
    pub model: String,

    /// Base URL of the Chat Completions API.
    pub base_url: String,

    /// API key; required to run completions.
    pub api_key: Option<String>,

    /// Maximum number of model turns per request.
    pub max_turns: usize,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for OrchestratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorConfig")
            .field("agent_name", &self.agent_name)
            .field("workflow_name", &self.workflow_name)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("max_turns", &self.max_turns)
            .finish()
    }
}

impl Default for ToolServerConfig {
    fn default() -> Self {
        Self {
            name: "TTRPG".to_string(),
            launch: LaunchSpec::new("npm", ["run", "server:dev"]).with_cwd("../../mcp_server"),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_name: "TTRPG Slack Assistant".to_string(),
            workflow_name: "Slack Assistant".to_string(),
            instructions: AGENT_INSTRUCTIONS.to_string(),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            max_turns: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "ttrpg-agent-bridge".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            http: HttpConfig::default(),
            tool_server: ToolServerConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        let port = std::env::var(PORT_ENV)
            .map(|v| (PORT_ENV, v))
            .or_else(|_| std::env::var(LEGACY_PORT_ENV).map(|v| (LEGACY_PORT_ENV, v)));
        if let Ok((var, value)) = port {
            match value.trim().parse() {
                Ok(port) => config.http.port = port,
                Err(_) => warn!(
                    "Ignoring {}={:?}: not a port number, using {}",
                    var, value, config.http.port
                ),
            }
        }

        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => {
                config.orchestrator.api_key = Some(key);
                info!("Model provider key loaded from environment");
            }
            _ => warn!("{} not set - requests will fail until it is provided", API_KEY_ENV),
        }

        config
    }
}
