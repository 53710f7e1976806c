//! Subprocess-backed connection to an MCP tool server.
//!
//! One [`ToolServerConnection`] owns exactly one child process. The rmcp
//! client service speaks MCP over the child's stdio; this type layers the
//! connection lifecycle and the error taxonomy on top of it.
//!
//! ```text
//! Uninitialized --connect()--> Connecting --handshake ok--> Ready
//!                                   |                         |
//!                                   +--error--> Failed <--eof-+
//!                          close() from any state --> Closed
//! ```

use parking_lot::{Mutex, RwLock};
use rmcp::{
    Peer, RoleClient, ServiceError, ServiceExt,
    model::{
        CallToolRequestParam, ClientCapabilities, ClientInfo, Implementation, JsonObject,
        ProtocolVersion, Tool,
    },
    service::{ClientInitializeError, RunningService},
    transport::TokioChildProcess,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument, warn};

use super::error::{ToolServerError, ToolServerResult};
use super::launch::LaunchSpec;

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Uninitialized,
    Connecting,
    Ready,
    Closed,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A capability advertised by the tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Value,
}

impl From<Tool> for ToolDescriptor {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.into_owned(),
            description: tool.description.map(|d| d.into_owned()),
            input_schema: Value::Object((*tool.input_schema).clone()),
        }
    }
}

/// Successful result of a tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Concatenated text content.
    pub text: String,
    /// Structured content, when the tool provides it.
    pub structured: Option<Value>,
}

type Client = RunningService<RoleClient, ClientInfo>;

const STREAM_CLOSED: &str = "tool server closed its output stream";

/// Identity sent to the server in the handshake.
fn client_info() -> ClientInfo {
    ClientInfo {
        protocol_version: ProtocolVersion::V_2024_11_05,
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Implementation::from_build_env()
        },
    }
}

fn handshake_error(error: ClientInitializeError) -> ToolServerError {
    match error {
        ClientInitializeError::ConnectionClosed(context) => ToolServerError::connection(format!(
            "tool server exited before ready (waiting for {context})"
        )),
        ClientInitializeError::ExpectedInitResponse(_)
        | ClientInitializeError::ExpectedInitResult(_)
        | ClientInitializeError::ConflictInitResponseId(..) => {
            ToolServerError::connection(format!("malformed handshake response: {error}"))
        }
        other => ToolServerError::connection(format!("handshake failed: {other}")),
    }
}

/// Connection to one tool-server subprocess.
pub struct ToolServerConnection {
    name: String,
    launch: LaunchSpec,
    state: RwLock<ConnectionState>,
    failure: Mutex<Option<String>>,
    /// The running client; taken by [`close`](Self::close).
    client: AsyncMutex<Option<Client>>,
    peer: RwLock<Option<Peer<RoleClient>>>,
    /// Serializes request/response exchanges on this channel.
    call_lock: AsyncMutex<()>,
    tools: RwLock<Vec<ToolDescriptor>>,
    server_info: RwLock<Option<Implementation>>,
}

impl ToolServerConnection {
    /// Create an `Uninitialized` connection. Nothing is spawned until [`connect`](Self::connect).
    pub fn new(name: impl Into<String>, launch: LaunchSpec) -> Self {
        Self {
            name: name.into(),
            launch,
            state: RwLock::new(ConnectionState::Uninitialized),
            failure: Mutex::new(None),
            client: AsyncMutex::new(None),
            peer: RwLock::new(None),
            call_lock: AsyncMutex::new(()),
            tools: RwLock::new(Vec::new()),
            server_info: RwLock::new(None),
        }
    }

    /// Current state. A `Ready` connection whose service has stopped is
    /// reported, and recorded, as `Failed`.
    pub fn state(&self) -> ConnectionState {
        let state = *self.state.read();
        if state == ConnectionState::Ready
            && self
                .peer
                .read()
                .as_ref()
                .is_some_and(|peer| peer.is_transport_closed())
        {
            self.fail(STREAM_CLOSED);
            return *self.state.read();
        }
        state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Reason the connection failed, if it did.
    pub fn failure(&self) -> Option<String> {
        self.failure.lock().clone()
    }

    /// Tools from the last successful [`list_tools`](Self::list_tools).
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.tools.read().clone()
    }

    /// Identity reported by the server during the handshake.
    pub fn server_name(&self) -> Option<String> {
        self.server_info.read().as_ref().map(|s| s.name.clone())
    }

    fn record_failure(&self, reason: impl Into<String>) {
        let mut failure = self.failure.lock();
        if failure.is_none() {
            *failure = Some(reason.into());
        }
    }

    /// The channel broke. `Closed` stays `Closed`; anything else becomes `Failed`.
    fn fail(&self, reason: impl Into<String>) {
        {
            let mut state = self.state.write();
            if *state != ConnectionState::Closed {
                *state = ConnectionState::Failed;
            }
        }
        self.record_failure(reason);
    }

    /// Spawn the subprocess and perform the initialization handshake.
    #[instrument(skip(self), fields(server = %self.name))]
    pub async fn connect(&self) -> ToolServerResult<()> {
        {
            let mut state = self.state.write();
            if *state != ConnectionState::Uninitialized {
                return Err(ToolServerError::protocol(format!(
                    "connect called on a {} connection",
                    *state
                )));
            }
            *state = ConnectionState::Connecting;
        }

        info!("Launching tool server: {}", self.launch.display());

        let client = match self.establish().await {
            Ok(client) => client,
            Err(e) => {
                self.fail(e.to_string());
                return Err(e);
            }
        };

        let identity = client
            .peer_info()
            .map(|init| (init.server_info.clone(), init.protocol_version.to_string()));

        // Held until the client is stored, so a concurrent close() finds it.
        let mut slot = self.client.lock().await;
        *self.server_info.write() = identity.as_ref().map(|(server, _)| server.clone());
        *self.peer.write() = Some(client.peer().clone());
        let promoted = {
            let mut state = self.state.write();
            if *state == ConnectionState::Connecting {
                *state = ConnectionState::Ready;
                true
            } else {
                false
            }
        };
        if !promoted {
            self.peer.write().take();
            self.server_info.write().take();
            drop(slot);
            let state = self.state();
            let reason = self
                .failure()
                .unwrap_or_else(|| format!("connection became {state} during handshake"));
            shut_down(client).await;
            return Err(ToolServerError::connection(reason));
        }
        *slot = Some(client);
        drop(slot);

        match &identity {
            Some((server, protocol)) => info!(
                "Tool server '{}' ready ({} {}, protocol {})",
                self.name, server.name, server.version, protocol
            ),
            None => info!("Tool server '{}' ready", self.name),
        }
        Ok(())
    }

    async fn establish(&self) -> ToolServerResult<Client> {
        let (transport, _stderr) = TokioChildProcess::builder(self.launch.command())
            .spawn()
            .map_err(|e| {
                ToolServerError::connection(format!(
                    "failed to spawn '{}': {e}",
                    self.launch.display()
                ))
            })?;

        if let Some(pid) = transport.id() {
            debug!(pid, "Tool server process spawned");
        }

        client_info().serve(transport).await.map_err(handshake_error)
    }

    fn ready_peer(&self, operation: &str) -> ToolServerResult<Peer<RoleClient>> {
        let state = self.state();
        if state != ConnectionState::Ready {
            return Err(ToolServerError::not_ready(operation, state));
        }
        self.peer
            .read()
            .clone()
            .ok_or_else(|| ToolServerError::not_ready(operation, state))
    }

    /// A failed exchange. Anything but an error reply means the channel is gone.
    fn exchange_failed(
        &self,
        error: ServiceError,
        on_reply: impl FnOnce(String) -> ToolServerError,
    ) -> ToolServerError {
        match error {
            ServiceError::McpError(e) => on_reply(e.message.into_owned()),
            ServiceError::UnexpectedResponse => {
                ToolServerError::protocol("unexpected response type from tool server")
            }
            other => {
                let reason = match other {
                    ServiceError::TransportClosed => STREAM_CLOSED.to_string(),
                    other => other.to_string(),
                };
                if self.state() != ConnectionState::Closed {
                    self.fail(reason.clone());
                }
                match self.state() {
                    ConnectionState::Closed => ToolServerError::transport("connection closed"),
                    _ => ToolServerError::transport(reason),
                }
            }
        }
    }

    /// Fetch the server's tool list. Only valid in `Ready`.
    ///
    /// Follows pagination cursors; the cached list is replaced only when every
    /// page was read.
    #[instrument(skip(self), fields(server = %self.name))]
    pub async fn list_tools(&self) -> ToolServerResult<Vec<ToolDescriptor>> {
        let state = self.state();
        if state != ConnectionState::Ready {
            return Err(ToolServerError::protocol(format!(
                "cannot list tools: connection is {state}"
            )));
        }
        let peer = self.ready_peer("list tools")?;

        let listed = {
            let _exchange = self.call_lock.lock().await;
            peer.list_all_tools().await
        };
        let tools: Vec<ToolDescriptor> = listed
            .map_err(|e| {
                self.exchange_failed(e, |message| {
                    ToolServerError::protocol(format!("tools/list rejected: {message}"))
                })
            })?
            .into_iter()
            .map(ToolDescriptor::from)
            .collect();

        *self.tools.write() = tools.clone();
        Ok(tools)
    }

    /// Call a tool by name. Only valid in `Ready`.
    #[instrument(skip(self, arguments), fields(server = %self.name))]
    pub async fn invoke(&self, tool: &str, arguments: Value) -> ToolServerResult<ToolOutput> {
        let peer = self.ready_peer("invoke")?;

        let arguments: JsonObject = match arguments {
            Value::Null => JsonObject::new(),
            Value::Object(map) => map,
            other => {
                return Err(ToolServerError::invocation(
                    tool,
                    format!("arguments must be a JSON object, got {other}"),
                ));
            }
        };

        debug!("Invoking tool {}", tool);

        let called = {
            let _exchange = self.call_lock.lock().await;
            peer.call_tool(CallToolRequestParam {
                name: tool.to_string().into(),
                arguments: Some(arguments),
            })
            .await
        };
        let result = called.map_err(|e| {
            self.exchange_failed(e, |message| ToolServerError::invocation(tool, message))
        })?;

        let text = result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.as_str()))
            .collect::<Vec<_>>()
            .join("\n");

        if result.is_error.unwrap_or(false) {
            return Err(ToolServerError::invocation(tool, text));
        }

        Ok(ToolOutput {
            text,
            structured: result.structured_content,
        })
    }

    /// Terminate the subprocess and release the channel. Idempotent.
    #[instrument(skip(self), fields(server = %self.name))]
    pub async fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.write(), ConnectionState::Closed);
        if previous == ConnectionState::Closed {
            return;
        }

        self.peer.write().take();
        if let Some(client) = self.client.lock().await.take() {
            shut_down(client).await;
        }
        info!("Tool server '{}' closed (was {})", self.name, previous);
    }
}

/// Cancel the client service. Its transport shuts the child down.
async fn shut_down(client: Client) {
    match client.cancel().await {
        Ok(reason) => debug!(?reason, "Tool server client stopped"),
        Err(e) => warn!("Tool server client task failed: {}", e),
    }
}

impl fmt::Debug for ToolServerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolServerConnection")
            .field("name", &self.name)
            .field("launch", &self.launch.display())
            .field("state", &*self.state.read())
            .field("tools", &self.tools.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::sync::Arc;

    fn missing_binary() -> LaunchSpec {
        LaunchSpec::new("ttrpg-definitely-not-installed", ["--stdio"])
    }

    #[test]
    fn test_descriptor_from_rmcp_tool() {
        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        let tool = Tool {
            name: Cow::Borrowed("ttrpgmcp_list_campaign_logs"),
            title: None,
            description: Some(Cow::Borrowed("List logs")),
            input_schema: Arc::new(schema),
            output_schema: None,
            annotations: None,
            icons: None,
            meta: None,
        };

        let descriptor = ToolDescriptor::from(tool);
        assert_eq!(descriptor.name, "ttrpgmcp_list_campaign_logs");
        assert_eq!(descriptor.description.as_deref(), Some("List logs"));
        assert_eq!(descriptor.input_schema["type"], "object");
    }

    #[test]
    fn test_client_identifies_as_bridge() {
        let info = client_info();
        assert_eq!(info.client_info.name, env!("CARGO_PKG_NAME"));
        assert_eq!(info.protocol_version, ProtocolVersion::V_2024_11_05);
    }

    #[tokio::test]
    async fn test_new_connection_is_uninitialized() {
        let conn = ToolServerConnection::new("TTRPG", missing_binary());
        assert_eq!(conn.state(), ConnectionState::Uninitialized);
        assert!(conn.tools().is_empty());
        assert!(conn.failure().is_none());
    }

    #[tokio::test]
    async fn test_list_tools_before_ready_is_protocol_error() {
        let conn = ToolServerConnection::new("TTRPG", missing_binary());
        let err = conn.list_tools().await.unwrap_err();
        assert!(matches!(err, ToolServerError::Protocol(_)), "{err:?}");
        assert!(conn.tools().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_before_ready_is_protocol_error() {
        let conn = ToolServerConnection::new("TTRPG", missing_binary());
        let err = conn.invoke("anything", Value::Null).await.unwrap_err();
        assert!(matches!(err, ToolServerError::Protocol(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_spawn_failure_marks_failed() {
        let conn = ToolServerConnection::new("TTRPG", missing_binary());
        let err = conn.connect().await.unwrap_err();

        assert!(matches!(err, ToolServerError::Connection(_)), "{err:?}");
        assert!(err.to_string().contains("ttrpg-definitely-not-installed"));
        assert_eq!(conn.state(), ConnectionState::Failed);
        assert!(conn.failure().is_some());

        // list_tools stays a protocol error even after failure
        let err = conn.list_tools().await.unwrap_err();
        assert!(matches!(err, ToolServerError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_connect_twice_is_rejected() {
        let conn = ToolServerConnection::new("TTRPG", missing_binary());
        let _ = conn.connect().await;
        let err = conn.connect().await.unwrap_err();
        assert!(matches!(err, ToolServerError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_invoke_fails_fast() {
        let conn = ToolServerConnection::new("TTRPG", missing_binary());
        conn.close().await;
        conn.close().await;
        assert_eq!(conn.state(), ConnectionState::Closed);

        let err = conn.invoke("anything", Value::Null).await.unwrap_err();
        assert!(err.is_transport(), "{err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_before_ready_is_connection_error() {
        let conn = ToolServerConnection::new("TTRPG", LaunchSpec::new("sh", ["-c", "exit 3"]));
        let err = conn.connect().await.unwrap_err();
        assert!(matches!(err, ToolServerError::Connection(_)), "{err:?}");
        assert_eq!(conn.state(), ConnectionState::Failed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_malformed_handshake_is_connection_error() {
        // Answers the initialize request with an empty result
        let script = r#"read line; echo '{"jsonrpc":"2.0","id":0,"result":{}}'; sleep 5"#;
        let conn = ToolServerConnection::new("TTRPG", LaunchSpec::new("sh", ["-c", script]));
        let err = conn.connect().await.unwrap_err();
        assert!(matches!(err, ToolServerError::Connection(_)), "{err:?}");
        assert_eq!(conn.state(), ConnectionState::Failed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_close_during_handshake_stops_new_client() {
        // Answers the initialize request after a delay
        let script = r#"read line; sleep 1; echo '{"jsonrpc":"2.0","id":0,"result":{"protocolVersion":"2024-11-05","capabilities":{"tools":{}},"serverInfo":{"name":"slow","version":"0.0.0"}}}'; cat > /dev/null"#;
        let conn = Arc::new(ToolServerConnection::new(
            "TTRPG",
            LaunchSpec::new("sh", ["-c", script]),
        ));

        let connecting = {
            let conn = conn.clone();
            tokio::spawn(async move { conn.connect().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert_eq!(conn.state(), ConnectionState::Connecting);
        conn.close().await;

        let err = connecting.await.unwrap().unwrap_err();
        assert!(matches!(err, ToolServerError::Connection(_)), "{err:?}");
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(conn.server_name().is_none());

        let err = conn.invoke("anything", Value::Null).await.unwrap_err();
        assert!(err.is_transport(), "{err:?}");
    }
}
