//! End-to-end tests against the `ttrpg-tools` stdio server.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request as MockRequest, Respond, ResponseTemplate};

use ttrpg_agent_bridge::core::config::OrchestratorConfig;
use ttrpg_agent_bridge::core::{AppState, ExecutionContext, HttpConfig, HttpTransport};
use ttrpg_agent_bridge::domains::orchestrator::{
    AgentOutput, OpenAiOrchestrator, OrchestrationError, Orchestrator, TraceId,
};
use ttrpg_agent_bridge::domains::requests::RequestHandler;
use ttrpg_agent_bridge::domains::session::SessionRegistry;
use ttrpg_agent_bridge::domains::toolserver::{
    ConnectionState, LaunchSpec, ToolServerConnection, ToolServerError,
};

fn tool_server() -> LaunchSpec {
    LaunchSpec::new(env!("CARGO_BIN_EXE_ttrpg-tools"), Vec::<String>::new())
        .with_env("RUST_LOG", "warn")
}

async fn ready_connection() -> ToolServerConnection {
    let conn = ToolServerConnection::new("TTRPG", tool_server());
    assert_ok!(conn.connect().await);
    conn
}

/// Answers with the names of the tools it was offered, without calling any.
struct ListOfferedTools;

#[async_trait::async_trait]
impl Orchestrator for ListOfferedTools {
    async fn run(
        &self,
        connection: Arc<ToolServerConnection>,
        prompt: &str,
        _trace: &TraceId,
    ) -> Result<AgentOutput, OrchestrationError> {
        let names: Vec<_> = connection.tools().into_iter().map(|t| t.name).collect();
        Ok(AgentOutput::text(format!("[{prompt}] {}", names.join(","))))
    }
}

fn handler_with(orchestrator: Arc<dyn Orchestrator>) -> RequestHandler {
    let context = Arc::new(ExecutionContext::start("bridge-test").unwrap());
    let registry = Arc::new(SessionRegistry::new("TTRPG", tool_server()));
    RequestHandler::new(context, registry, orchestrator)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_handshake_reaches_ready() {
    let conn = ready_connection().await;
    assert_eq!(conn.state(), ConnectionState::Ready);
    assert_eq!(conn.server_name().as_deref(), Some("TTRPG"));
    conn.close().await;
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_list_tools_reports_campaign_tools() {
    let conn = ready_connection().await;
    let tools = conn.list_tools().await.unwrap();

    let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
    assert!(names.contains(&"ttrpgmcp_create_campaign_log"));
    assert!(names.contains(&"ttrpgmcp_get_last_campaign_log"));
    assert!(names.contains(&"ttrpgmcp_list_campaign_logs"));
    assert_eq!(conn.tools(), tools);
    conn.close().await;
}

#[tokio::test]
async fn test_invoke_create_then_get_last() {
    let conn = ready_connection().await;

    let created = conn
        .invoke(
            "ttrpgmcp_create_campaign_log",
            json!({"title": "Session 7", "content": "The lich fled north.", "date": "2024-05-04"}),
        )
        .await
        .unwrap();
    assert!(created.text.contains("Session 7"));

    let last = conn
        .invoke("ttrpgmcp_get_last_campaign_log", Value::Null)
        .await
        .unwrap();
    assert!(last.text.contains("The lich fled north."));
    assert_eq!(last.structured.unwrap()["date"], "2024-05-04");
    conn.close().await;
}

#[tokio::test]
async fn test_tool_reported_failure_is_invocation_error() {
    let conn = ready_connection().await;
    let err = conn
        .invoke("ttrpgmcp_get_last_campaign_log", json!({}))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, ToolServerError::Invocation { tool, .. } if tool == "ttrpgmcp_get_last_campaign_log"),
        "{err:?}"
    );

    // The connection stays usable after a failed call
    assert_eq!(conn.state(), ConnectionState::Ready);
    assert_ok!(conn.invoke("ttrpgmcp_list_campaign_logs", json!({})).await);
    conn.close().await;
}

#[tokio::test]
async fn test_unknown_tool_is_invocation_error() {
    let conn = ready_connection().await;
    let err = conn.invoke("ttrpgmcp_roll_dice", json!({})).await.unwrap_err();
    assert!(matches!(err, ToolServerError::Invocation { .. }), "{err:?}");
    conn.close().await;
}

#[tokio::test]
async fn test_invoke_after_close_is_transport_error() {
    let conn = ready_connection().await;
    conn.close().await;
    let err = conn
        .invoke("ttrpgmcp_list_campaign_logs", json!({}))
        .await
        .unwrap_err();
    assert!(err.is_transport(), "{err:?}");
    assert_err!(conn.list_tools().await);
}

#[tokio::test]
async fn test_launch_with_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let conn = ToolServerConnection::new("TTRPG", tool_server().with_cwd(dir.path()));
    assert_ok!(conn.connect().await);
    assert!(conn.is_ready());
    conn.close().await;
}

#[test]
fn test_concurrent_requests_spawn_one_server() {
    let handler = handler_with(Arc::new(ListOfferedTools));

    let threads: Vec<_> = (0..6)
        .map(|n| {
            let handler = handler.clone();
            std::thread::spawn(move || handler.handle(&format!("q{n}")))
        })
        .collect();

    for thread in threads {
        let response = thread.join().unwrap().unwrap();
        assert!(response.contains("ttrpgmcp_get_last_campaign_log"), "{response}");
    }
    assert_eq!(handler.registry().connect_attempts(), 1);
    assert!(handler.registry().is_ready());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_http_health_and_empty_question() {
    let handler = handler_with(Arc::new(ListOfferedTools));
    let router = HttpTransport::new(HttpConfig::default()).router(AppState::new(handler));

    let before = router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(before).await["servers"]["ttrpg"], false);

    let response = router
        .clone()
        .oneshot(
            Request::post("/process_sync")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"question": ""}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["response"].as_str().unwrap().starts_with("[] "));

    let after = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let health = body_json(after).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["servers"]["ttrpg"], true);
}

/// First asks for a tool call, then answers with the tool's output.
struct ToolThenAnswer;

impl Respond for ToolThenAnswer {
    fn respond(&self, request: &MockRequest) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let messages = body["messages"].as_array().unwrap();

        match messages.iter().rev().find(|m| m["role"] == "tool") {
            None => ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "ttrpgmcp_create_campaign_log",
                            "arguments": "{\"title\":\"Session 3\",\"content\":\"Goblins ambushed the caravan.\"}"
                        }
                    }]
                }}]
            })),
            Some(tool) => ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "role": "assistant",
                    "content": format!("Logged. {}", tool["content"].as_str().unwrap_or(""))
                }}]
            })),
        }
    }
}

#[test]
fn test_openai_loop_calls_real_tool_server() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mock = runtime.block_on(async {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ToolThenAnswer)
            .expect(2)
            .mount(&server)
            .await;
        server
    });

    let orchestrator = OpenAiOrchestrator::new(OrchestratorConfig {
        base_url: mock.uri(),
        api_key: Some("sk-test".to_string()),
        ..OrchestratorConfig::default()
    });
    let handler = handler_with(Arc::new(orchestrator));

    let response = handler.handle("Log what happened tonight").unwrap();
    assert!(response.starts_with("Logged."), "{response}");
    assert!(response.contains("Session 3"), "{response}");

    let offered: Vec<Value> = runtime.block_on(mock.received_requests()).unwrap()[0]
        .body_json::<Value>()
        .map(|body| body["tools"].as_array().cloned().unwrap_or_default())
        .unwrap();
    assert_eq!(offered.len(), 3);
}
