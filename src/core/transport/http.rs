//! HTTP transport implementation.
//!
//! `GET /health` reports whether the tool server is connected;
//! `POST /process_sync` answers a question. Every outcome is a JSON body with
//! status 200 or 500.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

use super::{HttpConfig, TransportError, TransportResult};
use crate::domains::requests::{APOLOGY, Failure, RequestHandler, parse_question};

/// Key of the tool server in the `/health` `servers` map.
const HEALTH_SERVER_KEY: &str = "ttrpg";

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    handler: RequestHandler,
}

impl AppState {
    pub fn new(handler: RequestHandler) -> Self {
        Self { handler }
    }
}

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Build the router for `state`.
    pub fn router(&self, state: AppState) -> Router {
        let mut app = Router::new()
            .route("/health", get(health_check))
            .route("/process_sync", post(process_sync))
            .route("/", get(root_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        app
    }

    /// Serve until `shutdown` resolves.
    pub async fn run<S>(self, state: AppState, shutdown: S) -> TransportResult<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.address();
        let app = self.router(state);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        info!("Ready - listening on {}", self.config.description());
        info!("  → Question: POST /process_sync");
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        Ok(())
    }
}

/// Root handler - provides API info.
async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "transport": "HTTP",
        "endpoints": {
            "process": "/process_sync",
            "health": "/health"
        }
    }))
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.handler.registry();
    let mut servers = serde_json::Map::new();
    servers.insert(HEALTH_SERVER_KEY.to_string(), json!(registry.is_ready()));

    let now = chrono::Utc::now();
    let timestamp = now.timestamp_micros() as f64 / 1_000_000.0;

    Json(json!({
        "status": "healthy",
        "timestamp": timestamp,
        "servers": servers
    }))
}

/// Answer a question synchronously.
#[instrument(skip_all)]
async fn process_sync(State(state): State<AppState>, body: Bytes) -> Response {
    let handler = state.handler.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let question = parse_question(&body).inspect_err(|e| {
            error!(error = ?e, "Error processing request: {}", e);
        })?;
        handler.handle(&question)
    })
    .await;

    match outcome {
        Ok(Ok(response)) => (StatusCode::OK, Json(json!({ "response": response }))).into_response(),
        Ok(Err(e)) => (StatusCode::INTERNAL_SERVER_ERROR, Json(e.to_failure())).into_response(),
        Err(e) => {
            error!("Request worker failed: {}", e);
            let failure = Failure {
                response: APOLOGY.to_string(),
                error: e.to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(failure)).into_response()
        }
    }
}
