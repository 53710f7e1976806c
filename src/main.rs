//! Bridge entry point.
//!
//! Loads configuration, starts the execution context, warms up the tool
//! server connection and serves HTTP until interrupted.

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use ttrpg_agent_bridge::Result;
use ttrpg_agent_bridge::core::{AppState, Config, ExecutionContext, HttpTransport};
use ttrpg_agent_bridge::domains::orchestrator::OpenAiOrchestrator;
use ttrpg_agent_bridge::domains::requests::RequestHandler;
use ttrpg_agent_bridge::domains::session::SessionRegistry;

fn main() -> Result<()> {
    init_logging();

    let config = Config::from_env();

    info!("Starting {} v{}", config.server.name, config.server.version);
    info!(
        "Tool server '{}': {}",
        config.tool_server.name,
        config.tool_server.launch.display()
    );

    let context = Arc::new(ExecutionContext::start("tool-session")?);
    info!("Tool server calls run on '{}'", context.name());
    let registry = Arc::new(SessionRegistry::new(
        config.tool_server.name.clone(),
        config.tool_server.launch.clone(),
    ));

    let warm = registry.clone();
    match context.run_blocking(async move { warm.get_or_init_connection().await }) {
        Ok(conn) if conn.is_ready() => info!("{} tool server ready", registry.name()),
        Ok(conn) => warn!(
            "{} tool server not ready ({}); will retry on the next request",
            registry.name(),
            conn.failure().unwrap_or_else(|| conn.state().to_string())
        ),
        Err(e) => error!("Tool server warm-up did not run: {}", e),
    }

    let orchestrator = Arc::new(OpenAiOrchestrator::new(config.orchestrator.clone()));
    let handler = RequestHandler::new(context.clone(), registry.clone(), orchestrator);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let served = runtime.block_on(
        HttpTransport::new(config.http.clone()).run(AppState::new(handler), shutdown_signal()),
    );
    runtime.shutdown_background();

    info!("Shutting down");
    let closing = registry.clone();
    if let Err(e) = context.run_blocking(async move { closing.shutdown().await }) {
        warn!("Tool server shutdown did not run: {}", e);
    }
    match Arc::try_unwrap(context) {
        Ok(context) => context.shutdown(),
        Err(_) => warn!("Execution context still referenced at exit"),
    }

    served?;
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize the logging subsystem from `RUST_LOG`, defaulting to `info`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
