//! Process-wide holder of the current tool-server connection.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::domains::toolserver::{LaunchSpec, ToolServerConnection};

/// Holds the single shared [`ToolServerConnection`].
///
/// [`get_or_init_connection`](Self::get_or_init_connection) is the only place
/// the slot is replaced, and it must run on the execution context. The slot
/// lock is held across the whole connect attempt, so concurrent callers wait
/// for one in-flight attempt instead of spawning their own subprocess.
pub struct SessionRegistry {
    name: String,
    launch: LaunchSpec,
    slot: Mutex<Option<Arc<ToolServerConnection>>>,
    /// Read-side snapshot of `slot` for callers outside the context.
    current: RwLock<Option<Arc<ToolServerConnection>>>,
    attempts: AtomicU64,
    /// Number of attempts whose outcome has been stored in `slot`.
    settled: AtomicU64,
}

impl SessionRegistry {
    /// Create an empty registry that will launch `launch` on demand.
    pub fn new(name: impl Into<String>, launch: LaunchSpec) -> Self {
        Self {
            name: name.into(),
            launch,
            slot: Mutex::new(None),
            current: RwLock::new(None),
            attempts: AtomicU64::new(0),
            settled: AtomicU64::new(0),
        }
    }

    /// Declared name of the managed tool server.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of connect attempts (one subprocess spawn each) made so far.
    pub fn connect_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Whether the registry currently holds a `Ready` connection.
    pub fn is_ready(&self) -> bool {
        self.current
            .read()
            .as_ref()
            .is_some_and(|conn| conn.is_ready())
    }

    /// The connection currently held, in whatever state it is.
    pub fn current(&self) -> Option<Arc<ToolServerConnection>> {
        self.current.read().clone()
    }

    /// Return the current connection, connecting first if needed.
    ///
    /// A `Ready` connection is returned as is. When the slot is empty, or holds
    /// a connection that is no longer ready, a fresh connect is attempted and
    /// its result stored even if it failed. Callers that were already waiting
    /// while that attempt ran observe its outcome rather than starting another.
    pub async fn get_or_init_connection(&self) -> Arc<ToolServerConnection> {
        let observed = self.settled.load(Ordering::SeqCst);
        let mut slot = self.slot.lock().await;

        if let Some(conn) = slot.as_ref() {
            if conn.is_ready() || self.settled.load(Ordering::SeqCst) != observed {
                return conn.clone();
            }
            warn!(
                "Tool server '{}' is {}; reconnecting",
                self.name,
                conn.state()
            );
        }

        if let Some(stale) = slot.take() {
            stale.close().await;
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Initializing {} tool server (attempt {})...", self.name, attempt);

        let conn = Arc::new(ToolServerConnection::new(
            self.name.clone(),
            self.launch.clone(),
        ));

        match conn.connect().await {
            Ok(()) => match conn.list_tools().await {
                Ok(tools) => {
                    info!("{} tool server tools:", self.name);
                    for tool in &tools {
                        info!(" - {}: {}", tool.name, tool.description.as_deref().unwrap_or(""));
                    }
                    info!("{} tool server initialized successfully", self.name);
                }
                Err(e) => warn!("{} tool server connected but listing tools failed: {}", self.name, e),
            },
            Err(e) => error!("Error initializing {} tool server: {}", self.name, e),
        }

        *slot = Some(conn.clone());
        *self.current.write() = Some(conn.clone());
        self.settled.fetch_add(1, Ordering::SeqCst);
        conn
    }

    /// Close the held connection and empty the slot. Must run on the
    /// execution context.
    pub async fn shutdown(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(conn) = slot.take() {
            conn.close().await;
        }
        self.current.write().take();
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("name", &self.name)
            .field("launch", &self.launch.display())
            .field("ready", &self.is_ready())
            .field("attempts", &self.connect_attempts())
            .finish()
    }
}
