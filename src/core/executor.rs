//! The process-wide cooperative execution context.
//!
//! All suspendable work (subprocess spawn, stdio traffic, orchestration) runs
//! on one single-threaded tokio runtime owned by a dedicated thread. Request
//! threads enter it through [`ExecutionContext::run_blocking`], which submits
//! a future and parks the caller until the future resolves.

use futures::future::BoxFuture;
use std::future::Future;
use std::thread::{self, JoinHandle, ThreadId};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Errors from submitting work to the execution context.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The context has been shut down.
    #[error("execution context is stopped")]
    Stopped,

    /// The task was dropped before producing a result (it panicked or the
    /// runtime shut down underneath it).
    #[error("task aborted before completion")]
    TaskAborted,

    /// `run_blocking` was called from the context's own thread.
    #[error("run_blocking called from inside the execution context")]
    Reentrant,

    /// The runtime could not be built.
    #[error("failed to start execution context: {0}")]
    Runtime(#[from] std::io::Error),
}

type Job = BoxFuture<'static, ()>;

/// Handle to the single shared execution context.
pub struct ExecutionContext {
    name: String,
    jobs: Option<mpsc::UnboundedSender<Job>>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl ExecutionContext {
    /// Build the runtime and start the context thread.
    pub fn start(name: impl Into<String>) -> Result<Self, ExecutionError> {
        let name = name.into();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        let thread_name = name.clone();

        let worker = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                runtime.block_on(async move {
                    while let Some(job) = queue.recv().await {
                        tokio::spawn(job);
                    }
                });
                debug!(context = %thread_name, "Execution context drained");
            })?;

        let worker_id = worker.thread().id();
        info!(context = %name, "Execution context started");

        Ok(Self {
            name,
            jobs: Some(jobs),
            worker: Some(worker),
            worker_id,
        })
    }

    /// Name of the context thread.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `task` on the context and block the calling thread until it
    /// completes.
    ///
    /// Must not be called from inside the context itself.
    pub fn run_blocking<F, T>(&self, task: F) -> Result<T, ExecutionError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if thread::current().id() == self.worker_id {
            return Err(ExecutionError::Reentrant);
        }

        let jobs = self.jobs.as_ref().ok_or(ExecutionError::Stopped)?;
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let _ = tx.send(task.await);
        });

        jobs.send(job).map_err(|_| ExecutionError::Stopped)?;
        rx.blocking_recv().map_err(|_| ExecutionError::TaskAborted)
    }

    /// Stop accepting work and join the context thread.
    ///
    /// Tasks still in flight are dropped with the runtime.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.jobs.take();
        if thread::current().id() == self.worker_id {
            // Dropped on its own thread; the loop exits once the queue closes.
            self.worker.take();
            return;
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!(context = %self.name, "Execution context thread panicked");
            } else {
                info!(context = %self.name, "Execution context stopped");
            }
        }
    }
}

impl Drop for ExecutionContext {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("name", &self.name)
            .field("running", &self.jobs.is_some())
            .finish()
    }
}
