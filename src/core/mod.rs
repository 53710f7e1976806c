//! Core module containing shared infrastructure components.
//!
//! Configuration, error handling, the shared execution context and the HTTP
//! transport layer.

pub mod config;
pub mod error;
pub mod executor;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use executor::{ExecutionContext, ExecutionError};
pub use transport::{AppState, HttpConfig, HttpTransport};
