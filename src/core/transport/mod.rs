//! Transport layer of the bridge.
//!
//! The inbound surface is plain HTTP/JSON (`GET /health`,
//! `POST /process_sync`). Handlers hand each request to the synchronous
//! [`RequestHandler`](crate::domains::requests::RequestHandler) on a
//! blocking thread so the HTTP runtime never waits on the execution context.

mod config;
mod error;
pub mod http;

pub use config::HttpConfig;
pub use error::{TransportError, TransportResult};
pub use http::{AppState, HttpTransport};
