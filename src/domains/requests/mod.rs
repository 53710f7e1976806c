//! Requests domain.
//!
//! The synchronous boundary between inbound requests and the execution
//! context, plus the mapping of every failure to a well-formed reply.

mod error;
mod handler;

pub use error::{APOLOGY, Failure, RequestError};
pub use handler::{RequestHandler, RequestPhase, parse_question};
