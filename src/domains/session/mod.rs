//! Session domain.
//!
//! Holds the one long-lived tool-server connection shared by every request.

mod registry;

pub use registry::SessionRegistry;
