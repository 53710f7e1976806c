//! Trace identifiers for orchestration runs.

use std::fmt;
use uuid::Uuid;

const TRACE_VIEWER: &str = "https://platform.openai.com/traces/trace?trace_id=";

/// Opaque id correlating one orchestration run with external observability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceId(String);

impl TraceId {
    /// Generate a fresh `trace_<32 hex>` id.
    pub fn generate() -> Self {
        Self(format!("trace_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Link to this trace in the provider's trace viewer.
    pub fn viewer_url(&self) -> String {
        format!("{TRACE_VIEWER}{}", self.0)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
