//! Structured tool invocation results.

use serde::{Deserialize, Serialize};

/// Result of executing one command, returned directly in the HTTP
/// response. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    /// User-facing output text.
    pub output: String,

    /// Whether the invocation succeeded.
    pub success: bool,

    /// Readable error description if it did not.
    pub error: Option<String>,

    /// Tools that actually ran for this request, accumulated per request
    /// so concurrent requests cannot interleave their evidence lists.
    pub tools_used: Vec<String>,

    /// Document ids cited by a retrieval-backed answer.
    pub sources: Vec<String>,

    /// Wall-clock execution time in milliseconds.
    pub duration_ms: u64,
}

impl ToolInvocationResult {
    /// Create a successful result.
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
            error: None,
            tools_used: Vec::new(),
            sources: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Create a failed result with a readable error.
    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            output: error.clone(),
            success: false,
            error: Some(error),
            tools_used: Vec::new(),
            sources: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Record a tool as having run.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools_used.push(tool.into());
        self
    }

    /// Attach cited source ids.
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    /// Set the execution duration.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}
