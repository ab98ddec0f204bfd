//! Error types for tool execution.

use thiserror::Error;

/// Result type alias for tool operations.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors that can occur while executing tools.
///
/// The executor folds all of these into structured
/// [`ToolInvocationResult`](crate::ToolInvocationResult)s; they never
/// propagate past the dispatch boundary.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The command's arguments are not usable by the handler.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No tool or application with the given name.
    #[error("not found: {0}")]
    NotFound(String),

    /// A subprocess exited nonzero or produced unusable output.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// An external backend could not be reached.
    #[error("{0}")]
    BackendUnreachable(String),

    /// A blocking external call exceeded its budget.
    #[error("operation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Delegated RAG answering failed.
    #[error("answer generation failed: {0}")]
    Rag(String),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
