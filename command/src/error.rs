//! Error types for command parsing.
//!
//! Parsing itself never fails (unmatched input falls back to a RAG query);
//! these errors only surface from the rule-table invariant check at
//! construction time.

use thiserror::Error;

/// Result type alias for command operations.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Errors that can occur while building the parser.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Two rules share a name.
    #[error("duplicate rule name: {0}")]
    DuplicateRuleName(String),

    /// Rule priorities are not strictly increasing.
    #[error("rule {name} at priority {priority} does not follow {previous}")]
    PriorityOrder {
        name: String,
        priority: u8,
        previous: u8,
    },
}
