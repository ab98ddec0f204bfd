//! Error types for the embeddings crate.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur while generating or comparing embeddings.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// No embedding backend configured.
    #[error("embedding provider not configured")]
    ProviderNotConfigured,

    /// The backend returned a non-success status.
    #[error("embedding API request failed: {0}")]
    ApiRequest(String),

    /// The backend response could not be interpreted.
    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    /// Vector lengths disagree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
