//! Error types for the RAG engine.

use thiserror::Error;

/// Result type alias for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors that can occur while answering.
#[derive(Error, Debug)]
pub enum RagError {
    /// Embedding the query failed (recoverable; triggers keyword fallback).
    #[error("embedding error: {0}")]
    Embedding(#[from] roxy_embeddings::EmbeddingError),

    /// The knowledge store failed (recoverable; triggers keyword fallback).
    #[error("store error: {0}")]
    Store(#[from] roxy_vectorstore::VectorStoreError),

    /// The LLM backend returned a non-success status.
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    /// The LLM response could not be interpreted.
    #[error("invalid LLM response: {0}")]
    InvalidResponse(String),

    /// A collection's dimension disagrees with the active embedder.
    #[error(
        "collection {collection} has dimension {collection_dim}, embedder produces {embedder_dim}"
    )]
    CollectionDimensionMismatch {
        collection: String,
        collection_dim: usize,
        embedder_dim: usize,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
