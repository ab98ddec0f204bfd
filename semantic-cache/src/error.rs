//! Error types for the semantic cache.

use thiserror::Error;

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur in the semantic cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Embedding the query failed.
    #[error("embedding error: {0}")]
    Embedding(#[from] roxy_embeddings::EmbeddingError),

    /// The backing vector store failed.
    #[error("store error: {0}")]
    Store(#[from] roxy_vectorstore::VectorStoreError),

    /// A stored entry's metadata could not be interpreted.
    #[error("malformed cache entry: {0}")]
    MalformedEntry(String),
}
