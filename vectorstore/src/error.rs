//! Error types for the vector store.

use thiserror::Error;

/// Result type alias for vector store operations.
pub type Result<T> = std::result::Result<T, VectorStoreError>;

/// Errors that can occur in the vector store.
#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// Vector length disagrees with the collection's fixed dimension.
    #[error("dimension mismatch: collection expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// No collection with the given name.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// A collection with the given name already exists at another dimension.
    #[error("collection {name} already exists with dimension {existing}, requested {requested}")]
    CollectionDimensionConflict {
        name: String,
        existing: usize,
        requested: usize,
    },

    /// Similarity computation failed.
    #[error("similarity error: {0}")]
    Similarity(#[from] roxy_embeddings::EmbeddingError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
