//! Record and search result types.

use serde::{Deserialize, Serialize};

use roxy_embeddings::Embedding;

/// A stored `(vector, document, metadata)` triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique identifier within the collection.
    pub id: String,

    /// The embedding vector.
    pub vector: Embedding,

    /// The document text this vector was computed from.
    pub document: String,

    /// Associated metadata.
    pub metadata: Option<serde_json::Value>,
}

impl VectorRecord {
    /// Create a new record.
    pub fn new(id: impl Into<String>, vector: Embedding, document: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vector,
            document: document.into(),
            metadata: None,
        }
    }

    /// Attach metadata to the record.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A nearest-neighbor search match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMatch {
    /// ID of the matched record.
    pub id: String,

    /// Cosine similarity score.
    pub score: f32,

    /// The matched document text.
    pub document: String,

    /// Metadata of the matched record.
    pub metadata: Option<serde_json::Value>,
}
