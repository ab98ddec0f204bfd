//! # Embeddings
//!
//! Embedding generation and similarity search for the ROXY assistant core.
//!
//! The semantic cache and the RAG engine both depend on this crate: it turns
//! text into fixed-dimension vectors and ranks candidates by cosine
//! similarity. Two providers are available:
//!
//! - [`OllamaEmbedder`]: calls a local Ollama server's embeddings API
//! - [`HashingEmbedder`]: deterministic token-hash vectors, used when no
//!   embedding backend is configured (and by tests)
//!
//! A collection only ever holds vectors from one provider at one dimension;
//! callers verify that invariant at startup via
//! [`EmbeddingProvider::dimension`].

pub mod error;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use provider::{EmbeddingProvider, HashingEmbedder, OllamaEmbedder};
pub use similarity::{ScoredId, cosine_similarity, find_top_k, normalize};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;
