//! Embedding providers.
//!
//! ROXY runs against a local Ollama server for real embeddings, with a
//! deterministic hashing provider as the no-backend fallback.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::normalize;

/// Trait for embedding providers.
///
/// Implementations must produce vectors of exactly [`dimension`] length for
/// every input; collections are dimension-consistent and callers assert the
/// match at startup.
///
/// [`dimension`]: EmbeddingProvider::dimension
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Name of this provider.
    fn name(&self) -> &str;

    /// Model identifier used by this provider.
    fn model(&self) -> &str;

    /// Output dimension of every embedding this provider produces.
    fn dimension(&self) -> usize;

    /// Generate an embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Embedding provider backed by a local Ollama server.
pub struct OllamaEmbedder {
    /// Base URL of the Ollama server.
    base_url: String,

    /// Model to request embeddings from.
    model: String,

    /// Expected output dimension for the configured model.
    dimension: usize,

    /// HTTP client.
    client: reqwest::Client,
}

impl OllamaEmbedder {
    /// Create a new embedder against the default local Ollama address.
    pub fn new() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            client: reqwest::Client::new(),
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model and its expected output dimension.
    pub fn with_model(mut self, model: impl Into<String>, dimension: usize) -> Self {
        self.model = model.into();
        self.dimension = dimension;
        self
    }
}

impl Default for OllamaEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        debug!("Generating embedding with model: {}", self.model);

        let body = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "API error: {error_text}"
            )));
        }

        let result: OllamaEmbeddingResponse = response.json().await?;

        if result.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "No embedding in response".to_string(),
            ));
        }

        if result.embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: result.embedding.len(),
            });
        }

        Ok(result.embedding)
    }
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Ollama embeddings API response format.
#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

/// Deterministic embedding provider based on token hashing.
///
/// Each whitespace token is hashed into a bucket and the resulting vector is
/// normalized to unit length. Identical texts always map to identical
/// vectors and texts with shared vocabulary score above unrelated ones,
/// which is enough for the cache and retrieval paths to operate when no
/// embedding backend is running.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create a new hashing embedder with the given output dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        "token-hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in text.to_lowercase().split_whitespace() {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            vector[bucket] += 1.0;
        }

        normalize(&mut vector);
        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::new(64);

        let a = embedder.embed("what is roxy").await.unwrap();
        let b = embedder.embed("what is roxy").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn hashing_embedder_separates_unrelated_text() {
        let embedder = HashingEmbedder::new(256);

        let a = embedder.embed("what is roxy").await.unwrap();
        let b = embedder.embed("gpu thermal envelope tuning").await.unwrap();

        let sim = cosine_similarity(&a, &b).unwrap();
        assert!(sim < 0.5, "unrelated texts scored {sim}");
    }

    #[tokio::test]
    async fn ollama_embedder_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [0.1, 0.2, 0.3]
            })))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new()
            .with_base_url(server.uri())
            .with_model("nomic-embed-text", 3);

        let embedding = embedder.embed("hello").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn ollama_embedder_rejects_wrong_dimension() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": [0.1, 0.2]
            })))
            .mount(&server)
            .await;

        let embedder = OllamaEmbedder::new()
            .with_base_url(server.uri())
            .with_model("nomic-embed-text", 3);

        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::DimensionMismatch { .. }));
    }
}
