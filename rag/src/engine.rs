//! The retrieval-augmented answering engine.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use roxy_embeddings::EmbeddingProvider;
use roxy_vectorstore::VectorStore;

use crate::error::{RagError, Result};
use crate::llm::{LlmClient, TokenStream};
use crate::prompt::{build_direct_prompt, build_prompt};

/// Default number of documents retrieved per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Default minimum similarity for a retrieved document.
pub const DEFAULT_MIN_SCORE: f32 = 0.25;

/// A document retrieved as context for an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDoc {
    /// Document id, cited back to the caller.
    pub id: String,

    /// Document text.
    pub document: String,

    /// Retrieval score.
    pub score: f32,
}

/// A generated answer plus its citations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    /// Generated answer text.
    pub text: String,

    /// Ids of the documents the answer was grounded on.
    pub sources: Vec<String>,
}

/// Composes the embedder, the knowledge collection, and the LLM backend.
pub struct RagEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<VectorStore>,
    llm: Arc<dyn LlmClient>,
    collection: String,
    top_k: usize,
    min_score: f32,
}

impl RagEngine {
    /// Create an engine over the given knowledge collection.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<VectorStore>,
        llm: Arc<dyn LlmClient>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            collection: collection.into(),
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    /// Set the number of documents retrieved per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the minimum retrieval similarity.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// The active LLM's model identifier.
    pub fn model(&self) -> String {
        self.llm.model().to_string()
    }

    /// Assert that the knowledge collection's dimension matches the active
    /// embedder. Run at startup so mismatches fail fast instead of at
    /// query time.
    pub async fn verify_dimensions(&self) -> Result<()> {
        let collection_dim = self.store.collection_dimension(&self.collection).await?;
        let embedder_dim = self.embedder.dimension();

        if collection_dim != embedder_dim {
            return Err(RagError::CollectionDimensionMismatch {
                collection: self.collection.clone(),
                collection_dim,
                embedder_dim,
            });
        }
        Ok(())
    }

    /// Retrieve context for a query: vector search merged with keyword
    /// matches, keyword-only when the vector side fails.
    async fn retrieve(&self, query: &str) -> Vec<RetrievedDoc> {
        let vector_docs = match self.vector_retrieve(query).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!("Vector retrieval failed ({e}), falling back to keyword-only");
                Vec::new()
            }
        };

        let keyword_docs = match self.keyword_retrieve(query).await {
            Ok(docs) => docs,
            Err(e) => {
                debug!("Keyword retrieval failed: {e}");
                Vec::new()
            }
        };

        // Hybrid merge: vector matches rank first, keyword matches fill in
        // anything the vector side missed.
        let mut seen: HashSet<String> = HashSet::new();
        let mut merged = Vec::new();
        for doc in vector_docs.into_iter().chain(keyword_docs) {
            if seen.insert(doc.id.clone()) {
                merged.push(doc);
            }
            if merged.len() >= self.top_k {
                break;
            }
        }
        merged
    }

    async fn vector_retrieve(&self, query: &str) -> Result<Vec<RetrievedDoc>> {
        let vector = self.embedder.embed(query).await?;
        let matches = self
            .store
            .search(&self.collection, &vector, self.top_k, self.min_score)
            .await?;

        Ok(matches
            .into_iter()
            .map(|m| RetrievedDoc {
                id: m.id,
                document: m.document,
                score: m.score,
            })
            .collect())
    }

    async fn keyword_retrieve(&self, query: &str) -> Result<Vec<RetrievedDoc>> {
        let query_tokens: HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<RetrievedDoc> = self
            .store
            .documents(&self.collection)
            .await?
            .into_iter()
            .filter_map(|(id, document)| {
                let overlap = document
                    .to_lowercase()
                    .split_whitespace()
                    .filter(|t| query_tokens.contains(*t))
                    .collect::<HashSet<_>>()
                    .len();
                if overlap == 0 {
                    return None;
                }
                let score = overlap as f32 / query_tokens.len() as f32;
                Some(RetrievedDoc {
                    id,
                    document,
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(self.top_k);
        Ok(scored)
    }

    /// Answer an open question with cited context.
    ///
    /// `extra` carries preflight output (a file sample) when present.
    pub async fn answer(&self, query: &str, extra: Option<&str>) -> Result<RagAnswer> {
        let contexts = self.retrieve(query).await;

        let prompt = if contexts.is_empty() && extra.is_none() {
            info!("Answering without retrieved context (degraded path)");
            build_direct_prompt(query)
        } else {
            build_prompt(query, &contexts, extra)
        };

        let text = self.llm.generate(&prompt).await?;
        let sources = contexts.into_iter().map(|d| d.id).collect();

        Ok(RagAnswer { text, sources })
    }

    /// Answer as a token stream, returning the citations up front.
    pub async fn answer_stream(&self, query: &str) -> Result<(Vec<String>, TokenStream)> {
        let contexts = self.retrieve(query).await;

        let prompt = if contexts.is_empty() {
            info!("Streaming without retrieved context (degraded path)");
            build_direct_prompt(query)
        } else {
            build_prompt(query, &contexts, None)
        };

        let sources: Vec<String> = contexts.into_iter().map(|d| d.id).collect();
        let stream = self.llm.generate_stream(&prompt).await?;
        Ok((sources, stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use roxy_embeddings::{EmbeddingError, HashingEmbedder};
    use roxy_vectorstore::VectorRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DIM: usize = 256;

    /// LLM stub that echoes the prompt it was given.
    struct EchoLlm {
        calls: AtomicUsize,
    }

    impl EchoLlm {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmClient for EchoLlm {
        fn model(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("PROMPT<<{prompt}>>"))
        }

        async fn generate_stream(&self, _prompt: &str) -> Result<TokenStream> {
            Ok(Box::pin(futures::stream::iter(vec![
                Ok("tok1".to_string()),
                Ok("tok2".to_string()),
            ])))
        }
    }

    /// Embedder that always fails, to force the keyword fallback.
    struct BrokenEmbedder;

    #[async_trait]
    impl EmbeddingProvider for BrokenEmbedder {
        fn name(&self) -> &str {
            "broken"
        }
        fn model(&self) -> &str {
            "broken"
        }
        fn dimension(&self) -> usize {
            DIM
        }
        async fn embed(&self, _text: &str) -> roxy_embeddings::Result<Vec<f32>> {
            Err(EmbeddingError::ProviderNotConfigured)
        }
    }

    async fn seeded_store(embedder: &dyn EmbeddingProvider) -> Arc<VectorStore> {
        let store = Arc::new(VectorStore::new());
        store.create_collection("knowledge", DIM).await.unwrap();
        for (id, doc) in [
            ("doc-roxy", "roxy is a local assistant running on localhost"),
            ("doc-gpu", "gpu power limit set to 280 watts for stability"),
        ] {
            let vector = embedder
                .embed(doc)
                .await
                .unwrap_or_else(|_| vec![0.0; DIM]);
            let mut vector = vector;
            if vector.iter().all(|v| *v == 0.0) {
                vector[0] = 1.0; // keep the record insertable
            }
            store
                .insert("knowledge", VectorRecord::new(id, vector, doc))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn answer_cites_retrieved_sources() {
        let embedder = Arc::new(HashingEmbedder::new(DIM));
        let store = seeded_store(embedder.as_ref()).await;
        let engine = RagEngine::new(embedder, store, Arc::new(EchoLlm::new()), "knowledge");

        let answer = engine.answer("what is roxy", None).await.unwrap();
        assert!(answer.sources.contains(&"doc-roxy".to_string()));
        assert!(answer.text.contains("what is roxy"));
    }

    #[tokio::test]
    async fn broken_embedder_degrades_to_keyword_retrieval() {
        let embedder = Arc::new(BrokenEmbedder);
        let store = seeded_store(&BrokenEmbedder).await;
        let engine = RagEngine::new(embedder, store, Arc::new(EchoLlm::new()), "knowledge");

        let answer = engine.answer("roxy assistant", None).await.unwrap();
        // Keyword overlap still finds the roxy document.
        assert_eq!(answer.sources, vec!["doc-roxy".to_string()]);
    }

    #[tokio::test]
    async fn empty_retrieval_still_answers() {
        let embedder = Arc::new(HashingEmbedder::new(DIM));
        let store = Arc::new(VectorStore::new());
        store.create_collection("knowledge", DIM).await.unwrap();
        let engine = RagEngine::new(embedder, store, Arc::new(EchoLlm::new()), "knowledge");

        let answer = engine
            .answer("completely unknown topic", None)
            .await
            .unwrap();
        assert!(answer.sources.is_empty());
        assert!(!answer.text.is_empty());
    }

    #[tokio::test]
    async fn dimension_check_fails_fast_on_mismatch() {
        let embedder = Arc::new(HashingEmbedder::new(DIM));
        let store = Arc::new(VectorStore::new());
        store.create_collection("knowledge", DIM + 1).await.unwrap();
        let engine = RagEngine::new(embedder, store, Arc::new(EchoLlm::new()), "knowledge");

        let err = engine.verify_dimensions().await.unwrap_err();
        assert!(matches!(
            err,
            RagError::CollectionDimensionMismatch { .. }
        ));
    }

    #[tokio::test]
    async fn stream_returns_sources_then_tokens() {
        use futures::StreamExt;

        let embedder = Arc::new(HashingEmbedder::new(DIM));
        let store = seeded_store(embedder.as_ref()).await;
        let engine = RagEngine::new(embedder, store, Arc::new(EchoLlm::new()), "knowledge");

        let (sources, mut stream) = engine.answer_stream("what is roxy").await.unwrap();
        assert!(sources.contains(&"doc-roxy".to_string()));

        let mut tokens = Vec::new();
        while let Some(token) = stream.next().await {
            tokens.push(token.unwrap());
        }
        assert_eq!(tokens, vec!["tok1".to_string(), "tok2".to_string()]);
    }
}
