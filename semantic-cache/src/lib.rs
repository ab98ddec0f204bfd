//! # Semantic cache
//!
//! Maps answer-style queries to previously computed answers by embedding
//! similarity. A hit requires both a similarity score above the configured
//! threshold and an unexpired TTL.
//!
//! The cache owns its vector store collection exclusively; it is consulted
//! only for RAG-type commands. Deterministic tool commands (git status, OBS
//! control, health) are never cached because their truth value changes
//! between calls — the caller decides this from the parsed command type, not
//! from this crate.

pub mod error;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use roxy_embeddings::EmbeddingProvider;
use roxy_vectorstore::{VectorRecord, VectorStore};

pub use error::{CacheError, Result};

/// Default similarity threshold for a cache hit.
pub const DEFAULT_MIN_SCORE: f32 = 0.92;

/// Default entry lifetime in seconds (one hour).
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// A cached answer returned on lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedAnswer {
    /// The stored answer text.
    pub answer: String,

    /// The query text the answer was originally computed for.
    pub query: String,

    /// Similarity score between the lookup query and the stored one.
    pub score: f32,
}

/// TTL metadata stored alongside each entry.
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    query: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Semantic cache over a dedicated vector store collection.
pub struct SemanticCache {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    collection: String,
    ttl: Duration,
    min_score: f32,
}

impl SemanticCache {
    /// Create a cache over the given collection.
    ///
    /// The collection must already exist with the embedder's dimension.
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    /// Set the entry lifetime.
    pub fn with_ttl_secs(mut self, secs: i64) -> Self {
        self.ttl = Duration::seconds(secs);
        self
    }

    /// Set the similarity threshold for a hit.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Normalize a query for embedding and keying.
    ///
    /// Lowercases, collapses whitespace, and trims trailing punctuation so
    /// "What is ROXY?" and "what is roxy" land on the same entry.
    pub fn normalize_query(query: &str) -> String {
        query
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim_end_matches(['?', '!', '.'])
            .to_string()
    }

    fn entry_id(normalized: &str) -> String {
        let mut hasher = DefaultHasher::new();
        normalized.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }

    /// Look up a cached answer for the query.
    ///
    /// Returns `None` on miss, on insufficient similarity, or when the
    /// nearest entry has expired (expired entries are deleted eagerly).
    pub async fn lookup(&self, query: &str) -> Result<Option<CachedAnswer>> {
        let normalized = Self::normalize_query(query);
        let vector = self.embedder.embed(&normalized).await?;

        let matches = self
            .store
            .search(&self.collection, &vector, 1, self.min_score)
            .await?;

        let Some(best) = matches.into_iter().next() else {
            debug!("Cache miss for query");
            return Ok(None);
        };

        let meta: EntryMeta = best
            .metadata
            .ok_or_else(|| CacheError::MalformedEntry(best.id.clone()))
            .and_then(|m| {
                serde_json::from_value(m).map_err(|e| CacheError::MalformedEntry(e.to_string()))
            })?;

        if meta.expires_at <= Utc::now() {
            debug!("Cache entry {} expired, deleting", best.id);
            self.store.remove(&self.collection, &best.id).await?;
            return Ok(None);
        }

        debug!("Cache hit with score {:.3}", best.score);
        Ok(Some(CachedAnswer {
            answer: best.document,
            query: meta.query,
            score: best.score,
        }))
    }

    /// Store an answer keyed by the query's embedding.
    pub async fn write(&self, query: &str, answer: &str) -> Result<()> {
        let normalized = Self::normalize_query(query);
        let vector = self.embedder.embed(&normalized).await?;

        let now = Utc::now();
        let meta = EntryMeta {
            query: normalized.clone(),
            created_at: now,
            expires_at: now + self.ttl,
        };

        let record = VectorRecord::new(Self::entry_id(&normalized), vector, answer)
            .with_metadata(serde_json::to_value(&meta).map_err(|e| {
                CacheError::MalformedEntry(e.to_string())
            })?);

        self.store.insert(&self.collection, record).await?;
        debug!("Cached answer for query");
        Ok(())
    }

    /// Delete a specific entry by its query text.
    pub async fn invalidate(&self, query: &str) -> Result<bool> {
        let normalized = Self::normalize_query(query);
        let removed = self
            .store
            .remove(&self.collection, &Self::entry_id(&normalized))
            .await?;
        Ok(removed.is_some())
    }

    /// Delete every expired entry, returning the count removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let ids: Vec<String> = self
            .store
            .documents(&self.collection)
            .await?
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        let mut purged = 0;
        for id in ids {
            let Some(raw) = self.store.metadata(&self.collection, &id).await? else {
                continue;
            };
            let Ok(meta) = serde_json::from_value::<EntryMeta>(raw) else {
                continue;
            };
            if meta.expires_at <= now {
                self.store.remove(&self.collection, &id).await?;
                purged += 1;
            }
        }

        if purged > 0 {
            info!("Purged {purged} expired cache entries");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use roxy_embeddings::HashingEmbedder;

    const DIM: usize = 256;

    async fn test_cache(ttl_secs: i64) -> SemanticCache {
        let store = Arc::new(VectorStore::new());
        store.create_collection("cache", DIM).await.unwrap();
        let embedder = Arc::new(HashingEmbedder::new(DIM));
        SemanticCache::new(store, embedder, "cache").with_ttl_secs(ttl_secs)
    }

    #[test]
    fn normalization_folds_case_and_punctuation() {
        assert_eq!(
            SemanticCache::normalize_query("  What is   ROXY? "),
            "what is roxy"
        );
    }

    #[tokio::test]
    async fn write_then_lookup_hits() {
        let cache = test_cache(3600).await;

        cache
            .write("what is roxy", "ROXY is a local assistant.")
            .await
            .unwrap();

        let hit = cache.lookup("What is ROXY?").await.unwrap();
        let hit = hit.expect("expected a cache hit");
        assert_eq!(hit.answer, "ROXY is a local assistant.");
        assert!(hit.score > 0.9);
    }

    #[tokio::test]
    async fn dissimilar_query_misses() {
        let cache = test_cache(3600).await;

        cache
            .write("what is roxy", "ROXY is a local assistant.")
            .await
            .unwrap();

        let miss = cache
            .lookup("kernel scheduler preemption latency")
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn expired_entry_misses_and_is_deleted() {
        let cache = test_cache(0).await;

        cache.write("what is roxy", "stale answer").await.unwrap();

        let miss = cache.lookup("what is roxy").await.unwrap();
        assert!(miss.is_none());

        // The expired entry was removed on lookup, so a purge finds nothing.
        assert_eq!(cache.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn purge_removes_expired_entries() {
        let cache = test_cache(0).await;
        cache.write("query one", "a").await.unwrap();
        cache.write("query two", "b").await.unwrap();

        assert_eq!(cache.purge_expired().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = test_cache(3600).await;
        cache.write("what is roxy", "answer").await.unwrap();

        assert!(cache.invalidate("What is ROXY?").await.unwrap());
        assert!(cache.lookup("what is roxy").await.unwrap().is_none());
    }
}
