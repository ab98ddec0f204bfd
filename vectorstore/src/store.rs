//! Store of named collections with optional JSON persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use roxy_embeddings::Embedding;

use crate::collection::Collection;
use crate::error::{Result, VectorStoreError};
use crate::record::{SearchMatch, VectorRecord};

/// Vector store holding named collections.
///
/// This is one of the two shared mutable resources in the service (the
/// other is the rate limiter's bucket map); all access goes through the
/// internal `RwLock`.
pub struct VectorStore {
    /// Collections by name.
    collections: Arc<RwLock<HashMap<String, Collection>>>,

    /// Path for persistent storage, if enabled.
    path: Option<PathBuf>,
}

impl VectorStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            path: None,
        }
    }

    /// Create a store persisted to a JSON file, loading it if present.
    pub async fn with_persistence(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let store = Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            path: Some(path.clone()),
        };

        if path.exists() {
            store.load().await?;
        }

        Ok(store)
    }

    /// Create a collection with a fixed dimension.
    ///
    /// Creating an existing collection with the same dimension is a no-op;
    /// a differing dimension is a conflict error.
    pub async fn create_collection(&self, name: &str, dimension: usize) -> Result<()> {
        let mut collections = self.collections.write().await;

        if let Some(existing) = collections.get(name) {
            if existing.dimension() != dimension {
                return Err(VectorStoreError::CollectionDimensionConflict {
                    name: name.to_string(),
                    existing: existing.dimension(),
                    requested: dimension,
                });
            }
            return Ok(());
        }

        collections.insert(name.to_string(), Collection::new(name, dimension));
        info!("Created collection {name} with dimension {dimension}");
        Ok(())
    }

    /// Get a collection's configured dimension.
    pub async fn collection_dimension(&self, name: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections
            .get(name)
            .map(Collection::dimension)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(name.to_string()))
    }

    /// Insert a record into a collection.
    pub async fn insert(&self, collection: &str, record: VectorRecord) -> Result<()> {
        {
            let mut collections = self.collections.write().await;
            let target = collections
                .get_mut(collection)
                .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;
            target.insert(record)?;
        }

        if self.path.is_some() {
            self.save().await?;
        }
        Ok(())
    }

    /// Remove a record from a collection.
    pub async fn remove(&self, collection: &str, id: &str) -> Result<Option<VectorRecord>> {
        let removed = {
            let mut collections = self.collections.write().await;
            let target = collections
                .get_mut(collection)
                .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;
            target.remove(id)
        };

        if removed.is_some() && self.path.is_some() {
            self.save().await?;
        }
        Ok(removed)
    }

    /// Search a collection for the nearest records.
    pub async fn search(
        &self,
        collection: &str,
        query: &Embedding,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchMatch>> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;
        target.search(query, k, min_score)
    }

    /// Snapshot a collection's `(id, document)` pairs.
    pub async fn documents(&self, collection: &str) -> Result<Vec<(String, String)>> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;
        Ok(target
            .documents()
            .map(|(id, doc)| (id.to_string(), doc.to_string()))
            .collect())
    }

    /// Get a record's metadata.
    pub async fn metadata(&self, collection: &str, id: &str) -> Result<Option<serde_json::Value>> {
        let collections = self.collections.read().await;
        let target = collections
            .get(collection)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))?;
        Ok(target.get(id).and_then(|r| r.metadata.clone()))
    }

    /// Number of records in a collection.
    pub async fn len(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(Collection::len)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))
    }

    /// Save all collections to disk.
    async fn save(&self) -> Result<()> {
        if let Some(ref path) = self.path {
            let collections = self.collections.read().await;
            let content = serde_json::to_string(&*collections)?;

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }

            fs::write(path, content).await?;
            debug!("Saved {} collections to disk", collections.len());
        }
        Ok(())
    }

    /// Load collections from disk.
    async fn load(&self) -> Result<()> {
        if let Some(ref path) = self.path {
            let content = fs::read_to_string(path).await?;
            let loaded: HashMap<String, Collection> = serde_json::from_str(&content)?;

            let mut collections = self.collections.write().await;
            let count = loaded.len();
            *collections = loaded;
            info!("Loaded {count} collections from disk");
        }
        Ok(())
    }
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn create_insert_search() {
        let store = VectorStore::new();
        store.create_collection("knowledge", 3).await.unwrap();
        store
            .insert(
                "knowledge",
                VectorRecord::new("a", vec![1.0, 0.0, 0.0], "doc a"),
            )
            .await
            .unwrap();

        let matches = store
            .search("knowledge", &vec![1.0, 0.0, 0.0], 5, 0.0)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "a");
    }

    #[tokio::test]
    async fn recreate_with_same_dimension_is_noop() {
        let store = VectorStore::new();
        store.create_collection("cache", 4).await.unwrap();
        store.create_collection("cache", 4).await.unwrap();
        assert_eq!(store.collection_dimension("cache").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn recreate_with_other_dimension_conflicts() {
        let store = VectorStore::new();
        store.create_collection("cache", 4).await.unwrap();
        let err = store.create_collection("cache", 8).await.unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::CollectionDimensionConflict { .. }
        ));
    }

    #[tokio::test]
    async fn unknown_collection_is_an_error() {
        let store = VectorStore::new();
        let err = store
            .search("missing", &vec![1.0], 1, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::CollectionNotFound(_)));
    }

    #[tokio::test]
    async fn persistence_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = VectorStore::with_persistence(&path).await.unwrap();
            store.create_collection("knowledge", 2).await.unwrap();
            store
                .insert("knowledge", VectorRecord::new("a", vec![0.0, 1.0], "doc"))
                .await
                .unwrap();
        }

        let reloaded = VectorStore::with_persistence(&path).await.unwrap();
        assert_eq!(reloaded.len("knowledge").await.unwrap(), 1);
        assert_eq!(reloaded.collection_dimension("knowledge").await.unwrap(), 2);
    }
}
