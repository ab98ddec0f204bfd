//! A single dimension-consistent collection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use roxy_embeddings::{Embedding, find_top_k};

use crate::error::{Result, VectorStoreError};
use crate::record::{SearchMatch, VectorRecord};

/// A named collection of vector records, all of one dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    /// Collection name.
    pub name: String,

    /// Fixed dimension of every vector in this collection.
    dimension: usize,

    /// Stored records by id.
    records: HashMap<String, VectorRecord>,
}

impl Collection {
    /// Create a new empty collection.
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            records: HashMap::new(),
        }
    }

    /// The collection's fixed dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or replace a record.
    ///
    /// Rejects vectors whose length differs from the collection dimension.
    pub fn insert(&mut self, record: VectorRecord) -> Result<()> {
        if record.vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: record.vector.len(),
            });
        }

        debug!("Inserting record {} into {}", record.id, self.name);
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    /// Remove a record by id.
    pub fn remove(&mut self, id: &str) -> Option<VectorRecord> {
        self.records.remove(id)
    }

    /// Get a record by id.
    pub fn get(&self, id: &str) -> Option<&VectorRecord> {
        self.records.get(id)
    }

    /// Iterate over `(id, document)` pairs, for keyword-side retrieval.
    pub fn documents(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records
            .values()
            .map(|r| (r.id.as_str(), r.document.as_str()))
    }

    /// Search for the `k` nearest records above `min_score`.
    pub fn search(&self, query: &Embedding, k: usize, min_score: f32) -> Result<Vec<SearchMatch>> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let candidates: Vec<(String, Embedding)> = self
            .records
            .values()
            .map(|r| (r.id.clone(), r.vector.clone()))
            .collect();

        let scored = find_top_k(query, &candidates, k, min_score)?;

        Ok(scored
            .into_iter()
            .filter_map(|s| {
                self.records.get(&s.id).map(|r| SearchMatch {
                    id: s.id,
                    score: s.score,
                    document: r.document.clone(),
                    metadata: r.metadata.clone(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_and_search() {
        let mut collection = Collection::new("knowledge", 3);
        collection
            .insert(VectorRecord::new("a", vec![1.0, 0.0, 0.0], "doc a"))
            .unwrap();
        collection
            .insert(VectorRecord::new("b", vec![0.0, 1.0, 0.0], "doc b"))
            .unwrap();

        let matches = collection.search(&vec![1.0, 0.0, 0.0], 1, 0.0).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "a");
        assert_eq!(matches[0].document, "doc a");
    }

    #[test]
    fn insert_rejects_mismatched_dimension() {
        let mut collection = Collection::new("knowledge", 3);
        let err = collection
            .insert(VectorRecord::new("bad", vec![1.0, 0.0], "doc"))
            .unwrap_err();

        assert!(matches!(err, VectorStoreError::DimensionMismatch { .. }));
        assert!(collection.is_empty());
    }

    #[test]
    fn search_rejects_mismatched_query() {
        let collection = Collection::new("knowledge", 3);
        let err = collection.search(&vec![1.0], 1, 0.0).unwrap_err();
        assert!(matches!(err, VectorStoreError::DimensionMismatch { .. }));
    }
}
