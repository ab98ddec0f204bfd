//! # Vector store
//!
//! Persistence and similarity search over named collections of
//! `(id, vector, document, metadata)` records.
//!
//! Collections are the unit of dimension consistency: a collection's
//! dimension is fixed at creation time and every insert is checked against
//! it. Mismatched vectors are rejected, never truncated or padded.
//!
//! The semantic cache and the RAG knowledge base are separate collections
//! even when they share one store, so a cache write can never surface as
//! ground-truth knowledge.

pub mod collection;
pub mod error;
pub mod record;
pub mod store;

pub use collection::Collection;
pub use error::{Result, VectorStoreError};
pub use record::{SearchMatch, VectorRecord};
pub use store::VectorStore;
