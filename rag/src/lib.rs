//! # RAG engine
//!
//! Retrieval-augmented answering: embed the query, pull the top-k nearest
//! documents from the knowledge collection, merge keyword matches in, build
//! a grounded prompt, and call the LLM — streaming tokens through when the
//! caller asks for them.
//!
//! Retrieval failures degrade instead of failing the request: a broken
//! embedding or vector query falls back to keyword-only retrieval, and an
//! empty retrieval falls back to a context-free LLM call. Each fallback is
//! logged.

pub mod engine;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod validate;

pub use engine::{RagAnswer, RagEngine, RetrievedDoc};
pub use error::{RagError, Result};
pub use llm::{LlmClient, OllamaClient, TokenStream};
pub use validate::{ActionClaimValidator, ResponseValidator};
