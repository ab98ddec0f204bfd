//! Gateway configuration.
//!
//! Configuration comes from environment variables (optionally loaded from a
//! `.env` file by `main`). The auth token is the one mandatory value: the
//! gateway refuses to start without it rather than running open.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Default request header carrying the auth token.
pub const DEFAULT_AUTH_HEADER: &str = "x-roxy-token";

/// Runtime configuration for the gateway and its subsystems.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind.
    pub bind_addr: String,

    /// Shared secret every request (except `/health`) must present.
    pub auth_token: String,

    /// Header name the token is read from.
    pub auth_header: String,

    /// Base URL of the local Ollama server.
    pub ollama_url: String,

    /// Embedding model name.
    pub embed_model: String,

    /// Embedding dimension for the configured model.
    pub embed_dimension: usize,

    /// Completion model name.
    pub llm_model: String,

    /// Use the deterministic hashing embedder instead of Ollama.
    pub hashing_embedder: bool,

    /// Knowledge collection name.
    pub knowledge_collection: String,

    /// Semantic cache collection name.
    pub cache_collection: String,

    /// Cache entry lifetime in seconds.
    pub cache_ttl_secs: i64,

    /// Similarity threshold for a cache hit.
    pub cache_min_score: f32,

    /// Documents retrieved per RAG query.
    pub top_k: usize,

    /// Token bucket capacity per client for `/run` and `/stream`.
    pub run_rate_capacity: f64,

    /// Refill rate per second for the run bucket.
    pub run_rate_refill_per_sec: f64,

    /// Token bucket capacity per client for `/batch` (each batch item costs
    /// one token).
    pub batch_rate_capacity: f64,

    /// Refill rate per second for the batch bucket.
    pub batch_rate_refill_per_sec: f64,

    /// Repository the git tool operates on.
    pub git_repo_root: PathBuf,

    /// Base URL of the local OBS HTTP bridge.
    pub obs_bridge_url: String,

    /// Optional on-disk snapshot path for the vector store.
    pub persist_path: Option<PathBuf>,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("invalid {key}: {raw}")),
        Err(_) => Ok(default),
    }
}

/// A blank token would silently run the gateway open; treat it the same
/// as an unset one.
fn required_token(raw: Option<String>) -> Result<String> {
    raw.filter(|t| !t.trim().is_empty())
        .context("ROXY_AUTH_TOKEN must be set; refusing to start an open gateway")
}

impl GatewayConfig {
    /// Build the configuration from the process environment.
    ///
    /// Fails when `ROXY_AUTH_TOKEN` is unset or empty, or when a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self> {
        let auth_token = required_token(env::var("ROXY_AUTH_TOKEN").ok())?;

        Ok(Self {
            bind_addr: var_or("ROXY_BIND", "127.0.0.1:7077"),
            auth_token,
            auth_header: var_or("ROXY_AUTH_HEADER", DEFAULT_AUTH_HEADER),
            ollama_url: var_or("ROXY_OLLAMA_URL", "http://127.0.0.1:11434"),
            embed_model: var_or("ROXY_EMBED_MODEL", "nomic-embed-text"),
            embed_dimension: parse_var("ROXY_EMBED_DIMENSION", 768)?,
            llm_model: var_or("ROXY_LLM_MODEL", "llama3.1:8b"),
            hashing_embedder: parse_var("ROXY_HASHING_EMBEDDER", false)?,
            knowledge_collection: var_or("ROXY_KNOWLEDGE_COLLECTION", "knowledge"),
            cache_collection: var_or("ROXY_CACHE_COLLECTION", "semantic_cache"),
            cache_ttl_secs: parse_var("ROXY_CACHE_TTL_SECS", 3600)?,
            cache_min_score: parse_var("ROXY_CACHE_MIN_SCORE", 0.92)?,
            top_k: parse_var("ROXY_TOP_K", 5)?,
            run_rate_capacity: parse_var("ROXY_RUN_RATE_CAPACITY", 30.0)?,
            run_rate_refill_per_sec: parse_var("ROXY_RUN_RATE_REFILL_PER_SEC", 0.5)?,
            batch_rate_capacity: parse_var("ROXY_BATCH_RATE_CAPACITY", 10.0)?,
            batch_rate_refill_per_sec: parse_var("ROXY_BATCH_RATE_REFILL_PER_SEC", 0.1)?,
            git_repo_root: PathBuf::from(var_or("ROXY_GIT_REPO", ".")),
            obs_bridge_url: var_or("ROXY_OBS_URL", "http://127.0.0.1:4455"),
            persist_path: env::var("ROXY_PERSIST_PATH").ok().map(PathBuf::from),
        })
    }

    /// A configuration suitable for tests: deterministic embedder, no
    /// persistence, generous rate limit.
    pub fn for_tests(auth_token: impl Into<String>) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".to_string(),
            auth_token: auth_token.into(),
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            ollama_url: "http://127.0.0.1:11434".to_string(),
            embed_model: "hashing".to_string(),
            embed_dimension: 256,
            llm_model: "llama3.1:8b".to_string(),
            hashing_embedder: true,
            knowledge_collection: "knowledge".to_string(),
            cache_collection: "semantic_cache".to_string(),
            cache_ttl_secs: 3600,
            cache_min_score: 0.92,
            top_k: 5,
            run_rate_capacity: 100.0,
            run_rate_refill_per_sec: 100.0,
            batch_rate_capacity: 100.0,
            batch_rate_refill_per_sec: 100.0,
            git_repo_root: PathBuf::from("/nonexistent/repo"),
            obs_bridge_url: "http://127.0.0.1:9".to_string(),
            persist_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn startup_refuses_missing_token() {
        let err = required_token(None).unwrap_err();
        assert!(err.to_string().contains("ROXY_AUTH_TOKEN"));
    }

    #[test]
    fn startup_refuses_blank_token() {
        assert!(required_token(Some(String::new())).is_err());
        assert!(required_token(Some("   ".to_string())).is_err());
    }

    #[test]
    fn configured_token_passes_through() {
        let token = required_token(Some("secret".to_string())).unwrap();
        assert_eq!(token, "secret");
    }
}
