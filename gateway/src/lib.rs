//! # Gateway
//!
//! The HTTP surface of the ROXY assistant core. Routes commands from local
//! clients through the gate sequence — auth, rate limit, sanitize, parse,
//! cache, dispatch — and exposes a streaming path for RAG answers.
//!
//! `/health` is unauthenticated so local supervisors can probe liveness;
//! everything else requires the shared token.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tracing::info;

use roxy_command::CommandParser;
use roxy_embeddings::{EmbeddingProvider, HashingEmbedder, OllamaEmbedder};
use roxy_rag::{OllamaClient, RagEngine};
use roxy_semantic_cache::SemanticCache;
use roxy_tools::{
    AppLauncher, GitTool, HealthMonitor, ObsClient, RagBackend, RagResponse, ToolError,
    ToolExecutor, ToolRegistry,
};
use roxy_vectorstore::VectorStore;

pub mod auth;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod ratelimit;
pub mod routes;
pub mod sanitize;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use pipeline::{CommandPipeline, CommandResponse, ResponseMeta};
pub use ratelimit::{RateDecision, RateLimiter};
pub use sanitize::Sanitizer;

/// Shared per-request application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub pipeline: Arc<CommandPipeline>,
    pub rag: Arc<RagEngine>,

    /// Bucket for `/run` and `/stream`.
    pub run_limiter: Arc<RateLimiter>,

    /// Stricter bucket for `/batch`; one token per batch item.
    pub batch_limiter: Arc<RateLimiter>,

    pub started_at: Instant,
}

/// Adapts the RAG engine to the executor's backend seam.
struct EngineBackend {
    engine: Arc<RagEngine>,
}

#[async_trait]
impl RagBackend for EngineBackend {
    async fn answer(
        &self,
        query: &str,
        extra_context: Option<&str>,
    ) -> roxy_tools::Result<RagResponse> {
        let answer = self
            .engine
            .answer(query, extra_context)
            .await
            .map_err(|e| ToolError::Rag(e.to_string()))?;
        Ok(RagResponse {
            text: answer.text,
            sources: answer.sources,
        })
    }

    fn model_info(&self) -> String {
        format!("Answering with {} via local Ollama.", self.engine.model())
    }
}

/// Assemble every subsystem from the configuration and run the startup
/// self-checks: collection dimensions, rule table, dispatch coverage.
pub async fn build_state(config: GatewayConfig) -> Result<AppState> {
    let store = match &config.persist_path {
        Some(path) => Arc::new(
            VectorStore::with_persistence(path)
                .await
                .context("loading vector store snapshot")?,
        ),
        None => Arc::new(VectorStore::new()),
    };

    let embedder: Arc<dyn EmbeddingProvider> = if config.hashing_embedder {
        Arc::new(HashingEmbedder::new(config.embed_dimension))
    } else {
        Arc::new(
            OllamaEmbedder::new()
                .with_base_url(config.ollama_url.clone())
                .with_model(config.embed_model.clone(), config.embed_dimension),
        )
    };
    info!(
        "embedder: {} ({}d)",
        embedder.model(),
        embedder.dimension()
    );

    store
        .create_collection(&config.knowledge_collection, embedder.dimension())
        .await?;
    store
        .create_collection(&config.cache_collection, embedder.dimension())
        .await?;

    let llm = Arc::new(
        OllamaClient::new()
            .with_base_url(config.ollama_url.clone())
            .with_model(config.llm_model.clone()),
    );

    let rag = Arc::new(
        RagEngine::new(
            embedder.clone(),
            store.clone(),
            llm,
            config.knowledge_collection.clone(),
        )
        .with_top_k(config.top_k),
    );
    rag.verify_dimensions()
        .await
        .context("knowledge collection dimension check")?;

    let cache = SemanticCache::new(
        store.clone(),
        embedder.clone(),
        config.cache_collection.clone(),
    )
    .with_ttl_secs(config.cache_ttl_secs)
    .with_min_score(config.cache_min_score);

    let executor = ToolExecutor::new(
        GitTool::new(&config.git_repo_root),
        ObsClient::new(config.obs_bridge_url.clone()),
        AppLauncher::with_defaults(),
        HealthMonitor::new(),
        ToolRegistry::with_defaults(),
        Arc::new(EngineBackend {
            engine: rag.clone(),
        }),
    );
    ensure!(
        ToolExecutor::verify_dispatch(),
        "dispatch table does not cover every command type"
    );

    let parser = CommandParser::new().context("rule table check")?;
    let sanitizer = Sanitizer::new().context("compiling security deny-list")?;

    let pipeline = Arc::new(CommandPipeline::new(parser, sanitizer, cache, executor));
    let run_limiter = Arc::new(RateLimiter::new(
        config.run_rate_capacity,
        config.run_rate_refill_per_sec,
    ));
    let batch_limiter = Arc::new(RateLimiter::new(
        config.batch_rate_capacity,
        config.batch_rate_refill_per_sec,
    ));

    Ok(AppState {
        config: Arc::new(config),
        pipeline,
        rag,
        run_limiter,
        batch_limiter,
        started_at: Instant::now(),
    })
}

/// Build the router: `/health` open, everything else behind auth.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/run", post(routes::run))
        .route("/batch", post(routes::batch))
        .route("/stream", get(routes::stream))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(routes::health))
        .merge(protected)
        .with_state(state)
}
