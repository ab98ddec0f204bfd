//! The command pipeline.
//!
//! Every command a handler accepts flows through the same gates, in order:
//! sanitize, parse, cache lookup (RAG-type only), dispatch, response
//! validation, cache write. Auth and rate limiting happen earlier, at the
//! routing layer, because they apply per request rather than per command.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use roxy_command::{CommandParser, ParsedCommand};
use roxy_rag::{ActionClaimValidator, ResponseValidator};
use roxy_semantic_cache::SemanticCache;
use roxy_tools::ToolExecutor;

use crate::error::ApiError;
use crate::sanitize::Sanitizer;

/// Per-response metadata the clients display alongside the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Command mode label, e.g. `rag` or `launch_app`.
    pub mode: String,

    /// Whether the result came from the semantic cache.
    pub cached: bool,

    /// Tools that actually ran for this command.
    pub tools_used: Vec<String>,

    /// Document ids a RAG answer was grounded on.
    pub sources: Vec<String>,

    /// End-to-end handling time.
    pub duration_ms: u64,
}

/// One command's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// `ok` or `error`.
    pub status: String,

    /// Answer text, tool output, or the error description.
    pub result: String,

    /// Execution metadata.
    pub metadata: ResponseMeta,
}

impl CommandResponse {
    /// Fold a gate rejection into a per-command error entry, for batch
    /// execution where one bad command must not sink its neighbors.
    pub fn from_rejection(error: &ApiError) -> Self {
        Self {
            status: "error".to_string(),
            result: error.to_string(),
            metadata: ResponseMeta {
                mode: "rejected".to_string(),
                cached: false,
                tools_used: Vec::new(),
                sources: Vec::new(),
                duration_ms: 0,
            },
        }
    }
}

/// Runs commands through the gate sequence.
pub struct CommandPipeline {
    parser: CommandParser,
    sanitizer: Sanitizer,
    cache: SemanticCache,
    executor: ToolExecutor,
    validator: ActionClaimValidator,
}

impl CommandPipeline {
    /// Assemble the pipeline.
    pub fn new(
        parser: CommandParser,
        sanitizer: Sanitizer,
        cache: SemanticCache,
        executor: ToolExecutor,
    ) -> Self {
        Self {
            parser,
            sanitizer,
            cache,
            executor,
            validator: ActionClaimValidator::new(),
        }
    }

    /// Screen raw text against the security deny-list.
    pub fn sanitize(&self, text: &str) -> Result<(), ApiError> {
        self.sanitizer.check(text)
    }

    /// Classify raw text without executing it.
    pub fn parse(&self, text: &str) -> ParsedCommand {
        self.parser.parse(text)
    }

    /// Look up a cached answer; used directly by the streaming route.
    pub async fn cached_answer(&self, query: &str) -> Option<String> {
        match self.cache.lookup(query).await {
            Ok(Some(hit)) => {
                info!("semantic cache hit (score {:.3})", hit.score);
                Some(hit.answer)
            }
            Ok(None) => None,
            Err(e) => {
                // A broken cache degrades to recompute, never to failure.
                warn!("cache lookup failed: {e}");
                None
            }
        }
    }

    /// Store a freshly computed answer; used by the streaming route after
    /// the final token.
    pub async fn store_answer(&self, query: &str, answer: &str) {
        if let Err(e) = self.cache.write(query, answer).await {
            warn!("cache write failed: {e}");
        }
    }

    /// Sweep expired cache entries.
    pub async fn purge_cache(&self) {
        match self.cache.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => debug!("purged {purged} expired cache entries"),
            Err(e) => warn!("cache purge failed: {e}"),
        }
    }

    /// Run one command through every gate.
    pub async fn run(&self, text: &str) -> Result<CommandResponse, ApiError> {
        let start = Instant::now();

        self.sanitize(text)?;
        let parsed = self.parser.parse(text);
        let mode = parsed.cmd_type.mode().to_string();
        debug!("command classified as {mode}");

        // Only RAG-type answers are cacheable; deterministic tool commands
        // must re-execute every time.
        if parsed.cmd_type.cacheable()
            && let Some(answer) = self.cached_answer(text).await
        {
            return Ok(CommandResponse {
                status: "ok".to_string(),
                result: answer,
                metadata: ResponseMeta {
                    mode,
                    cached: true,
                    tools_used: Vec::new(),
                    sources: Vec::new(),
                    duration_ms: start.elapsed().as_millis() as u64,
                },
            });
        }

        let result = self.executor.execute(&parsed).await;

        let output = if result.success {
            self.validator.validate(&result.output, &result.tools_used)
        } else {
            result.output.clone()
        };

        if parsed.cmd_type.cacheable() && result.success {
            self.store_answer(text, &output).await;
        }

        let status = if result.success { "ok" } else { "error" };
        let response_result = match (&result.error, result.success) {
            (Some(error), false) => error.clone(),
            _ => output,
        };

        Ok(CommandResponse {
            status: status.to_string(),
            result: response_result,
            metadata: ResponseMeta {
                mode,
                cached: false,
                tools_used: result.tools_used,
                sources: result.sources,
                duration_ms: start.elapsed().as_millis() as u64,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use roxy_command::CmdType;
    use roxy_embeddings::HashingEmbedder;
    use roxy_tools::{
        AppLauncher, GitTool, HealthMonitor, ObsClient, RagBackend, RagResponse, ToolRegistry,
    };
    use roxy_vectorstore::VectorStore;

    const DIM: usize = 256;

    struct CountingRag {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RagBackend for CountingRag {
        async fn answer(
            &self,
            query: &str,
            _extra: Option<&str>,
        ) -> roxy_tools::Result<RagResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RagResponse {
                text: format!("computed answer for '{query}'"),
                sources: vec!["doc-1".to_string()],
            })
        }

        fn model_info(&self) -> String {
            "stub-model".to_string()
        }
    }

    async fn pipeline() -> (CommandPipeline, Arc<AtomicUsize>) {
        let store = Arc::new(VectorStore::new());
        store.create_collection("cache", DIM).await.unwrap();
        let embedder = Arc::new(HashingEmbedder::new(DIM));
        let cache = SemanticCache::new(store, embedder, "cache");

        let calls = Arc::new(AtomicUsize::new(0));
        let executor = ToolExecutor::new(
            GitTool::new("/nonexistent/repo"),
            ObsClient::new("http://127.0.0.1:9"),
            AppLauncher::new(),
            HealthMonitor::new(),
            ToolRegistry::with_defaults(),
            Arc::new(CountingRag {
                calls: calls.clone(),
            }),
        );

        let pipeline = CommandPipeline::new(
            CommandParser::new().unwrap(),
            Sanitizer::new().unwrap(),
            cache,
            executor,
        );
        (pipeline, calls)
    }

    #[tokio::test]
    async fn greeting_flows_through_uncached() {
        let (pipeline, _) = pipeline().await;

        let response = pipeline.run("hey").await.unwrap();
        assert_eq!(response.status, "ok");
        assert_eq!(response.metadata.mode, "greeting");
        assert!(!response.metadata.cached);
    }

    #[tokio::test]
    async fn destructive_command_is_rejected_before_parsing() {
        let (pipeline, calls) = pipeline().await;

        let err = pipeline.run("rm -rf /").await.unwrap_err();
        assert!(matches!(err, ApiError::SecurityBlocked { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_rag_query_is_served_from_cache() {
        let (pipeline, calls) = pipeline().await;

        let first = pipeline.run("what is roxy").await.unwrap();
        assert!(!first.metadata.cached);

        let second = pipeline.run("What is ROXY?").await.unwrap();
        assert!(second.metadata.cached);
        assert_eq!(second.result, first.result);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn tool_commands_bypass_the_cache() {
        let (pipeline, _) = pipeline().await;

        // Health is deterministic-tool territory; two runs, zero cache.
        let parsed = pipeline.parse("health check");
        assert_eq!(parsed.cmd_type, CmdType::Health);

        let first = pipeline.run("health check").await.unwrap();
        let second = pipeline.run("health check").await.unwrap();
        assert!(!first.metadata.cached);
        assert!(!second.metadata.cached);
    }

    #[tokio::test]
    async fn failed_tool_reports_error_status() {
        let (pipeline, _) = pipeline().await;

        // git against a nonexistent repo fails but stays a structured
        // response, not a transport error.
        let response = pipeline.run("git status").await.unwrap();
        assert_eq!(response.status, "error");
        assert!(!response.result.is_empty());
    }
}
