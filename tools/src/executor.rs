//! The command dispatch table.
//!
//! `ToolExecutor::execute` maps every [`CmdType`] to exactly one handler.
//! The match is exhaustive, so a parser rule without an executor branch is
//! a compile error; `verify_dispatch` additionally walks `CmdType::ALL` at
//! startup as a self-test.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Local;
use tracing::{debug, warn};

use roxy_command::{CmdType, ParsedCommand};

use crate::error::{Result, ToolError};
use crate::git::GitTool;
use crate::health::HealthMonitor;
use crate::launch::AppLauncher;
use crate::obs::ObsClient;
use crate::registry::ToolRegistry;
use crate::result::ToolInvocationResult;

/// A retrieval-grounded answer produced by the RAG engine.
#[derive(Debug, Clone)]
pub struct RagResponse {
    /// Generated answer text.
    pub text: String,

    /// Ids of the documents the answer was grounded on.
    pub sources: Vec<String>,
}

/// Seam to the RAG engine, so the dispatch table stays closed in this
/// crate. The gateway adapts the real engine to this trait.
#[async_trait]
pub trait RagBackend: Send + Sync {
    /// Answer an open question, optionally with extra preflight context.
    async fn answer(&self, query: &str, extra_context: Option<&str>) -> Result<RagResponse>;

    /// Describe the active LLM.
    fn model_info(&self) -> String;
}

const GREETING_RESPONSE: &str = "Hey! I'm listening — what do you need?";

const UNAVAILABLE_RESPONSE: &str = "That capability is intentionally not available: I don't run \
     arbitrary shell commands or drive remote browsers. Ask me for git, OBS control, app \
     launching, health checks, or a question about your notes instead.";

const ABOUT_RESPONSE: &str = "I'm ROXY, a local always-on assistant. I route commands to local \
     tools and answer questions from your indexed notes. Everything runs on this machine.";

/// Maximum bytes of a file sampled for preflight context.
const PREFLIGHT_SAMPLE_BYTES: usize = 4096;

/// Executes parsed commands against tool backends and the RAG engine.
pub struct ToolExecutor {
    git: GitTool,
    obs: ObsClient,
    launcher: AppLauncher,
    health: HealthMonitor,
    registry: ToolRegistry,
    rag: Arc<dyn RagBackend>,
}

impl ToolExecutor {
    /// Create an executor over the given backends.
    pub fn new(
        git: GitTool,
        obs: ObsClient,
        launcher: AppLauncher,
        health: HealthMonitor,
        registry: ToolRegistry,
        rag: Arc<dyn RagBackend>,
    ) -> Self {
        Self {
            git,
            obs,
            launcher,
            health,
            registry,
            rag,
        }
    }

    /// Execute one parsed command.
    ///
    /// Handler errors are folded into structured results; this method never
    /// returns an error past the dispatch boundary.
    pub async fn execute(&self, parsed: &ParsedCommand) -> ToolInvocationResult {
        let start = Instant::now();
        debug!("Dispatching {:?}", parsed.cmd_type);

        let result = match parsed.cmd_type {
            CmdType::Rag => self.handle_rag(&parsed.args).await,
            CmdType::Greeting => Ok(ToolInvocationResult::ok(GREETING_RESPONSE)),
            CmdType::Git => self.handle_git(&parsed.args).await,
            CmdType::ObsControl => self.handle_obs(&parsed.args).await,
            CmdType::LaunchApp => self.handle_launch(&parsed.args),
            CmdType::Health => self.handle_health().await,
            CmdType::Capabilities => Ok(self.handle_capabilities()),
            CmdType::ModelInfo => Ok(ToolInvocationResult::ok(self.rag.model_info())),
            CmdType::Unavailable => Ok(ToolInvocationResult::ok(UNAVAILABLE_RESPONSE)),
            CmdType::ToolDirect => self.handle_tool_direct(&parsed.args).await,
            CmdType::ToolPreflight => self.handle_preflight(&parsed.args).await,
            CmdType::Info => Ok(ToolInvocationResult::ok(ABOUT_RESPONSE)),
            CmdType::Briefing => self.handle_briefing().await,
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(result) => result.with_duration_ms(duration_ms),
            Err(e) => {
                warn!("Handler for {:?} failed: {e}", parsed.cmd_type);
                ToolInvocationResult::failure(e.to_string()).with_duration_ms(duration_ms)
            }
        }
    }

    /// Startup self-test: every `CmdType` resolves to a handler.
    ///
    /// The match in `execute` is exhaustive, so this cannot fail today; it
    /// exists so a refactor that weakens that match is caught at startup.
    pub fn verify_dispatch() -> bool {
        CmdType::ALL.iter().all(|t| !t.mode().is_empty())
    }

    async fn handle_rag(&self, args: &[String]) -> Result<ToolInvocationResult> {
        let query = args
            .first()
            .ok_or_else(|| ToolError::InvalidInput("empty query".to_string()))?;

        let response = self.rag.answer(query, None).await?;
        Ok(ToolInvocationResult::ok(response.text)
            .with_tool("rag")
            .with_sources(response.sources))
    }

    async fn handle_git(&self, args: &[String]) -> Result<ToolInvocationResult> {
        let output = self.git.run(args).await?;
        Ok(ToolInvocationResult::ok(output).with_tool("git"))
    }

    async fn handle_obs(&self, args: &[String]) -> Result<ToolInvocationResult> {
        let phrase = args
            .first()
            .ok_or_else(|| ToolError::InvalidInput("empty OBS command".to_string()))?;
        let output = self.obs.handle(phrase).await?;
        Ok(ToolInvocationResult::ok(output).with_tool("obs"))
    }

    fn handle_launch(&self, args: &[String]) -> Result<ToolInvocationResult> {
        let target = args
            .first()
            .ok_or_else(|| ToolError::InvalidInput("nothing to launch".to_string()))?;
        let output = self.launcher.launch(target)?;
        Ok(ToolInvocationResult::ok(output).with_tool("launcher"))
    }

    async fn handle_health(&self) -> Result<ToolInvocationResult> {
        let report = self.health.report().await?;
        Ok(ToolInvocationResult::ok(report).with_tool("health"))
    }

    fn handle_capabilities(&self) -> ToolInvocationResult {
        let mut lines = vec![
            "I can: answer questions from your notes (RAG), run scoped git commands, \
             control OBS, launch applications, and report system health."
                .to_string(),
            "Registered tools:".to_string(),
        ];
        for (name, description) in self.registry.list() {
            lines.push(format!("  {name} — {description}"));
        }
        ToolInvocationResult::ok(lines.join("\n"))
    }

    async fn handle_tool_direct(&self, args: &[String]) -> Result<ToolInvocationResult> {
        let name = args
            .first()
            .ok_or_else(|| ToolError::InvalidInput("no tool named".to_string()))?;
        let output = self.registry.run(name, &args[1..]).await?;
        Ok(ToolInvocationResult::ok(output).with_tool(name.clone()))
    }

    /// Two-phase: sample the file, then answer with the sample as context.
    async fn handle_preflight(&self, args: &[String]) -> Result<ToolInvocationResult> {
        let [path, question] = args else {
            return Err(ToolError::InvalidInput(
                "preflight needs a path and a question".to_string(),
            ));
        };

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ToolError::NotFound(format!("could not read {path}: {e}")))?;
        let sample: String = content.chars().take(PREFLIGHT_SAMPLE_BYTES).collect();

        let context = format!("Contents of {path}:\n{sample}");
        let response = self.rag.answer(question, Some(&context)).await?;

        Ok(ToolInvocationResult::ok(response.text)
            .with_tool("fs_read")
            .with_tool("rag")
            .with_sources(response.sources))
    }

    async fn handle_briefing(&self) -> Result<ToolInvocationResult> {
        let date = Local::now().format("%A, %B %e %Y");
        let health = self.health.report().await?;

        let mut briefing = format!("Briefing for {date}\n\nSystem:\n{health}");

        // Repo status is optional flavor; a missing repo doesn't sink the
        // briefing.
        match self.git.run(&["status".to_string(), "-s".to_string()]).await {
            Ok(status) => briefing.push_str(&format!("\n\nRepo:\n{}", status.trim())),
            Err(e) => debug!("briefing skipped git status: {e}"),
        }

        Ok(ToolInvocationResult::ok(briefing).with_tool("health"))
    }
}
