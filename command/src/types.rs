//! Command data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of command categories the parser can emit.
///
/// Every variant has exactly one handler in the executor's dispatch table;
/// the match there is exhaustive, so adding a variant without a handler is a
/// compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmdType {
    /// Open question answered through retrieval + LLM.
    Rag,
    /// Small-talk fast-path, answered instantly with a canned response.
    Greeting,
    /// Scoped git subcommand against the configured repo.
    Git,
    /// Control an already-running OBS instance.
    ObsControl,
    /// Launch an application (or open a file/URL) by name.
    LaunchApp,
    /// Aggregate local health probes into a short report.
    Health,
    /// Describe available tools.
    Capabilities,
    /// Describe the active LLM.
    ModelInfo,
    /// Intentionally-unsupported request; answered honestly.
    Unavailable,
    /// Invoke one named registered tool with explicit arguments.
    ToolDirect,
    /// Filesystem query first, then RAG with the result as extra context.
    ToolPreflight,
    /// Static informational text about the assistant.
    Info,
    /// Aggregated daily briefing.
    Briefing,
}

impl CmdType {
    /// Every variant, for startup self-tests over the dispatch table.
    pub const ALL: [CmdType; 13] = [
        CmdType::Rag,
        CmdType::Greeting,
        CmdType::Git,
        CmdType::ObsControl,
        CmdType::LaunchApp,
        CmdType::Health,
        CmdType::Capabilities,
        CmdType::ModelInfo,
        CmdType::Unavailable,
        CmdType::ToolDirect,
        CmdType::ToolPreflight,
        CmdType::Info,
        CmdType::Briefing,
    ];

    /// Short mode label used in response metadata.
    pub fn mode(&self) -> &'static str {
        match self {
            CmdType::Rag => "rag",
            CmdType::Greeting => "greeting",
            CmdType::Git => "git",
            CmdType::ObsControl => "obs_control",
            CmdType::LaunchApp => "launch_app",
            CmdType::Health => "health",
            CmdType::Capabilities => "capabilities",
            CmdType::ModelInfo => "model_info",
            CmdType::Unavailable => "unavailable",
            CmdType::ToolDirect => "tool_direct",
            CmdType::ToolPreflight => "tool_preflight",
            CmdType::Info => "info",
            CmdType::Briefing => "briefing",
        }
    }

    /// Whether answers for this command type may be served from the
    /// semantic cache.
    ///
    /// Only answer-style queries qualify. Tool commands re-execute on every
    /// call because their truth value changes between calls.
    pub fn cacheable(&self) -> bool {
        matches!(self, CmdType::Rag)
    }
}

/// An inbound command, created per request and discarded after the
/// response is sent.
#[derive(Debug, Clone)]
pub struct Command {
    /// Raw command text.
    pub text: String,

    /// When the request arrived.
    pub received_at: DateTime<Utc>,

    /// Client address the request came from.
    pub client_addr: String,
}

impl Command {
    /// Create a command stamped with the current time.
    pub fn new(text: impl Into<String>, client_addr: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Utc::now(),
            client_addr: client_addr.into(),
        }
    }
}

/// The parser's classification of one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCommand {
    /// Command category.
    pub cmd_type: CmdType,

    /// Category-specific arguments.
    pub args: Vec<String>,
}

impl ParsedCommand {
    /// Create a parsed command.
    pub fn new(cmd_type: CmdType, args: Vec<String>) -> Self {
        Self { cmd_type, args }
    }
}
