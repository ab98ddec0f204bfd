//! # Tools
//!
//! Deterministic command execution for the ROXY assistant core: a closed
//! dispatch table from [`CmdType`](roxy_command::CmdType) to handlers that
//! call local tool backends (git, OBS control, app launching, health
//! probes, a named tool registry) or delegate to the RAG engine through the
//! [`RagBackend`] seam.
//!
//! Handler failures never escape the dispatch boundary as errors; they are
//! folded into a structured [`ToolInvocationResult`] so batch execution can
//! continue past a single failing command. Every handler records the tools
//! it actually ran into the result's evidence list, which downstream
//! response validation uses to reject unverified claims of action.

pub mod error;
pub mod executor;
pub mod git;
pub mod health;
pub mod launch;
pub mod obs;
pub mod registry;
pub mod result;
pub mod subprocess;

pub use error::{Result, ToolError};
pub use executor::{RagBackend, RagResponse, ToolExecutor};
pub use git::GitTool;
pub use health::HealthMonitor;
pub use launch::AppLauncher;
pub use obs::ObsClient;
pub use registry::{RegisteredTool, ToolRegistry};
pub use result::ToolInvocationResult;
