//! Scoped git subcommands against the configured repository.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, ToolError};
use crate::subprocess::run_with_timeout;

/// Subcommands the assistant is allowed to run.
const ALLOWED_SUBCOMMANDS: &[&str] = &["status", "log", "diff", "commit", "push", "pull"];

/// Runs a small allow-listed set of git subcommands against one repo root.
pub struct GitTool {
    repo_root: PathBuf,
    timeout: Duration,
}

impl GitTool {
    /// Create a git tool scoped to the given repository root.
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the subprocess timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one allow-listed subcommand, returning raw git output.
    pub async fn run(&self, args: &[String]) -> Result<String> {
        let Some(subcommand) = args.first() else {
            return Err(ToolError::InvalidInput(
                "missing git subcommand (status/log/diff/commit/push/pull)".to_string(),
            ));
        };

        if !ALLOWED_SUBCOMMANDS.contains(&subcommand.as_str()) {
            return Err(ToolError::InvalidInput(format!(
                "git subcommand not allowed: {subcommand}"
            )));
        }

        if !self.repo_root.is_dir() {
            return Err(ToolError::NotFound(format!(
                "repo root does not exist: {}",
                self.repo_root.display()
            )));
        }

        let mut argv: Vec<&str> = vec![subcommand];
        // Bound log output; everything else passes through as typed.
        if subcommand == "log" && args.len() == 1 {
            argv.extend(["--oneline", "-n", "20"]);
        }
        argv.extend(args[1..].iter().map(String::as_str));

        let output = run_with_timeout("git", &argv, Some(&self.repo_root), self.timeout).await?;

        if output.trim().is_empty() {
            Ok(format!("git {subcommand}: no output (clean)"))
        } else {
            Ok(output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_disallowed_subcommand() {
        let git = GitTool::new("/tmp");
        let err = git.run(&["rebase".to_string()]).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn rejects_missing_subcommand() {
        let git = GitTool::new("/tmp");
        let err = git.run(&[]).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn rejects_missing_repo_root() {
        let git = GitTool::new("/nonexistent/repo/path");
        let err = git.run(&["status".to_string()]).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
