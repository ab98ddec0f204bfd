//! Application launching.
//!
//! Launching an application by name resolves the executable and starts a
//! detached process. Opening a file or URL is a different mechanism: it
//! goes through the OS opener (`xdg-open` / `open`) instead.

use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;

use crate::error::{Result, ToolError};

#[cfg(target_os = "macos")]
const OPENER: &str = "open";
#[cfg(not(target_os = "macos"))]
const OPENER: &str = "xdg-open";

/// Resolves application names to executables and spawns them detached.
pub struct AppLauncher {
    /// Friendly-name aliases to executable names.
    aliases: HashMap<String, String>,
}

impl AppLauncher {
    /// Create a launcher with no aliases.
    pub fn new() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    /// Create a launcher with the stock alias set.
    pub fn with_defaults() -> Self {
        let mut launcher = Self::new();
        for (alias, exe) in [
            ("obs", "obs"),
            ("browser", "firefox"),
            ("editor", "code"),
            ("terminal", "alacritty"),
        ] {
            launcher.add_alias(alias, exe);
        }
        launcher
    }

    /// Register an alias.
    pub fn add_alias(&mut self, alias: impl Into<String>, executable: impl Into<String>) {
        self.aliases.insert(alias.into(), executable.into());
    }

    fn is_file_or_url(target: &str) -> bool {
        target.contains("://")
            || target.starts_with('/')
            || target.starts_with("./")
            || target.starts_with("~/")
            || Path::new(target).exists()
    }

    /// Launch an application by name, or open a file/URL with the OS opener.
    pub fn launch(&self, target: &str) -> Result<String> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ToolError::InvalidInput("nothing to launch".to_string()));
        }

        if Self::is_file_or_url(target) {
            return self.open(target);
        }

        let executable = self
            .aliases
            .get(target)
            .map(String::as_str)
            .unwrap_or(target);

        let path = which::which(executable)
            .map_err(|_| ToolError::NotFound(format!("application not found: {executable}")))?;

        let child = Command::new(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ToolError::ExecutionFailed(format!("could not start {executable}: {e}")))?;

        info!("Launched {executable} (pid {})", child.id());
        Ok(format!("Launched {executable} (pid {})", child.id()))
    }

    /// Open a file or URL through the OS opener.
    fn open(&self, target: &str) -> Result<String> {
        Command::new(OPENER)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ToolError::ExecutionFailed(format!("could not open {target}: {e}")))?;

        info!("Opened {target} via {OPENER}");
        Ok(format!("Opened {target}"))
    }
}

impl Default for AppLauncher {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_and_paths_are_open_targets() {
        assert!(AppLauncher::is_file_or_url("https://example.com"));
        assert!(AppLauncher::is_file_or_url("/tmp/notes.md"));
        assert!(!AppLauncher::is_file_or_url("obs"));
    }

    #[test]
    fn unknown_application_is_not_found() {
        let launcher = AppLauncher::new();
        let err = launcher.launch("definitely-not-an-installed-app").unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn empty_target_is_invalid() {
        let launcher = AppLauncher::new();
        let err = launcher.launch("  ").unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
