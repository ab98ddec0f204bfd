//! Named tool registry for direct invocation.

use std::collections::HashMap;
use std::time::Duration;

use tracing::info;

use crate::error::{Result, ToolError};
use crate::subprocess::run_with_timeout;

/// A registered external tool: a fixed program and argv prefix.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    /// Tool name used in commands.
    pub name: String,

    /// One-line description for capability listings.
    pub description: String,

    /// Program to execute.
    pub program: String,

    /// Arguments always passed before user arguments.
    pub base_args: Vec<String>,
}

/// Registry of tools invocable via `ToolDirect` commands.
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    timeout: Duration,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Create a registry with the stock tool set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(RegisteredTool {
            name: "diskfree".to_string(),
            description: "Filesystem usage (df -h)".to_string(),
            program: "df".to_string(),
            base_args: vec!["-h".to_string()],
        });
        registry.register(RegisteredTool {
            name: "uptime".to_string(),
            description: "System uptime and load".to_string(),
            program: "uptime".to_string(),
            base_args: vec![],
        });
        registry
    }

    /// Register a tool, replacing any previous tool of the same name.
    pub fn register(&mut self, tool: RegisteredTool) {
        info!("Registered tool {}", tool.name);
        self.tools.insert(tool.name.clone(), tool);
    }

    /// List `(name, description)` pairs, sorted by name.
    pub fn list(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .tools
            .values()
            .map(|t| (t.name.clone(), t.description.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Run a named tool with extra arguments.
    pub async fn run(&self, name: &str, extra_args: &[String]) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(format!("unknown tool: {name}")))?;

        let args: Vec<&str> = tool
            .base_args
            .iter()
            .chain(extra_args.iter())
            .map(String::as_str)
            .collect();

        run_with_timeout(&tool.program, &args, None, self.timeout).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry.run("nope", &[]).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn registered_tool_runs() {
        let mut registry = ToolRegistry::new();
        registry.register(RegisteredTool {
            name: "say".to_string(),
            description: "echo".to_string(),
            program: "echo".to_string(),
            base_args: vec!["hi".to_string()],
        });

        let out = registry.run("say", &["there".to_string()]).await.unwrap();
        assert_eq!(out.trim(), "hi there");
    }

    #[test]
    fn listing_is_sorted() {
        let registry = ToolRegistry::with_defaults();
        let names: Vec<String> = registry.list().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["diskfree".to_string(), "uptime".to_string()]);
    }
}
