//! Local health probes.

use std::time::Duration;

use tokio::fs;
use tracing::debug;

use crate::error::Result;
use crate::subprocess::run_with_timeout;

/// Aggregates local health probes into a short report.
///
/// Individual probe failures degrade to "unavailable" lines; the report as
/// a whole only fails on internal errors, never because one backend is
/// down.
pub struct HealthMonitor {
    timeout: Duration,
}

impl HealthMonitor {
    /// Create a monitor with the default probe timeout.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }

    /// Build the aggregate report.
    pub async fn report(&self) -> Result<String> {
        let mut lines = Vec::new();

        lines.push(format!("load: {}", self.load_average().await));
        lines.push(format!("memory: {}", self.memory().await));
        lines.push(format!("disk: {}", self.disk().await));
        lines.push(format!("containers: {}", self.containers().await));

        Ok(lines.join("\n"))
    }

    async fn load_average(&self) -> String {
        match fs::read_to_string("/proc/loadavg").await {
            Ok(content) => content
                .split_whitespace()
                .take(3)
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => "unavailable".to_string(),
        }
    }

    async fn memory(&self) -> String {
        let Ok(content) = fs::read_to_string("/proc/meminfo").await else {
            return "unavailable".to_string();
        };

        let field = |name: &str| {
            content
                .lines()
                .find(|l| l.starts_with(name))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|v| v.parse::<u64>().ok())
        };

        match (field("MemAvailable"), field("MemTotal")) {
            (Some(available), Some(total)) if total > 0 => {
                format!("{} / {} MiB free", available / 1024, total / 1024)
            }
            _ => "unavailable".to_string(),
        }
    }

    async fn disk(&self) -> String {
        match run_with_timeout("df", &["-Ph", "/"], None, self.timeout).await {
            Ok(output) => output
                .lines()
                .nth(1)
                .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
                .unwrap_or_else(|| "unavailable".to_string()),
            Err(e) => {
                debug!("disk probe failed: {e}");
                "unavailable".to_string()
            }
        }
    }

    async fn containers(&self) -> String {
        match run_with_timeout(
            "docker",
            &["ps", "--format", "{{.Names}}"],
            None,
            self.timeout,
        )
        .await
        {
            Ok(output) => {
                let names: Vec<&str> = output.lines().filter(|l| !l.is_empty()).collect();
                if names.is_empty() {
                    "none running".to_string()
                } else {
                    format!("{} running ({})", names.len(), names.join(", "))
                }
            }
            Err(e) => {
                debug!("container probe failed: {e}");
                "unavailable".to_string()
            }
        }
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn report_always_has_all_sections() {
        let monitor = HealthMonitor::new();
        let report = monitor.report().await.unwrap();

        for section in ["load:", "memory:", "disk:", "containers:"] {
            assert!(report.contains(section), "missing {section} in {report}");
        }
    }
}
