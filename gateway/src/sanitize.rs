//! Command security screening.
//!
//! A deny-list of regex patterns over the raw command text, checked before
//! parsing. A match is a hard stop: the command is rejected with the
//! pattern's id and never reaches the parser or any tool. The list targets
//! destructive shell idioms that have no legitimate reading as an assistant
//! command.

use regex::Regex;
use tracing::warn;

use crate::error::ApiError;

/// One deny rule: a stable id plus its pattern.
struct DenyRule {
    id: &'static str,
    pattern: Regex,
}

/// Screens raw command text against the deny-list.
pub struct Sanitizer {
    rules: Vec<DenyRule>,
}

const DENY_PATTERNS: &[(&str, &str)] = &[
    ("rm-rf", r"\brm\s+(-[a-z]*r[a-z]*f|-[a-z]*f[a-z]*r)\b"),
    ("sudo", r"\bsudo\b"),
    ("mkfs", r"\bmkfs(\.\w+)?\b"),
    ("dd-write", r"\bdd\s+if="),
    ("fork-bomb", r":\(\)\s*\{"),
    ("pipe-to-shell", r"\|\s*(ba|z|da)?sh\b"),
    ("chmod-777", r"\bchmod\s+(-[a-zA-Z]+\s+)?777\b"),
    ("device-write", r">\s*/dev/(sd|nvme|hd)"),
    ("shutdown", r"\b(shutdown|reboot|poweroff|halt)\b"),
    ("kill-all", r"\bkill(all)?\s+-9\b"),
];

impl Sanitizer {
    /// Compile the deny-list.
    pub fn new() -> Result<Self, regex::Error> {
        let rules = DENY_PATTERNS
            .iter()
            .map(|(id, pattern)| {
                Ok(DenyRule {
                    id,
                    pattern: Regex::new(pattern)?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// Check a command; `Err` carries the matched pattern id.
    pub fn check(&self, text: &str) -> Result<(), ApiError> {
        let lowered = text.to_lowercase();
        for rule in &self.rules {
            if rule.pattern.is_match(&lowered) {
                warn!("blocked command matching deny pattern {}", rule.id);
                return Err(ApiError::SecurityBlocked { pattern: rule.id });
            }
        }
        Ok(())
    }
}
