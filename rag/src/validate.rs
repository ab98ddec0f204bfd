//! Response validation.
//!
//! An LLM answer must never claim an action the service did not perform.
//! The validator checks generated text against the per-request tools-used
//! evidence and rewrites unverified claims. There is exactly one
//! implementation; the trait exists so it stays swappable and testable.

use tracing::warn;

/// Validates generated answers against execution evidence.
pub trait ResponseValidator: Send + Sync {
    /// Return the answer, rewritten if it makes unverified claims.
    fn validate(&self, text: &str, tools_used: &[String]) -> String;
}

/// Phrases that assert a performed action.
const ACTION_CLAIMS: &[&str] = &[
    "i opened",
    "i've opened",
    "i have opened",
    "i launched",
    "i've launched",
    "i started",
    "i've started",
    "i ran",
    "i executed",
    "i switched",
    "i stopped",
];

/// Tools whose execution substantiates an action claim. Retrieval alone
/// does not: answering *about* an action is not performing one.
const ACTION_TOOLS: &[&str] = &["git", "obs", "launcher", "health", "fs_read"];

/// The single reviewed validator implementation.
#[derive(Debug, Default)]
pub struct ActionClaimValidator;

impl ActionClaimValidator {
    /// Create the validator.
    pub fn new() -> Self {
        Self
    }

    fn claims_action(text: &str) -> bool {
        let lowered = text.to_lowercase();
        ACTION_CLAIMS.iter().any(|c| lowered.contains(c))
    }

    fn has_action_evidence(tools_used: &[String]) -> bool {
        tools_used
            .iter()
            .any(|t| ACTION_TOOLS.contains(&t.as_str()))
    }
}

impl ResponseValidator for ActionClaimValidator {
    fn validate(&self, text: &str, tools_used: &[String]) -> String {
        if Self::claims_action(text) && !Self::has_action_evidence(tools_used) {
            warn!("Rewriting answer with unverified action claim");
            return format!(
                "{text}\n\n(Correction: no tool was actually executed for this request — \
                 the statement above describes an action that did not happen.)"
            );
        }
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unverified_claim_is_rewritten() {
        let validator = ActionClaimValidator::new();
        let out = validator.validate("I opened OBS for you.", &["rag".to_string()]);
        assert!(out.contains("Correction"));
    }

    #[test]
    fn verified_claim_passes() {
        let validator = ActionClaimValidator::new();
        let out = validator.validate("I launched obs.", &["launcher".to_string()]);
        assert_eq!(out, "I launched obs.");
    }

    #[test]
    fn plain_answer_passes() {
        let validator = ActionClaimValidator::new();
        let out = validator.validate("ROXY is a local assistant.", &[]);
        assert_eq!(out, "ROXY is a local assistant.");
    }
}
