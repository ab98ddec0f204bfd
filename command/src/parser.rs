//! The command parser.

use tracing::debug;

use crate::error::Result;
use crate::rules::{Rule, rule_table, verify_rule_table};
use crate::types::{CmdType, ParsedCommand};

/// Parser over the ordered rule table, falling back to a RAG query.
///
/// Parsing never fails: input no rule claims becomes
/// `CmdType::Rag` with the full original text as its argument.
pub struct CommandParser {
    rules: Vec<Rule>,
}

impl CommandParser {
    /// Build the parser, checking the rule-table invariants.
    pub fn new() -> Result<Self> {
        let rules = rule_table();
        verify_rule_table(&rules)?;
        Ok(Self { rules })
    }

    /// Classify one command.
    pub fn parse(&self, text: &str) -> ParsedCommand {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();

        for rule in &self.rules {
            if let Some(parsed) = (rule.apply)(&lowered, &tokens) {
                debug!("Rule {} matched as {:?}", rule.name, parsed.cmd_type);
                return parsed;
            }
        }

        ParsedCommand::new(CmdType::Rag, vec![text.trim().to_string()])
    }

    /// Names of all rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }
}
