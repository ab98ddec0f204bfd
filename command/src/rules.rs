//! The ordered pattern-rule table.
//!
//! Each rule is a predicate over the lower-cased, tokenized input plus an
//! action producing a [`ParsedCommand`]. First matching rule wins. The
//! fallback (treat as RAG query) lives in the parser, not here.

use crate::error::{CommandError, Result};
use crate::types::{CmdType, ParsedCommand};

/// One pattern rule.
pub struct Rule {
    /// Rule name, unique within the table.
    pub name: &'static str,

    /// Explicit priority; the table is evaluated in strictly increasing
    /// priority order.
    pub priority: u8,

    /// Attempt to match; `None` means fall through to the next rule.
    pub apply: fn(lowered: &str, tokens: &[&str]) -> Option<ParsedCommand>,
}

const GREETING_OPENERS: &[&str] = &["hi", "hello", "hey", "yo", "howdy"];

fn greeting(_lowered: &str, tokens: &[&str]) -> Option<ParsedCommand> {
    if tokens.is_empty() || tokens.len() > 3 {
        return None;
    }
    let opener = GREETING_OPENERS.contains(&tokens[0])
        || (tokens[0] == "good"
            && tokens
                .get(1)
                .is_some_and(|t| ["morning", "afternoon", "evening"].contains(t)));
    if opener {
        Some(ParsedCommand::new(CmdType::Greeting, vec![]))
    } else {
        None
    }
}

/// Words after "start" that mean broadcast control, not app launching.
/// Tie-break against `obs_control`: launch intent runs first, so it has to
/// step aside for "start streaming" / "start the recording".
const BROADCAST_OBJECTS: &[&str] = &["stream", "streaming", "record", "recording", "the"];

fn launch_app(_lowered: &str, tokens: &[&str]) -> Option<ParsedCommand> {
    let (first, rest) = tokens.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let launches = match *first {
        "open" | "launch" => true,
        "start" => !BROADCAST_OBJECTS.contains(&rest[0]),
        _ => false,
    };
    if launches {
        Some(ParsedCommand::new(CmdType::LaunchApp, vec![rest.join(" ")]))
    } else {
        None
    }
}

fn git(_lowered: &str, tokens: &[&str]) -> Option<ParsedCommand> {
    let (first, rest) = tokens.split_first()?;
    if *first == "git" && !rest.is_empty() {
        Some(ParsedCommand::new(
            CmdType::Git,
            rest.iter().map(|t| t.to_string()).collect(),
        ))
    } else {
        None
    }
}

fn obs_control(lowered: &str, tokens: &[&str]) -> Option<ParsedCommand> {
    let obs_keyword = tokens.contains(&"obs");
    let start_stop = tokens
        .first()
        .is_some_and(|t| *t == "start" || *t == "stop")
        && (tokens.contains(&"stream") || tokens.contains(&"record"));
    let broadcast_phrase = lowered.contains("scene")
        || lowered.contains("streaming")
        || lowered.contains("recording")
        || start_stop
        || tokens.first().is_some_and(|t| *t == "mute" || *t == "unmute");
    if obs_keyword || broadcast_phrase {
        Some(ParsedCommand::new(
            CmdType::ObsControl,
            vec![lowered.to_string()],
        ))
    } else {
        None
    }
}

fn health(lowered: &str, tokens: &[&str]) -> Option<ParsedCommand> {
    let matched = tokens.contains(&"health")
        || tokens.contains(&"healthcheck")
        || tokens.contains(&"diagnostics")
        || tokens == ["status"]
        || lowered == "system status";
    if matched {
        Some(ParsedCommand::new(CmdType::Health, vec![]))
    } else {
        None
    }
}

fn capabilities(lowered: &str, tokens: &[&str]) -> Option<ParsedCommand> {
    let matched = lowered.contains("what can you do")
        || tokens.contains(&"capabilities")
        || tokens == ["help"];
    if matched {
        Some(ParsedCommand::new(CmdType::Capabilities, vec![]))
    } else {
        None
    }
}

fn model_info(lowered: &str, tokens: &[&str]) -> Option<ParsedCommand> {
    let about_model = tokens.contains(&"model");
    let interrogative = lowered.contains("what")
        || lowered.contains("which")
        || lowered.contains("info");
    if about_model && interrogative {
        Some(ParsedCommand::new(CmdType::ModelInfo, vec![]))
    } else {
        None
    }
}

/// Intentionally-unsupported capabilities: arbitrary shell execution and
/// remote browser control are refused honestly rather than faked.
fn unavailable(lowered: &str, tokens: &[&str]) -> Option<ParsedCommand> {
    let shell_exec = tokens
        .first()
        .is_some_and(|t| ["sh", "bash", "exec", "eval", "shell"].contains(t));
    let browser = lowered.starts_with("browse ")
        || lowered.contains("in the browser")
        || lowered.contains("remote desktop");
    if shell_exec || browser {
        Some(ParsedCommand::new(
            CmdType::Unavailable,
            vec![lowered.to_string()],
        ))
    } else {
        None
    }
}

fn tool_direct(_lowered: &str, tokens: &[&str]) -> Option<ParsedCommand> {
    let (first, rest) = tokens.split_first()?;
    if *first == "tool" && !rest.is_empty() {
        Some(ParsedCommand::new(
            CmdType::ToolDirect,
            rest.iter().map(|t| t.to_string()).collect(),
        ))
    } else {
        None
    }
}

fn looks_like_path(token: &str) -> bool {
    token.contains('/') || (token.contains('.') && !token.ends_with('.'))
}

fn tool_preflight(_lowered: &str, tokens: &[&str]) -> Option<ParsedCommand> {
    let (first, rest) = tokens.split_first()?;
    if !["check", "read", "summarize"].contains(first) {
        return None;
    }
    let path = rest.first().filter(|t| looks_like_path(t))?;

    let question = rest[1..].join(" ");
    let question = if question.is_empty() {
        "summarize this file".to_string()
    } else {
        question
    };

    Some(ParsedCommand::new(
        CmdType::ToolPreflight,
        vec![path.to_string(), question],
    ))
}

fn info(lowered: &str, tokens: &[&str]) -> Option<ParsedCommand> {
    let matched = tokens.first().is_some_and(|t| *t == "info" || *t == "about")
        || lowered == "who are you"
        || lowered == "what is your name";
    if matched {
        Some(ParsedCommand::new(CmdType::Info, vec![]))
    } else {
        None
    }
}

fn briefing(lowered: &str, tokens: &[&str]) -> Option<ParsedCommand> {
    let matched =
        tokens.contains(&"briefing") || lowered == "brief me" || lowered == "morning report";
    if matched {
        Some(ParsedCommand::new(CmdType::Briefing, vec![]))
    } else {
        None
    }
}

/// Build the rule table in priority order.
///
/// Greeting and launch intent come first: greetings must never pay
/// embedding/LLM latency, and "open obs" must resolve to launching the app
/// before the OBS keyword rule can see it.
pub fn rule_table() -> Vec<Rule> {
    vec![
        Rule { name: "greeting", priority: 10, apply: greeting },
        Rule { name: "launch_app", priority: 20, apply: launch_app },
        Rule { name: "git", priority: 30, apply: git },
        Rule { name: "obs_control", priority: 40, apply: obs_control },
        Rule { name: "health", priority: 50, apply: health },
        Rule { name: "capabilities", priority: 60, apply: capabilities },
        Rule { name: "model_info", priority: 70, apply: model_info },
        Rule { name: "unavailable", priority: 80, apply: unavailable },
        Rule { name: "tool_direct", priority: 90, apply: tool_direct },
        Rule { name: "tool_preflight", priority: 100, apply: tool_preflight },
        Rule { name: "info", priority: 110, apply: info },
        Rule { name: "briefing", priority: 120, apply: briefing },
    ]
}

/// Check the table invariants: unique names, strictly increasing priorities.
pub fn verify_rule_table(rules: &[Rule]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    let mut previous: Option<u8> = None;

    for rule in rules {
        if !seen.insert(rule.name) {
            return Err(CommandError::DuplicateRuleName(rule.name.to_string()));
        }
        if let Some(prev) = previous {
            if rule.priority <= prev {
                return Err(CommandError::PriorityOrder {
                    name: rule.name.to_string(),
                    priority: rule.priority,
                    previous: prev,
                });
            }
        }
        previous = Some(rule.priority);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_passes_invariant_check() {
        verify_rule_table(&rule_table()).unwrap();
    }

    #[test]
    fn unordered_table_is_rejected() {
        let rules = vec![
            Rule { name: "a", priority: 20, apply: greeting },
            Rule { name: "b", priority: 10, apply: greeting },
        ];
        assert!(matches!(
            verify_rule_table(&rules),
            Err(CommandError::PriorityOrder { .. })
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let rules = vec![
            Rule { name: "a", priority: 10, apply: greeting },
            Rule { name: "a", priority: 20, apply: greeting },
        ];
        assert!(matches!(
            verify_rule_table(&rules),
            Err(CommandError::DuplicateRuleName(_))
        ));
    }
}
