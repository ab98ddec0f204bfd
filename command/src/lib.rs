//! # Command parsing
//!
//! Pure, in-process command classification: raw text in, a
//! [`ParsedCommand`] out, via an ordered list of pattern rules.
//!
//! Rule ordering is a correctness property here, not an implementation
//! detail. Launch-intent rules run before domain keyword rules so
//! "open obs" launches the OBS application instead of being read as a
//! control command for a running instance, and the greeting fast-path runs
//! before everything that would cost an embedding or an LLM call. The
//! table's priorities are explicit and checked at construction time.

pub mod error;
pub mod parser;
pub mod rules;
pub mod types;

pub use error::{CommandError, Result};
pub use parser::CommandParser;
pub use types::{CmdType, Command, ParsedCommand};
