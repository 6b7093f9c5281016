//! Error types for the parsing engine.
//!
//! Parse-time mismatches ([`ParseError`]) describe user input that failed the
//! grammar; by default they are folded into a non-matched result rather than
//! raised. Registry operations ([`RegistryError`]) cover registration,
//! lookup, shortcut, and configuration failures.

use command_grammar_core::GrammarError;
use thiserror::Error;

/// Parse-time mismatch between input and grammar.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// No declared header matched the leading token.
    #[error("no header matched: {token}")]
    HeaderMismatch {
        /// Offending leading token.
        token: String,
        /// Fuzzy "did you mean" candidate, when enabled and above threshold.
        suggestion: Option<String>,
    },
    /// Body scanning could not place a token run.
    #[error("unknown token: {token}")]
    UnknownToken {
        /// Unplaceable token.
        token: String,
        /// Fuzzy candidate, when available.
        suggestion: Option<String>,
    },
    /// A required slot rejected its token.
    #[error("slot {slot} rejected token {token}")]
    SlotMismatch {
        /// Slot name.
        slot: String,
        /// Offending token.
        token: String,
    },
    /// Input ended before a required slot was filled.
    #[error("missing required argument: {slot}")]
    MissingArgument {
        /// Unfilled slot name.
        slot: String,
    },
    /// A component's requires path was not satisfied.
    #[error("component {name} requires preceding tokens {path}")]
    RequiresUnsatisfied {
        /// Component name.
        name: String,
        /// Expected literal path, space-joined.
        path: String,
    },
}

impl ParseError {
    /// The fuzzy suggestion carried by this error, if any.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            ParseError::HeaderMismatch { suggestion, .. }
            | ParseError::UnknownToken { suggestion, .. } => suggestion.as_deref(),
            _ => None,
        }
    }
}

/// Registry operation failure.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The live-command count would exceed the configured maximum.
    #[error("command capacity exceeded: max {max}")]
    CapacityExceeded {
        /// Configured maximum.
        max: usize,
    },
    /// A command with the same identity is already registered.
    #[error("duplicate command: {identity}")]
    DuplicateCommand {
        /// Conflicting identity.
        identity: String,
    },
    /// No command registered under the identity.
    #[error("unknown command: {identity}")]
    UnknownCommand {
        /// Requested identity.
        identity: String,
        /// Closest registered identity, when above threshold.
        suggestion: Option<String>,
    },
    /// No shortcut registered under the key.
    #[error("unknown shortcut: {key}")]
    UnknownShortcut {
        /// Requested key.
        key: String,
    },
    /// Grammar construction failed during restore or registration.
    #[error("grammar error: {0}")]
    Grammar(#[from] GrammarError),
    /// A parse failed while the command's failure policy raises.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// A parse did not match while the command's failure policy raises.
    #[error("command did not match: {0}")]
    Unmatched(crate::result::ErrorInfo),
    /// Configuration file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be parsed or serialized.
    #[error("config error: {0}")]
    Config(#[from] serde_yaml::Error),
}

/// Convenience alias for registry results.
pub type Result<T> = std::result::Result<T, RegistryError>;
