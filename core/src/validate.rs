//! Grammar construction validation.
//!
//! Validates structural invariants of command grammars (node names, alias
//! uniqueness, slot ordering) before a grammar is ever handed to the engine.
//! Every error here is a construction-time programming error; parse-time
//! input problems are a different category entirely and never surface as a
//! [`GrammarError`].
//!
//! # Examples
//!
//! ```
//! use command_grammar_core::{Command, OptionSpec, validate_command};
//!
//! let cmd = Command::builder("deploy")
//!     .option(OptionSpec::new("--target").unwrap())
//!     .build()
//!     .unwrap();
//! assert!(validate_command(&cmd).is_empty());
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::command::{Command, CommandComponent};
use crate::node::{OptionSpec, SubcommandSpec};

/// Grammar construction errors.
///
/// Raised when a grammar is declared, never during parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GrammarError {
    /// Node or slot name is empty.
    #[error("node name cannot be empty")]
    EmptyNodeName,
    /// Node name begins with a reserved symbol character.
    #[error("invalid node name: {0}")]
    InvalidNodeName(String),
    /// A required slot follows an optional/defaulted slot without a keyword
    /// or variadic separator.
    #[error("required slot {name} cannot follow an optional slot")]
    RequiredAfterOptional {
        /// Offending slot name.
        name: String,
    },
    /// Two slots in one constraint model share a name.
    #[error("duplicate slot name: {name}")]
    DuplicateSlot {
        /// Duplicated name.
        name: String,
    },
    /// More than one variadic-positional slot declared.
    #[error("constraint model allows at most one variadic slot")]
    MultipleVariadic,
    /// More than one variadic-keyword slot declared.
    #[error("constraint model allows at most one keyword-variadic slot")]
    MultipleKeywordVariadic,
    /// Regex pattern failed to compile.
    #[error("invalid regex pattern {pattern}: {reason}")]
    InvalidRegex {
        /// Pattern text.
        pattern: String,
        /// Compiler message.
        reason: String,
    },
    /// Two options in one scope share an alias.
    #[error("duplicate alias in scope: {alias}")]
    DuplicateAlias {
        /// Duplicated surface form.
        alias: String,
    },
    /// Two subcommands in one scope share a name.
    #[error("duplicate subcommand in scope: {name}")]
    DuplicateSubcommand {
        /// Duplicated name.
        name: String,
    },
    /// A command declares neither headers nor a name.
    #[error("command must declare a name or at least one header")]
    MissingNameAndHeaders,
    /// A custom validator cannot be carried by the interchange layout.
    #[error("custom pattern {name} cannot be serialized")]
    UnserializableValidator {
        /// Custom pattern name.
        name: String,
    },
}

// Leading symbols reserved for headers and option prefixes; '-' stays legal
// so option names like "--help" validate.
static RESERVED_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r##"^[`~?/.,<>;':"|!@#$%^&*()_+=\[\]{}]"##).expect("static regex must compile")
});

/// Checks a node name: non-empty and not starting with a reserved symbol.
///
/// # Errors
///
/// [`GrammarError::EmptyNodeName`] or [`GrammarError::InvalidNodeName`].
pub fn check_node_name(name: &str) -> Result<(), GrammarError> {
    if name.trim().is_empty() {
        return Err(GrammarError::EmptyNodeName);
    }
    if RESERVED_PREFIX.is_match(name) {
        return Err(GrammarError::InvalidNodeName(name.to_string()));
    }
    Ok(())
}

/// Validates a full command grammar.
///
/// Checks the header/name presence invariant, alias uniqueness across the
/// top-level scope, and each subcommand's own scope.
pub fn validate_command(command: &Command) -> Vec<GrammarError> {
    let mut errors = Vec::new();

    if command.name.is_empty() && command.headers.is_empty() {
        errors.push(GrammarError::MissingNameAndHeaders);
        return errors;
    }

    let mut options = Vec::new();
    let mut subcommands = Vec::new();
    for component in &command.components {
        match component {
            CommandComponent::Option(opt) => options.push(opt),
            CommandComponent::Subcommand(sub) => subcommands.push(sub),
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    errors.extend(validate_option_scope(&options, &mut seen));
    if !errors.is_empty() {
        return errors;
    }

    for sub in subcommands {
        if !seen.insert(sub.name.as_str()) {
            errors.push(GrammarError::DuplicateSubcommand {
                name: sub.name.clone(),
            });
            return errors;
        }
        let nested: Vec<&OptionSpec> = sub.options.iter().collect();
        let mut nested_seen: HashSet<&str> = HashSet::new();
        errors.extend(validate_option_scope(&nested, &mut nested_seen));
        if !errors.is_empty() {
            return errors;
        }
    }

    errors
}

/// Validates one subcommand in isolation (used by layout restore).
pub fn validate_subcommand(sub: &SubcommandSpec) -> Vec<GrammarError> {
    let nested: Vec<&OptionSpec> = sub.options.iter().collect();
    let mut seen: HashSet<&str> = HashSet::new();
    validate_option_scope(&nested, &mut seen)
}

fn validate_option_scope<'a>(
    options: &[&'a OptionSpec],
    seen: &mut HashSet<&'a str>,
) -> Vec<GrammarError> {
    let mut errors = Vec::new();
    for opt in options {
        for alias in &opt.aliases {
            if !seen.insert(alias.as_str()) {
                errors.push(GrammarError::DuplicateAlias {
                    alias: alias.clone(),
                });
                return errors;
            }
        }
    }
    errors
}
