//! Core command-grammar model and shared interchange primitives.
//!
//! This crate defines the declarative half of the parsing engine:
//!
//! - [`Args`] / [`ArgSlot`] / [`SlotPattern`] / [`SlotKind`] — the argument
//!   constraint model: ordered, typed slots with defaults, choices, unions,
//!   regex exclusion, variadic and keyword capture.
//! - [`OptionSpec`] / [`SubcommandSpec`] / [`Sentence`] — command-tree nodes
//!   with aliases, requires paths, and per-node constraint models.
//! - [`Command`] — the grammar root: headers, name, components, main
//!   arguments, namespace, failure policy.
//! - [`CommandLayout`] / [`GrammarPackage`] — the serde interchange format
//!   for persisting grammars across process restarts.
//!
//! Validation ([`validate_command`], [`check_node_name`], and the builders'
//! own checks) raises every structural problem at construction time;
//! a `Command` value is always a well-formed grammar.
//!
//! The runtime half (tokenizer, disorder-tolerant parser, behavior
//! pipeline, registry) lives in the `command-grammar-engine` crate.
//!
//! # Example
//!
//! ```
//! use command_grammar_core::*;
//!
//! let cmd = Command::builder("weather")
//!     .header("/")
//!     .help_text("city weather lookup")
//!     .option(OptionSpec::new("--detail|-d").unwrap())
//!     .main_args(
//!         Args::builder()
//!             .required("city", SlotPattern::Str)
//!             .default("days", SlotPattern::Int, ArgValue::Int(1))
//!             .build()
//!             .unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(cmd.identity(), "main::weather");
//! assert!(cmd.find_option("-d").is_some());
//! assert!(validate_command(&cmd).is_empty());
//! ```

mod args;
mod command;
mod layout;
mod node;
mod validate;

pub use args::{ArgSlot, ArgValue, Args, ArgsBuilder, CustomCheck, SlotKind, SlotPattern};
pub use command::{
    Command, CommandBuilder, CommandComponent, DEFAULT_NAMESPACE, HeaderMatcher,
};
pub use layout::{
    ArgsLayout, CommandLayout, ComponentLayout, GrammarPackage, HeaderLayout, OptionLayout,
    PatternLayout, SlotLayout, SubcommandLayout,
};
pub use node::{DEFAULT_SEPARATORS, NodeAction, OptionSpec, Sentence, SubcommandSpec};
pub use validate::{GrammarError, check_node_name, validate_command, validate_subcommand};
