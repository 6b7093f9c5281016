//! Disorder-tolerant command parsing engine.
//!
//! This crate is the runtime half of the command-grammar system. Grammars
//! are declared with `command-grammar-core`; this crate matches token
//! streams against them:
//!
//! - [`token`] — quote-aware splitting and heterogeneous message flattening.
//! - [`CommandParser`] — a matching engine compiled from one grammar,
//!   tolerant of arbitrary option/subcommand/argument ordering, with
//!   `--help` interception and fuzzy failure diagnosis.
//! - [`MatchResult`] — the structured outcome: matched slots, options,
//!   subcommands, a flattened argument view, and failure diagnostics.
//! - [`behavior`] — the post-match pipeline: default injection, mutual
//!   exclusion, cooldown rate limiting, and custom transforms.
//! - [`CommandRegistry`] — the explicit context object owning compiled
//!   parsers, capacity limits, the message-result cache, shortcuts, fuzzy
//!   suggestions, paginated help, and broadcast matching.
//! - [`CommandStub`] — typed read-only views for downstream consumers.
//!
//! The engine performs no I/O and owns no event loop; callers feed it token
//! streams and receive results. Parsing is deterministic: the same grammar
//! and input always produce the same result.
//!
//! # Example
//!
//! ```
//! use command_grammar_core::{Args, Command, OptionSpec, SlotPattern};
//! use command_grammar_engine::{CommandRegistry, EngineConfig, ParseMode};
//!
//! let registry = CommandRegistry::new(EngineConfig::default());
//! let cmd = Command::builder("weather")
//!     .option(OptionSpec::new("--detail|-d").unwrap())
//!     .main_args(Args::builder().required("city", SlotPattern::Str).build().unwrap())
//!     .build()
//!     .unwrap();
//! let identity = registry.register(cmd).unwrap();
//!
//! // Option order does not matter.
//! let result = registry.parse(&identity, "weather -d london", ParseMode::Static).unwrap();
//! assert!(result.matched);
//! let result = registry.parse(&identity, "weather london -d", ParseMode::Static).unwrap();
//! assert!(result.matched);
//! assert!(result.options.contains_key("detail"));
//! ```

pub mod behavior;
pub mod cache;
mod config;
mod error;
mod parser;
mod registry;
mod result;
pub mod similar;
mod stub;
pub mod token;

pub use behavior::{BehaviorContext, DefaultTarget, MatchBehavior, cool_down, exclusion,
    run_behaviors, set_default};
pub use config::EngineConfig;
pub use error::{ParseError, RegistryError, Result};
pub use parser::{CommandParser, FuzzyOpts, parse_args};
pub use registry::{CommandRegistry, ParseMode, RegistryEntry};
pub use result::{ErrorInfo, FailureKind, MatchResult, OptionMatch, SubcommandMatch};
pub use stub::{ArgsStub, CommandStub, FromArgValue, OptionStub, StubError, SubcommandStub};
pub use token::{MessageInput, Segment, Unit};
