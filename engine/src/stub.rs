//! Typed read-only views over a match result.
//!
//! A stub binds one command grammar to one [`MatchResult`] and exposes
//! ergonomic accessors for downstream consumers: option and subcommand
//! presence, and arguments converted to concrete Rust types. A missing
//! name and a present-but-differently-typed value are distinct conditions
//! ([`StubError::NotFound`] vs [`StubError::TypeMismatch`]). Stubs never
//! mutate the bound result.

use std::collections::BTreeMap;
use std::sync::Arc;

use command_grammar_core::{ArgValue, Args, Command};
use thiserror::Error;

use crate::result::{MatchResult, OptionMatch, SubcommandMatch};

/// Stub access failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StubError {
    /// No stub target has been bound yet.
    #[error("no result bound to stub")]
    Unbound,
    /// The requested name exists nowhere in the bound result.
    #[error("not found: {0}")]
    NotFound(String),
    /// The value exists but does not convert to the requested type.
    #[error("type mismatch for {name}: expected {expected}")]
    TypeMismatch {
        /// Requested name.
        name: String,
        /// Expected type label.
        expected: &'static str,
    },
}

/// Conversion from an [`ArgValue`] into a concrete type.
pub trait FromArgValue: Sized {
    /// Type label used in mismatch diagnostics.
    const EXPECTED: &'static str;

    /// Attempts the conversion.
    fn from_arg_value(value: &ArgValue) -> Option<Self>;
}

impl FromArgValue for String {
    const EXPECTED: &'static str = "str";
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        value.as_str().map(String::from)
    }
}

impl FromArgValue for i64 {
    const EXPECTED: &'static str = "int";
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        value.as_int()
    }
}

impl FromArgValue for f64 {
    const EXPECTED: &'static str = "float";
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        value.as_float()
    }
}

impl FromArgValue for bool {
    const EXPECTED: &'static str = "bool";
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromArgValue for Vec<ArgValue> {
    const EXPECTED: &'static str = "list";
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::List(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl FromArgValue for BTreeMap<String, ArgValue> {
    const EXPECTED: &'static str = "map";
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Map(map) => Some(map.clone()),
            _ => None,
        }
    }
}

impl FromArgValue for ArgValue {
    const EXPECTED: &'static str = "value";
    fn from_arg_value(value: &ArgValue) -> Option<Self> {
        Some(value.clone())
    }
}

fn convert<T: FromArgValue>(name: &str, value: &ArgValue) -> Result<T, StubError> {
    T::from_arg_value(value).ok_or_else(|| StubError::TypeMismatch {
        name: name.to_string(),
        expected: T::EXPECTED,
    })
}

/// Typed view over one option's match.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionStub {
    /// Option dest key.
    pub dest: String,
    /// Matched value.
    pub value: ArgValue,
    args: BTreeMap<String, ArgValue>,
}

impl OptionStub {
    fn new(dest: &str, matched: &OptionMatch) -> Self {
        Self {
            dest: dest.to_string(),
            value: matched.value.clone(),
            args: matched.args.clone(),
        }
    }

    /// Typed access to one of the option's arguments.
    pub fn arg<T: FromArgValue>(&self, name: &str) -> Result<T, StubError> {
        let value = self
            .args
            .get(name)
            .ok_or_else(|| StubError::NotFound(name.to_string()))?;
        convert(name, value)
    }
}

/// Typed view over one subcommand's match.
#[derive(Debug, Clone, PartialEq)]
pub struct SubcommandStub {
    /// Subcommand dest key.
    pub dest: String,
    /// Matched value.
    pub value: ArgValue,
    args: BTreeMap<String, ArgValue>,
    options: BTreeMap<String, OptionMatch>,
}

impl SubcommandStub {
    fn new(dest: &str, matched: &SubcommandMatch) -> Self {
        Self {
            dest: dest.to_string(),
            value: matched.value.clone(),
            args: matched.args.clone(),
            options: matched.options.clone(),
        }
    }

    /// Typed access to one of the subcommand's arguments.
    pub fn arg<T: FromArgValue>(&self, name: &str) -> Result<T, StubError> {
        let value = self
            .args
            .get(name)
            .ok_or_else(|| StubError::NotFound(name.to_string()))?;
        convert(name, value)
    }

    /// View over one of the subcommand's matched options.
    pub fn option(&self, dest: &str) -> Result<OptionStub, StubError> {
        self.options
            .get(dest)
            .map(|matched| OptionStub::new(dest, matched))
            .ok_or_else(|| StubError::NotFound(dest.to_string()))
    }
}

/// Typed view over a bare constraint model's matched values.
#[derive(Debug, Clone, Default)]
pub struct ArgsStub {
    args: Args,
    values: BTreeMap<String, ArgValue>,
}

impl ArgsStub {
    /// Creates a stub for a constraint model.
    pub fn new(args: Args) -> Self {
        Self {
            args,
            values: BTreeMap::new(),
        }
    }

    /// Binds matched values.
    pub fn set_result(&mut self, values: BTreeMap<String, ArgValue>) -> &mut Self {
        self.values = values;
        self
    }

    /// Typed access to a slot value; the slot must be declared.
    pub fn get<T: FromArgValue>(&self, name: &str) -> Result<T, StubError> {
        if self.args.get(name).is_none() {
            return Err(StubError::NotFound(name.to_string()));
        }
        let value = self
            .values
            .get(name)
            .ok_or_else(|| StubError::NotFound(name.to_string()))?;
        convert(name, value)
    }
}

/// Typed façade bound to one command and one result.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use command_grammar_core::{Args, Command, OptionSpec, SlotPattern};
/// use command_grammar_engine::{CommandParser, CommandStub};
///
/// let cmd = Arc::new(
///     Command::builder("cmd")
///         .option(OptionSpec::new("foo").unwrap())
///         .main_args(Args::builder().required("bar", SlotPattern::Int).build().unwrap())
///         .build()
///         .unwrap(),
/// );
/// let result = CommandParser::compile(cmd.clone()).parse_line("cmd foo 1");
///
/// let mut stub = CommandStub::new(cmd);
/// stub.set_target(&result);
/// assert!(stub.option("foo").is_ok());
/// assert_eq!(stub.arg::<i64>("bar").unwrap(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CommandStub {
    command: Arc<Command>,
    result: Option<MatchResult>,
}

impl CommandStub {
    /// Creates an unbound stub for a command.
    pub fn new(command: Arc<Command>) -> Self {
        Self {
            command,
            result: None,
        }
    }

    /// Binds a result; accessors read from this snapshot.
    pub fn set_target(&mut self, result: &MatchResult) -> &mut Self {
        self.result = Some(result.clone());
        self
    }

    /// `true` once a result is bound.
    pub fn bound(&self) -> bool {
        self.result.is_some()
    }

    /// `true` when the bound result matched.
    pub fn matched(&self) -> bool {
        self.result.as_ref().is_some_and(|r| r.matched)
    }

    fn target(&self) -> Result<&MatchResult, StubError> {
        self.result.as_ref().ok_or(StubError::Unbound)
    }

    /// View over a matched option, addressed by name, alias, or dest.
    pub fn option(&self, name: &str) -> Result<OptionStub, StubError> {
        let result = self.target()?;
        let dest = self
            .command
            .find_option(name)
            .map(|opt| opt.dest.clone())
            .unwrap_or_else(|| name.to_string());
        result
            .options
            .get(&dest)
            .map(|matched| OptionStub::new(&dest, matched))
            .ok_or(StubError::NotFound(dest))
    }

    /// View over a matched subcommand.
    pub fn subcommand(&self, name: &str) -> Result<SubcommandStub, StubError> {
        let result = self.target()?;
        let dest = self
            .command
            .find_subcommand(name)
            .map(|sub| sub.dest.clone())
            .unwrap_or_else(|| name.to_string());
        result
            .subcommands
            .get(&dest)
            .map(|matched| SubcommandStub::new(&dest, matched))
            .ok_or(StubError::NotFound(dest))
    }

    /// Typed access to any argument across the whole tree.
    pub fn arg<T: FromArgValue>(&self, name: &str) -> Result<T, StubError> {
        let result = self.target()?;
        let value = result
            .get(name)
            .ok_or_else(|| StubError::NotFound(name.to_string()))?;
        convert(name, value)
    }
}
