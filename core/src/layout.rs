//! Persisted grammar layout.
//!
//! The interchange format for saving and restoring command grammars across
//! process restarts. A [`CommandLayout`] is the structural record of one
//! command; a [`GrammarPackage`] bundles several with version metadata.
//!
//! Runtime attachments (action hooks, behaviors, custom validators) are not
//! part of the layout: converting a grammar whose slots use
//! [`SlotPattern::Custom`] fails with
//! [`GrammarError::UnserializableValidator`] instead of silently dropping a
//! constraint. The built-in `--help` option is excluded on save and
//! re-appended on restore.
//!
//! # Examples
//!
//! ```
//! use command_grammar_core::{Command, CommandLayout};
//!
//! let cmd = Command::builder("echo").build().unwrap();
//! let layout = cmd.to_layout().unwrap();
//! let restored = Command::from_layout(&layout).unwrap();
//! assert_eq!(restored.to_layout().unwrap(), layout);
//! ```

use serde::{Deserialize, Serialize};

use crate::args::{ArgSlot, ArgValue, Args, SlotKind, SlotPattern};
use crate::command::{Command, CommandComponent, HeaderMatcher};
use crate::node::{OptionSpec, SubcommandSpec};
use crate::validate::GrammarError;

/// Structural record of one slot pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternLayout {
    /// Verbatim string.
    Str,
    /// Integer literal.
    Int,
    /// Float literal.
    Float,
    /// Boolean literal.
    Bool,
    /// Any token.
    Any,
    /// Fixed literal set.
    Choice(Vec<String>),
    /// Ordered union of member patterns.
    Union(Vec<PatternLayout>),
    /// Full-match regex pattern text.
    Regex(String),
}

/// Structural record of one argument slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotLayout {
    /// Slot name.
    pub name: String,
    /// Accepted pattern.
    pub pattern: PatternLayout,
    /// Consumption modifier.
    pub kind: SlotKind,
    /// Default value, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ArgValue>,
}

/// Structural record of a constraint model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArgsLayout {
    /// Slots in declaration order.
    pub slots: Vec<SlotLayout>,
}

/// Structural record of one header matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderLayout {
    /// Literal prefix.
    Literal(String),
    /// Regex prefix (pattern text).
    Pattern(String),
    /// Element-kind header.
    Element {
        /// Kind tag.
        kind: String,
    },
    /// Element header paired with a literal suffix.
    ElementPair {
        /// Kind tag.
        kind: String,
        /// Paired suffix.
        suffix: String,
    },
}

/// Structural record of a top-level option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionLayout {
    /// Canonical name.
    pub name: String,
    /// All aliases (canonical included).
    pub aliases: Vec<String>,
    /// Literal prefix path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    /// Constraint model.
    #[serde(default)]
    pub args: ArgsLayout,
    /// Separator characters.
    pub separators: String,
    /// Help line.
    pub help_text: String,
    /// Resolution priority.
    #[serde(default)]
    pub priority: i32,
}

/// Structural record of a subcommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcommandLayout {
    /// Subcommand name.
    pub name: String,
    /// Literal prefix path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    /// Nested options.
    #[serde(default)]
    pub options: Vec<OptionLayout>,
    /// Constraint model.
    #[serde(default)]
    pub args: ArgsLayout,
    /// Separator characters.
    pub separators: String,
    /// Help line.
    pub help_text: String,
}

/// Tagged component record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ComponentLayout {
    /// An option record.
    Option(OptionLayout),
    /// A subcommand record.
    Subcommand(SubcommandLayout),
}

/// Structural record of one complete command grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandLayout {
    /// Invocation headers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderLayout>,
    /// Command name.
    pub command: String,
    /// Options and subcommands, built-in help excluded.
    #[serde(default)]
    pub options: Vec<ComponentLayout>,
    /// Main-argument constraints.
    #[serde(default)]
    pub main_args: ArgsLayout,
    /// Failure policy.
    #[serde(default)]
    pub raise_on_failure: bool,
    /// Separator characters.
    pub separators: String,
    /// Registry namespace.
    pub namespace: String,
    /// Help line.
    pub help_text: String,
}

/// Versioned bundle of command layouts for distribution or persistence.
///
/// # Examples
///
/// ```
/// use command_grammar_core::{Command, GrammarPackage};
///
/// let mut package = GrammarPackage::new("1.0.0");
/// let cmd = Command::builder("echo").build().unwrap();
/// package.commands.push(cmd.to_layout().unwrap());
/// assert_eq!(package.command_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarPackage {
    /// Package format version (semver string).
    pub version: String,
    /// ISO-8601 creation timestamp.
    pub generated_at: String,
    /// Bundled command layouts.
    pub commands: Vec<CommandLayout>,
}

impl GrammarPackage {
    /// Creates an empty package stamped with the current time.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            commands: Vec::new(),
        }
    }

    /// Number of bundled commands.
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

fn pattern_to_layout(pattern: &SlotPattern) -> Result<PatternLayout, GrammarError> {
    Ok(match pattern {
        SlotPattern::Str => PatternLayout::Str,
        SlotPattern::Int => PatternLayout::Int,
        SlotPattern::Float => PatternLayout::Float,
        SlotPattern::Bool => PatternLayout::Bool,
        SlotPattern::Any => PatternLayout::Any,
        SlotPattern::Choice(choices) => PatternLayout::Choice(choices.clone()),
        SlotPattern::Union(members) => PatternLayout::Union(
            members
                .iter()
                .map(pattern_to_layout)
                .collect::<Result<_, _>>()?,
        ),
        SlotPattern::Regex { raw, .. } => PatternLayout::Regex(raw.clone()),
        SlotPattern::Custom { name, .. } => {
            return Err(GrammarError::UnserializableValidator { name: name.clone() });
        }
    })
}

fn pattern_from_layout(layout: &PatternLayout) -> Result<SlotPattern, GrammarError> {
    Ok(match layout {
        PatternLayout::Str => SlotPattern::Str,
        PatternLayout::Int => SlotPattern::Int,
        PatternLayout::Float => SlotPattern::Float,
        PatternLayout::Bool => SlotPattern::Bool,
        PatternLayout::Any => SlotPattern::Any,
        PatternLayout::Choice(choices) => SlotPattern::Choice(choices.clone()),
        PatternLayout::Union(members) => SlotPattern::Union(
            members
                .iter()
                .map(pattern_from_layout)
                .collect::<Result<_, _>>()?,
        ),
        PatternLayout::Regex(raw) => SlotPattern::regex(raw)?,
    })
}

fn args_to_layout(args: &Args) -> Result<ArgsLayout, GrammarError> {
    let slots = args
        .iter()
        .map(|slot| {
            Ok(SlotLayout {
                name: slot.name.clone(),
                pattern: pattern_to_layout(&slot.pattern)?,
                kind: slot.kind,
                default: slot.default.clone(),
            })
        })
        .collect::<Result<_, GrammarError>>()?;
    Ok(ArgsLayout { slots })
}

fn args_from_layout(layout: &ArgsLayout) -> Result<Args, GrammarError> {
    let mut builder = Args::builder();
    for slot in &layout.slots {
        let mut built = ArgSlot::new(&slot.name, pattern_from_layout(&slot.pattern)?)
            .with_kind(slot.kind);
        if let Some(default) = &slot.default {
            built = built.with_default(default.clone());
        }
        builder = builder.slot(built);
    }
    builder.build()
}

fn option_to_layout(opt: &OptionSpec) -> Result<OptionLayout, GrammarError> {
    Ok(OptionLayout {
        name: opt.name.clone(),
        aliases: opt.aliases.clone(),
        requires: opt.requires.clone(),
        args: args_to_layout(&opt.args)?,
        separators: opt.separators.clone(),
        help_text: opt.help_text.clone(),
        priority: opt.priority,
    })
}

fn option_from_layout(layout: &OptionLayout) -> Result<OptionSpec, GrammarError> {
    let mut declaration = layout.requires.join(" ");
    if !declaration.is_empty() {
        declaration.push(' ');
    }
    declaration.push_str(&layout.aliases.join("|"));
    Ok(OptionSpec::new(&declaration)?
        .with_args(args_from_layout(&layout.args)?)
        .with_help(&layout.help_text)
        .with_priority(layout.priority)
        .separate(&layout.separators))
}

fn subcommand_to_layout(sub: &SubcommandSpec) -> Result<SubcommandLayout, GrammarError> {
    Ok(SubcommandLayout {
        name: sub.name.clone(),
        requires: sub.requires.clone(),
        options: sub
            .options
            .iter()
            .map(option_to_layout)
            .collect::<Result<_, _>>()?,
        args: args_to_layout(&sub.args)?,
        separators: sub.separators.clone(),
        help_text: sub.help_text.clone(),
    })
}

fn subcommand_from_layout(layout: &SubcommandLayout) -> Result<SubcommandSpec, GrammarError> {
    let mut declaration = layout.requires.join(" ");
    if !declaration.is_empty() {
        declaration.push(' ');
    }
    declaration.push_str(&layout.name);
    let mut sub = SubcommandSpec::new(&declaration)?
        .with_args(args_from_layout(&layout.args)?)
        .with_help(&layout.help_text)
        .separate(&layout.separators);
    for opt in &layout.options {
        sub = sub.with_option(option_from_layout(opt)?);
    }
    Ok(sub)
}

fn header_to_layout(header: &HeaderMatcher) -> HeaderLayout {
    match header {
        HeaderMatcher::Literal(text) => HeaderLayout::Literal(text.clone()),
        HeaderMatcher::Pattern { raw, .. } => HeaderLayout::Pattern(raw.clone()),
        HeaderMatcher::Element { kind } => HeaderLayout::Element { kind: kind.clone() },
        HeaderMatcher::ElementPair { kind, suffix } => HeaderLayout::ElementPair {
            kind: kind.clone(),
            suffix: suffix.clone(),
        },
    }
}

fn header_from_layout(layout: &HeaderLayout) -> Result<HeaderMatcher, GrammarError> {
    Ok(match layout {
        HeaderLayout::Literal(text) => HeaderMatcher::Literal(text.clone()),
        HeaderLayout::Pattern(raw) => HeaderMatcher::pattern(raw)?,
        HeaderLayout::Element { kind } => HeaderMatcher::Element { kind: kind.clone() },
        HeaderLayout::ElementPair { kind, suffix } => HeaderMatcher::ElementPair {
            kind: kind.clone(),
            suffix: suffix.clone(),
        },
    })
}

impl Command {
    /// Converts to the persisted structural record.
    ///
    /// # Errors
    ///
    /// [`GrammarError::UnserializableValidator`] when a slot uses a custom
    /// pattern.
    pub fn to_layout(&self) -> Result<CommandLayout, GrammarError> {
        let mut options = Vec::new();
        for component in &self.components {
            match component {
                // The built-in help option is re-appended on restore.
                CommandComponent::Option(opt) if opt.dest == "help" => {}
                CommandComponent::Option(opt) => {
                    options.push(ComponentLayout::Option(option_to_layout(opt)?));
                }
                CommandComponent::Subcommand(sub) => {
                    options.push(ComponentLayout::Subcommand(subcommand_to_layout(sub)?));
                }
            }
        }
        Ok(CommandLayout {
            headers: self.headers.iter().map(header_to_layout).collect(),
            command: self.name.clone(),
            options,
            main_args: args_to_layout(&self.main_args)?,
            raise_on_failure: self.raise_on_failure,
            separators: self.separators.clone(),
            namespace: self.namespace.clone(),
            help_text: self.help_text.clone(),
        })
    }

    /// Restores a command from its structural record.
    ///
    /// # Errors
    ///
    /// Any [`GrammarError`] the rebuilt grammar fails validation with.
    pub fn from_layout(layout: &CommandLayout) -> Result<Command, GrammarError> {
        let mut builder = Command::builder(&layout.command)
            .main_args(args_from_layout(&layout.main_args)?)
            .namespace(&layout.namespace)
            .separators(&layout.separators)
            .help_text(&layout.help_text)
            .raise_on_failure(layout.raise_on_failure);
        for header in &layout.headers {
            builder = builder.header_matcher(header_from_layout(header)?);
        }
        for component in &layout.options {
            builder = match component {
                ComponentLayout::Option(opt) => builder.option(option_from_layout(opt)?),
                ComponentLayout::Subcommand(sub) => {
                    builder.subcommand(subcommand_from_layout(sub)?)
                }
            };
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{ArgValue, SlotPattern};

    fn sample_command() -> Command {
        Command::builder("pip")
            .header("/")
            .help_text("package installer")
            .option(
                OptionSpec::new("--retries")
                    .unwrap()
                    .with_args(
                        Args::builder()
                            .required("count", SlotPattern::Int)
                            .build()
                            .unwrap(),
                    )
                    .with_help("retry count"),
            )
            .subcommand(
                SubcommandSpec::new("install")
                    .unwrap()
                    .with_option(OptionSpec::new("--upgrade|-U").unwrap())
                    .with_args(
                        Args::builder()
                            .required("pak", SlotPattern::Str)
                            .default("quiet", SlotPattern::Bool, ArgValue::Bool(false))
                            .build()
                            .unwrap(),
                    ),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_layout_round_trip() {
        let cmd = sample_command();
        let layout = cmd.to_layout().unwrap();
        let restored = Command::from_layout(&layout).unwrap();
        assert_eq!(restored.to_layout().unwrap(), layout);
    }

    #[test]
    fn test_layout_excludes_builtin_help() {
        let layout = sample_command().to_layout().unwrap();
        assert!(layout.options.iter().all(|c| match c {
            ComponentLayout::Option(opt) => opt.name != "--help",
            ComponentLayout::Subcommand(_) => true,
        }));
        // ...and restore re-appends it.
        let restored = Command::from_layout(&layout).unwrap();
        assert!(restored.find_option("--help").is_some());
    }

    #[test]
    fn test_layout_json_round_trip() {
        let layout = sample_command().to_layout().unwrap();
        let json = serde_json::to_string_pretty(&layout).unwrap();
        let back: CommandLayout = serde_json::from_str(&json).unwrap();
        assert_eq!(back, layout);
    }

    #[test]
    fn test_custom_pattern_does_not_serialize() {
        let cmd = Command::builder("cmd")
            .main_args(
                Args::builder()
                    .required(
                        "v",
                        SlotPattern::custom("hex", |t| {
                            i64::from_str_radix(t, 16).ok().map(ArgValue::Int)
                        }),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        assert!(matches!(
            cmd.to_layout(),
            Err(GrammarError::UnserializableValidator { .. })
        ));
    }

    #[test]
    fn test_package_carries_version_and_timestamp() {
        let package = GrammarPackage::new("1.0.0");
        assert_eq!(package.version, "1.0.0");
        assert!(!package.generated_at.is_empty());
        assert_eq!(package.command_count(), 0);
    }
}
