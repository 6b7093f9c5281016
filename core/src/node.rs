//! Command-tree node definitions.
//!
//! Nodes share a common field set (name, requires path, argument
//! constraints, separators, help text, and a stable `dest` key) carried by
//! each struct. [`OptionSpec`] adds aliases and a resolution priority,
//! [`SubcommandSpec`] adds nested options and its own constraint model, and
//! [`Sentence`] is the minimal literal-token node used for keyword routing.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::args::{Args, ArgValue};
use crate::validate::{GrammarError, check_node_name};

/// Callback invoked with a node's matched arguments after a successful match.
///
/// Actions may rewrite the argument map in place. They are runtime
/// attachments and are not part of the serializable grammar.
pub type NodeAction = Arc<dyn Fn(&mut BTreeMap<String, ArgValue>) + Send + Sync>;

/// Default separator set (a single space).
pub const DEFAULT_SEPARATORS: &str = " ";

fn split_name(raw: &str) -> (Vec<String>, String) {
    let mut parts: Vec<String> = raw.split(' ').filter(|p| !p.is_empty()).map(String::from).collect();
    let name = parts.pop().unwrap_or_default();
    (parts, name)
}

fn compute_dest(requires: &[String], name: &str) -> String {
    let mut dest = String::new();
    for part in requires {
        dest.push_str(part);
        dest.push('_');
    }
    dest.push_str(name);
    dest.trim_start_matches('-').to_string()
}

/// A command option.
///
/// Carries a non-empty alias set; the first alias is canonical and aliases
/// are kept longest-first so greedy matching prefers the most specific
/// surface form. `"name|alias"` syntax in the constructor declares aliases
/// inline, and leading space-separated words become the `requires` path.
///
/// # Examples
///
/// ```
/// use command_grammar_core::OptionSpec;
///
/// let opt = OptionSpec::new("--verbose|-v").unwrap();
/// assert_eq!(opt.name, "--verbose");
/// assert!(opt.matches("-v"));
/// assert_eq!(opt.dest, "verbose");
///
/// let scoped = OptionSpec::new("remote add").unwrap();
/// assert_eq!(scoped.requires, vec!["remote".to_string()]);
/// assert_eq!(scoped.dest, "remote_add");
/// ```
#[derive(Clone)]
pub struct OptionSpec {
    /// Canonical surface form (the longest alias).
    pub name: String,
    /// All surface forms, canonical first, then longest-first.
    pub aliases: Vec<String>,
    /// Literal tokens that must precede this option.
    pub requires: Vec<String>,
    /// Argument constraints.
    pub args: Args,
    /// Token-boundary characters; empty means compact (prefix) matching.
    pub separators: String,
    /// One-line help.
    pub help_text: String,
    /// Resolution priority for ambiguous compact matches (higher wins).
    pub priority: i32,
    /// Stable lookup key: requires path + name, leading dashes stripped.
    pub dest: String,
    /// Optional post-match hook.
    pub action: Option<NodeAction>,
}

impl OptionSpec {
    /// Creates an option from a `"requires... name|alias|..."` declaration.
    ///
    /// # Errors
    ///
    /// [`GrammarError::EmptyNodeName`] / [`GrammarError::InvalidNodeName`]
    /// when the name part is malformed.
    pub fn new(declaration: &str) -> Result<Self, GrammarError> {
        let (requires, name_part) = split_name(declaration);
        let mut aliases: Vec<String> = name_part
            .split('|')
            .filter(|a| !a.is_empty())
            .map(String::from)
            .collect();
        if aliases.is_empty() {
            return Err(GrammarError::EmptyNodeName);
        }
        aliases.sort_by(|a, b| b.len().cmp(&a.len()));
        let name = aliases[0].clone();
        check_node_name(&name)?;
        let dest = compute_dest(&requires, &name);
        Ok(Self {
            help_text: dest.clone(),
            name,
            aliases,
            requires,
            args: Args::empty(),
            separators: DEFAULT_SEPARATORS.to_string(),
            priority: 0,
            dest,
            action: None,
        })
    }

    /// Adds one more alias (kept longest-first behind the canonical form).
    pub fn with_alias(mut self, alias: &str) -> Self {
        if !self.aliases.iter().any(|a| a == alias) {
            self.aliases.push(alias.to_string());
            self.aliases[1..].sort_by(|a, b| b.len().cmp(&a.len()));
        }
        self
    }

    /// Sets the argument constraints.
    pub fn with_args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    /// Sets the help line.
    pub fn with_help(mut self, help_text: &str) -> Self {
        self.help_text = help_text.to_string();
        self
    }

    /// Sets the resolution priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Replaces the separator set; an empty string enables compact matching.
    pub fn separate(mut self, separators: &str) -> Self {
        self.separators = separators.to_string();
        self
    }

    /// Attaches a post-match action hook.
    pub fn with_action(
        mut self,
        action: impl Fn(&mut BTreeMap<String, ArgValue>) + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    /// `true` when `token` equals any alias.
    pub fn matches(&self, token: &str) -> bool {
        self.aliases.iter().any(|a| a == token)
    }

    /// `true` when this option matches with no token boundary.
    pub fn is_compact(&self) -> bool {
        self.separators.is_empty()
    }

    /// One-line help summary.
    pub fn summary(&self) -> String {
        let aliases = self.aliases.join("|");
        if self.args.is_empty() {
            format!("{aliases}: {}", self.help_text)
        } else {
            format!("{aliases} {}: {}", self.args.summary(), self.help_text)
        }
    }
}

impl fmt::Debug for OptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionSpec")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("requires", &self.requires)
            .field("args", &self.args)
            .field("dest", &self.dest)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// A nested subcommand.
///
/// Matches with the same disorder-tolerant algorithm as the root command,
/// scoped to its own option set and constraint model.
///
/// # Examples
///
/// ```
/// use command_grammar_core::{Args, OptionSpec, SlotPattern, SubcommandSpec};
///
/// let sub = SubcommandSpec::new("install").unwrap()
///     .with_option(OptionSpec::new("--upgrade|-U").unwrap())
///     .with_args(Args::builder().required("pak", SlotPattern::Str).build().unwrap());
/// assert_eq!(sub.positional_range(), (1, Some(1)));
/// ```
#[derive(Clone)]
pub struct SubcommandSpec {
    /// Subcommand name.
    pub name: String,
    /// Literal tokens that must precede this subcommand.
    pub requires: Vec<String>,
    /// Options scoped to this subcommand.
    pub options: Vec<OptionSpec>,
    /// The subcommand's own constraint model.
    pub args: Args,
    /// Token-boundary characters.
    pub separators: String,
    /// One-line help.
    pub help_text: String,
    /// Stable lookup key.
    pub dest: String,
    /// Optional post-match hook.
    pub action: Option<NodeAction>,
}

impl SubcommandSpec {
    /// Creates a subcommand from a `"requires... name"` declaration.
    ///
    /// # Errors
    ///
    /// [`GrammarError::EmptyNodeName`] / [`GrammarError::InvalidNodeName`].
    pub fn new(declaration: &str) -> Result<Self, GrammarError> {
        let (requires, name) = split_name(declaration);
        check_node_name(&name)?;
        let dest = compute_dest(&requires, &name);
        Ok(Self {
            help_text: dest.clone(),
            name,
            requires,
            options: Vec::new(),
            args: Args::empty(),
            separators: DEFAULT_SEPARATORS.to_string(),
            dest,
            action: None,
        })
    }

    /// Adds a nested option.
    pub fn with_option(mut self, option: OptionSpec) -> Self {
        self.options.push(option);
        self
    }

    /// Sets the constraint model.
    pub fn with_args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    /// Sets the help line.
    pub fn with_help(mut self, help_text: &str) -> Self {
        self.help_text = help_text.to_string();
        self
    }

    /// Replaces the separator set.
    pub fn separate(mut self, separators: &str) -> Self {
        self.separators = separators.to_string();
        self
    }

    /// Attaches a post-match action hook.
    pub fn with_action(
        mut self,
        action: impl Fn(&mut BTreeMap<String, ArgValue>) + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    /// Finds a nested option by alias.
    pub fn find_option(&self, token: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.matches(token))
    }

    /// Range of positional tokens this subcommand's own model accepts.
    pub fn positional_range(&self) -> (usize, Option<usize>) {
        self.args.positional_range()
    }

    /// One-line help summary.
    pub fn summary(&self) -> String {
        if self.args.is_empty() {
            format!("{}: {}", self.name, self.help_text)
        } else {
            format!("{} {}: {}", self.name, self.args.summary(), self.help_text)
        }
    }
}

impl fmt::Debug for SubcommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubcommandSpec")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("options", &self.options)
            .field("args", &self.args)
            .field("dest", &self.dest)
            .finish_non_exhaustive()
    }
}

/// A bare literal token requirement with no arguments.
///
/// The minimal command-tree node; literal `requires` paths are matched as
/// sentences during body scanning.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    /// Literal token.
    pub name: String,
    /// Token-boundary characters.
    pub separators: String,
}

impl Sentence {
    /// Creates a sentence node.
    ///
    /// # Errors
    ///
    /// [`GrammarError::EmptyNodeName`] / [`GrammarError::InvalidNodeName`].
    pub fn new(name: &str) -> Result<Self, GrammarError> {
        check_node_name(name)?;
        Ok(Self {
            name: name.to_string(),
            separators: DEFAULT_SEPARATORS.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::SlotPattern;

    #[test]
    fn test_alias_declaration_longest_first() {
        let opt = OptionSpec::new("foo|f|fo").unwrap();
        assert_eq!(opt.name, "foo");
        assert_eq!(opt.aliases, vec!["foo", "fo", "f"]);
    }

    #[test]
    fn test_dest_strips_leading_dashes() {
        let opt = OptionSpec::new("--help|-h").unwrap();
        assert_eq!(opt.dest, "help");
        assert_eq!(opt.name, "--help");
    }

    #[test]
    fn test_requires_from_leading_words() {
        let opt = OptionSpec::new("remote add --track").unwrap();
        assert_eq!(opt.requires, vec!["remote", "add"]);
        assert_eq!(opt.dest, "remote_add_--track");
    }

    #[test]
    fn test_reserved_name_rejected() {
        assert!(OptionSpec::new("!bad").is_err());
        assert!(SubcommandSpec::new("?bad").is_err());
        assert!(Sentence::new("#bad").is_err());
    }

    #[test]
    fn test_subcommand_positional_range_tracks_args() {
        let sub = SubcommandSpec::new("sub").unwrap().with_args(
            Args::builder()
                .required("a", SlotPattern::Int)
                .optional("b", SlotPattern::Str)
                .build()
                .unwrap(),
        );
        assert_eq!(sub.positional_range(), (1, Some(2)));
    }
}
