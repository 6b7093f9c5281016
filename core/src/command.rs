//! Root command definition.
//!
//! A [`Command`] is the root of a grammar tree: invocation headers, a name,
//! top-level options and subcommands, a main-argument constraint model, and
//! registry metadata (namespace, failure policy). Commands are built through
//! [`CommandBuilder`], which appends the built-in `--help|-h` option and runs
//! full grammar validation, so a constructed `Command` is always well formed.

use std::fmt;

use regex::Regex;

use crate::args::Args;
use crate::node::{DEFAULT_SEPARATORS, OptionSpec, SubcommandSpec};
use crate::validate::{GrammarError, validate_command};

/// Invocation prefix a command line must begin with.
///
/// Distinct from the command name: a header is the bot-call symbol, mention,
/// or other prefix that precedes (or carries) the name.
#[derive(Clone)]
pub enum HeaderMatcher {
    /// Literal text prefix, concatenated with the command name.
    Literal(String),
    /// Regex prefix; the token's remainder after stripping the command name
    /// must fully match.
    Pattern {
        /// Pattern text as declared.
        raw: String,
        /// Anchored compiled form.
        compiled: Regex,
    },
    /// A non-text message element of the given kind (mention, image, ...).
    Element {
        /// Element kind tag.
        kind: String,
    },
    /// A non-text element followed by a literal suffix token.
    ElementPair {
        /// Element kind tag.
        kind: String,
        /// Literal paired suffix.
        suffix: String,
    },
}

impl HeaderMatcher {
    /// Compiles a regex header.
    ///
    /// # Errors
    ///
    /// [`GrammarError::InvalidRegex`] when the pattern does not compile.
    pub fn pattern(pattern: &str) -> Result<Self, GrammarError> {
        let compiled = Regex::new(&format!("^(?:{pattern})$")).map_err(|err| {
            GrammarError::InvalidRegex {
                pattern: pattern.to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(HeaderMatcher::Pattern {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Display form used in identities and help output.
    pub fn display(&self) -> String {
        match self {
            HeaderMatcher::Literal(text) => text.clone(),
            HeaderMatcher::Pattern { raw, .. } => format!("/{raw}/"),
            HeaderMatcher::Element { kind } => format!("<{kind}>"),
            HeaderMatcher::ElementPair { kind, suffix } => format!("<{kind}>{suffix}"),
        }
    }
}

impl fmt::Debug for HeaderMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeaderMatcher({})", self.display())
    }
}

impl PartialEq for HeaderMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HeaderMatcher::Literal(a), HeaderMatcher::Literal(b)) => a == b,
            (HeaderMatcher::Pattern { raw: a, .. }, HeaderMatcher::Pattern { raw: b, .. }) => {
                a == b
            }
            (HeaderMatcher::Element { kind: a }, HeaderMatcher::Element { kind: b }) => a == b,
            (
                HeaderMatcher::ElementPair { kind: a, suffix: sa },
                HeaderMatcher::ElementPair { kind: b, suffix: sb },
            ) => a == b && sa == sb,
            _ => false,
        }
    }
}

/// A top-level grammar component.
#[derive(Debug, Clone)]
pub enum CommandComponent {
    /// A plain option.
    Option(OptionSpec),
    /// A nested subcommand.
    Subcommand(SubcommandSpec),
}

impl CommandComponent {
    /// Component name.
    pub fn name(&self) -> &str {
        match self {
            CommandComponent::Option(opt) => &opt.name,
            CommandComponent::Subcommand(sub) => &sub.name,
        }
    }

    /// Component lookup key.
    pub fn dest(&self) -> &str {
        match self {
            CommandComponent::Option(opt) => &opt.dest,
            CommandComponent::Subcommand(sub) => &sub.dest,
        }
    }

    /// One-line help summary.
    pub fn summary(&self) -> String {
        match self {
            CommandComponent::Option(opt) => opt.summary(),
            CommandComponent::Subcommand(sub) => sub.summary(),
        }
    }
}

/// A complete command grammar.
///
/// Invariant: at least one of `headers`/`name` is non-empty, and the
/// built-in `--help|-h` option is always present.
///
/// # Examples
///
/// ```
/// use command_grammar_core::{Args, Command, OptionSpec, SlotPattern};
///
/// let cmd = Command::builder("/pip")
///     .help_text("package installer")
///     .option(OptionSpec::new("--retries").unwrap().with_args(
///         Args::builder().required("count", SlotPattern::Int).build().unwrap(),
///     ))
///     .build()
///     .unwrap();
///
/// assert_eq!(cmd.identity(), "main::/pip");
/// assert!(cmd.find_option("--help").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct Command {
    /// Alternative invocation prefixes.
    pub headers: Vec<HeaderMatcher>,
    /// Command name; may be empty when headers alone identify the command.
    pub name: String,
    /// Top-level options and subcommands (help option included).
    pub components: Vec<CommandComponent>,
    /// Main-argument constraints.
    pub main_args: Args,
    /// Registry grouping key.
    pub namespace: String,
    /// Token-boundary characters.
    pub separators: String,
    /// Help line.
    pub help_text: String,
    /// `true` surfaces parse failures as errors instead of failure results.
    pub raise_on_failure: bool,
}

/// Namespace used when none is declared.
pub const DEFAULT_NAMESPACE: &str = "main";

impl Command {
    /// Starts a builder for a named command.
    pub fn builder(name: &str) -> CommandBuilder {
        CommandBuilder {
            name: name.to_string(),
            ..CommandBuilder::default()
        }
    }

    /// Starts a builder for a header-only command.
    pub fn header_only(header: HeaderMatcher) -> CommandBuilder {
        CommandBuilder {
            headers: vec![header],
            ..CommandBuilder::default()
        }
    }

    /// The name used in identities: the command name, or the first header's
    /// display form when the name is empty.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.headers
                .first()
                .map(HeaderMatcher::display)
                .unwrap_or_default()
        } else {
            self.name.clone()
        }
    }

    /// Stable registry identity: `"{namespace}::{display_name}"`.
    ///
    /// Computed from construction-time fields only; never derived from
    /// mutable structural state.
    pub fn identity(&self) -> String {
        format!("{}::{}", self.namespace, self.display_name())
    }

    /// Literal first-token forms that can invoke this command
    /// (`header + name` per text header, or the bare name).
    ///
    /// Used by registries for bare-name resolution and fuzzy suggestions;
    /// pattern and element headers contribute no literal form.
    pub fn invocation_forms(&self) -> Vec<String> {
        if self.headers.is_empty() {
            return vec![self.name.clone()];
        }
        let mut forms = Vec::new();
        for header in &self.headers {
            if let HeaderMatcher::Literal(text) = header {
                forms.push(format!("{text}{}", self.name));
            }
        }
        if forms.is_empty() {
            forms.push(self.display_name());
        }
        forms
    }

    /// Finds a top-level option by alias.
    pub fn find_option(&self, token: &str) -> Option<&OptionSpec> {
        self.components.iter().find_map(|c| match c {
            CommandComponent::Option(opt) if opt.matches(token) => Some(opt),
            _ => None,
        })
    }

    /// Finds a subcommand by name.
    pub fn find_subcommand(&self, name: &str) -> Option<&SubcommandSpec> {
        self.components.iter().find_map(|c| match c {
            CommandComponent::Subcommand(sub) if sub.name == name => Some(sub),
            _ => None,
        })
    }

    /// One-line summary used by registry listings.
    pub fn help_summary(&self) -> String {
        format!("{} : {}", self.display_name(), self.help_text)
    }

    /// Plain-text help: usage line plus component summaries.
    pub fn render_help(&self) -> String {
        let mut out = String::new();
        let headers: Vec<String> = self
            .headers
            .iter()
            .map(HeaderMatcher::display)
            .filter(|h| !h.is_empty())
            .collect();
        if headers.is_empty() {
            out.push_str(&self.name);
        } else {
            out.push_str(&format!("[{}]{}", headers.join("|"), self.name));
        }
        if !self.main_args.is_empty() {
            out.push(' ');
            out.push_str(&self.main_args.summary());
        }
        out.push_str(&format!("\n{}\n", self.help_text));
        for component in &self.components {
            out.push_str("  ");
            out.push_str(&component.summary());
            out.push('\n');
        }
        out
    }
}

/// Builder for [`Command`]; validates the grammar on `build`.
#[derive(Default)]
pub struct CommandBuilder {
    headers: Vec<HeaderMatcher>,
    name: String,
    components: Vec<CommandComponent>,
    main_args: Args,
    namespace: Option<String>,
    separators: Option<String>,
    help_text: Option<String>,
    raise_on_failure: bool,
}

impl CommandBuilder {
    /// Adds a literal header.
    pub fn header(mut self, header: &str) -> Self {
        self.headers.push(HeaderMatcher::Literal(header.to_string()));
        self
    }

    /// Adds an arbitrary header matcher.
    pub fn header_matcher(mut self, header: HeaderMatcher) -> Self {
        self.headers.push(header);
        self
    }

    /// Adds a top-level option.
    pub fn option(mut self, option: OptionSpec) -> Self {
        self.components.push(CommandComponent::Option(option));
        self
    }

    /// Adds a subcommand.
    pub fn subcommand(mut self, subcommand: SubcommandSpec) -> Self {
        self.components
            .push(CommandComponent::Subcommand(subcommand));
        self
    }

    /// Sets the main-argument constraints.
    pub fn main_args(mut self, args: Args) -> Self {
        self.main_args = args;
        self
    }

    /// Sets the namespace (defaults to [`DEFAULT_NAMESPACE`]).
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Sets the separator characters (defaults to a single space).
    pub fn separators(mut self, separators: &str) -> Self {
        self.separators = Some(separators.to_string());
        self
    }

    /// Sets the help line.
    pub fn help_text(mut self, help_text: &str) -> Self {
        self.help_text = Some(help_text.to_string());
        self
    }

    /// Surfaces parse failures as errors instead of failure results.
    pub fn raise_on_failure(mut self, raise: bool) -> Self {
        self.raise_on_failure = raise;
        self
    }

    /// Validates and produces the command.
    ///
    /// Appends the built-in `--help|-h` option (unless a component already
    /// claims the `help` key) and runs [`validate_command`].
    ///
    /// # Errors
    ///
    /// The first [`GrammarError`] found, if any.
    pub fn build(self) -> Result<Command, GrammarError> {
        let mut components = self.components;
        if !components.iter().any(|c| c.dest() == "help") {
            components.push(CommandComponent::Option(
                OptionSpec::new("--help|-h")?.with_help("show help"),
            ));
        }
        let command = Command {
            headers: self.headers,
            name: self.name,
            components,
            main_args: self.main_args,
            namespace: self
                .namespace
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            separators: self
                .separators
                .unwrap_or_else(|| DEFAULT_SEPARATORS.to_string()),
            help_text: self.help_text.unwrap_or_else(|| "unknown".to_string()),
            raise_on_failure: self.raise_on_failure,
        };
        if let Some(error) = validate_command(&command).into_iter().next() {
            return Err(error);
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_appends_help_option() {
        let cmd = Command::builder("cmd").build().unwrap();
        let help = cmd.find_option("--help").unwrap();
        assert!(help.matches("-h"));
        assert_eq!(help.dest, "help");
    }

    #[test]
    fn test_identity_uses_namespace_and_name() {
        let cmd = Command::builder("weather")
            .namespace("bots")
            .build()
            .unwrap();
        assert_eq!(cmd.identity(), "bots::weather");
    }

    #[test]
    fn test_header_only_command_identity() {
        let cmd = Command::header_only(HeaderMatcher::Literal("!".to_string()))
            .build()
            .unwrap();
        assert_eq!(cmd.identity(), "main::!");
    }

    #[test]
    fn test_invocation_forms_combine_headers_and_name() {
        let cmd = Command::builder("pip").header("/").header("!").build().unwrap();
        assert_eq!(cmd.invocation_forms(), vec!["/pip", "!pip"]);

        let bare = Command::builder("pip").build().unwrap();
        assert_eq!(bare.invocation_forms(), vec!["pip"]);
    }

    #[test]
    fn test_empty_grammar_rejected() {
        let err = CommandBuilder::default().build();
        assert!(matches!(err, Err(GrammarError::MissingNameAndHeaders)));
    }

    #[test]
    fn test_render_help_lists_components() {
        let cmd = Command::builder("cmd")
            .help_text("a test command")
            .option(OptionSpec::new("--foo").unwrap().with_help("foo option"))
            .build()
            .unwrap();
        let help = cmd.render_help();
        assert!(help.contains("a test command"));
        assert!(help.contains("--foo"));
        assert!(help.contains("--help"));
    }
}
