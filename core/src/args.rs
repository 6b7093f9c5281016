//! Argument constraint model.
//!
//! This module defines the typed argument slots a command grammar declares:
//! value patterns ([`SlotPattern`]), slot modifiers ([`SlotKind`]), runtime
//! values ([`ArgValue`]), and the ordered slot sequence ([`Args`]) built
//! through [`ArgsBuilder`].
//!
//! Structural invariants (slot ordering, variadic multiplicity, duplicate
//! names, regex validity) are checked when the builder runs, so a grammar
//! that constructs successfully never produces a constraint error at parse
//! time for its own shape.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::validate::GrammarError;

/// Runtime value produced by slot coercion.
///
/// Values round-trip through JSON: `None` maps to `null`, lists and maps to
/// arrays and objects.
///
/// # Examples
///
/// ```
/// use command_grammar_core::ArgValue;
///
/// let v = ArgValue::Int(42);
/// assert_eq!(v.as_int(), Some(42));
/// assert_eq!(serde_json::to_string(&v).unwrap(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// Absent/placeholder value.
    None,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Plain string.
    Str(String),
    /// Ordered sequence (variadic capture).
    List(Vec<ArgValue>),
    /// Keyed mapping (keyword-variadic capture).
    Map(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    /// Returns the string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the float payload; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ArgValue::Float(f) => Some(*f),
            ArgValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// `true` for [`ArgValue::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, ArgValue::None)
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::None => write!(f, "none"),
            ArgValue::Bool(b) => write!(f, "{b}"),
            ArgValue::Int(i) => write!(f, "{i}"),
            ArgValue::Float(v) => write!(f, "{v}"),
            ArgValue::Str(s) => write!(f, "{s}"),
            ArgValue::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            ArgValue::Map(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// Validation callback for [`SlotPattern::Custom`].
///
/// Returns the coerced value on acceptance, `None` on rejection. Resolved at
/// grammar-construction time; no validator is synthesized at parse time.
pub type CustomCheck = Arc<dyn Fn(&str) -> Option<ArgValue> + Send + Sync>;

/// Value pattern a slot accepts.
///
/// The variant set is closed: primitives, a fixed choice set, an ordered
/// union, a compiled regex, or a named custom callback.
///
/// # Examples
///
/// ```
/// use command_grammar_core::SlotPattern;
///
/// assert_eq!(SlotPattern::Int.coerce("42").unwrap().as_int(), Some(42));
/// assert!(SlotPattern::Bool.coerce("maybe").is_none());
///
/// let choice = SlotPattern::Choice(vec!["a".into(), "b".into()]);
/// assert!(choice.coerce("a").is_some());
/// assert!(choice.coerce("c").is_none());
/// ```
#[derive(Clone)]
pub enum SlotPattern {
    /// Any token, captured verbatim.
    Str,
    /// Signed integer literal.
    Int,
    /// Floating-point literal.
    Float,
    /// `true`/`false` literal (case-insensitive).
    Bool,
    /// Any token; alias of `Str` kept distinct for documentation purposes.
    Any,
    /// Token must equal one of the fixed literals; no coercion.
    Choice(Vec<String>),
    /// Ordered union; first member to accept wins.
    Union(Vec<SlotPattern>),
    /// Token must fully match the pattern; the full match is the value.
    Regex {
        /// Pattern text as declared.
        raw: String,
        /// Anchored compiled form.
        compiled: Regex,
    },
    /// Named custom validator resolved at construction time.
    Custom {
        /// Stable name used in diagnostics; custom patterns do not serialize.
        name: String,
        /// The acceptance check.
        check: CustomCheck,
    },
}

impl SlotPattern {
    /// Compiles a full-match regex pattern.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::InvalidRegex`] if the pattern does not compile.
    pub fn regex(pattern: &str) -> Result<Self, GrammarError> {
        let compiled = Regex::new(&format!("^(?:{pattern})$")).map_err(|err| {
            GrammarError::InvalidRegex {
                pattern: pattern.to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(SlotPattern::Regex {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Builds a named custom pattern from a validation callback.
    pub fn custom(
        name: &str,
        check: impl Fn(&str) -> Option<ArgValue> + Send + Sync + 'static,
    ) -> Self {
        SlotPattern::Custom {
            name: name.to_string(),
            check: Arc::new(check),
        }
    }

    /// Attempts to coerce a token; `None` means the token is rejected.
    pub fn coerce(&self, token: &str) -> Option<ArgValue> {
        match self {
            SlotPattern::Str | SlotPattern::Any => Some(ArgValue::Str(token.to_string())),
            SlotPattern::Int => token.parse::<i64>().ok().map(ArgValue::Int),
            SlotPattern::Float => token.parse::<f64>().ok().map(ArgValue::Float),
            SlotPattern::Bool => {
                if token.eq_ignore_ascii_case("true") {
                    Some(ArgValue::Bool(true))
                } else if token.eq_ignore_ascii_case("false") {
                    Some(ArgValue::Bool(false))
                } else {
                    None
                }
            }
            SlotPattern::Choice(choices) => choices
                .iter()
                .any(|c| c == token)
                .then(|| ArgValue::Str(token.to_string())),
            SlotPattern::Union(members) => members.iter().find_map(|m| m.coerce(token)),
            SlotPattern::Regex { compiled, .. } => compiled
                .is_match(token)
                .then(|| ArgValue::Str(token.to_string())),
            SlotPattern::Custom { check, .. } => check(token),
        }
    }

    /// Neutral value substituted by force slots and shape diagnostics.
    pub fn type_default(&self) -> ArgValue {
        match self {
            SlotPattern::Int => ArgValue::Int(0),
            SlotPattern::Float => ArgValue::Float(0.0),
            SlotPattern::Bool => ArgValue::Bool(false),
            SlotPattern::Union(members) => members
                .first()
                .map(SlotPattern::type_default)
                .unwrap_or(ArgValue::None),
            SlotPattern::Custom { .. } => ArgValue::None,
            _ => ArgValue::Str(String::new()),
        }
    }

    /// Short label used in help summaries and error messages.
    pub fn label(&self) -> String {
        match self {
            SlotPattern::Str => "str".to_string(),
            SlotPattern::Int => "int".to_string(),
            SlotPattern::Float => "float".to_string(),
            SlotPattern::Bool => "bool".to_string(),
            SlotPattern::Any => "any".to_string(),
            SlotPattern::Choice(choices) => choices.join("|"),
            SlotPattern::Union(members) => {
                let parts: Vec<String> = members.iter().map(SlotPattern::label).collect();
                parts.join("|")
            }
            SlotPattern::Regex { raw, .. } => format!("/{raw}/"),
            SlotPattern::Custom { name, .. } => name.clone(),
        }
    }
}

impl fmt::Debug for SlotPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotPattern({})", self.label())
    }
}

impl PartialEq for SlotPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SlotPattern::Str, SlotPattern::Str)
            | (SlotPattern::Int, SlotPattern::Int)
            | (SlotPattern::Float, SlotPattern::Float)
            | (SlotPattern::Bool, SlotPattern::Bool)
            | (SlotPattern::Any, SlotPattern::Any) => true,
            (SlotPattern::Choice(a), SlotPattern::Choice(b)) => a == b,
            (SlotPattern::Union(a), SlotPattern::Union(b)) => a == b,
            (SlotPattern::Regex { raw: a, .. }, SlotPattern::Regex { raw: b, .. }) => a == b,
            (SlotPattern::Custom { name: a, .. }, SlotPattern::Custom { name: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// Slot modifier controlling how tokens are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// Exactly one token, coercion failure is fatal (unless defaulted).
    #[default]
    Required,
    /// Missing token or failed coercion resolves to the default without
    /// failing the match; a rejected token is not consumed.
    Optional,
    /// A token is consumed but its value is discarded and replaced by the
    /// default: shape assertion without value exposure.
    Force,
    /// The token must NOT satisfy the pattern; the raw token is the value.
    Anti,
    /// Greedy positional capture into a list, up to the next recognized
    /// boundary. At most one per constraint model.
    Variadic,
    /// Greedy `key=value` capture into a map, up to the next boundary.
    /// At most one per constraint model.
    KeywordVariadic,
    /// Exactly the form `name=value`; a bare value is a mismatch.
    Keyword,
}

/// One named, typed argument slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgSlot {
    /// Slot name; the key in result maps.
    pub name: String,
    /// Accepted value pattern.
    pub pattern: SlotPattern,
    /// Consumption modifier.
    pub kind: SlotKind,
    /// Value used when the slot is skipped or tolerably failed.
    pub default: Option<ArgValue>,
}

impl ArgSlot {
    /// Creates a required slot.
    pub fn new(name: &str, pattern: SlotPattern) -> Self {
        Self {
            name: name.to_string(),
            pattern,
            kind: SlotKind::Required,
            default: None,
        }
    }

    /// Sets the modifier.
    pub fn with_kind(mut self, kind: SlotKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: ArgValue) -> Self {
        self.default = Some(default);
        self
    }

    /// `true` when this slot tolerates a missing token.
    pub fn is_tolerant(&self) -> bool {
        self.default.is_some()
            || matches!(
                self.kind,
                SlotKind::Optional | SlotKind::Variadic | SlotKind::KeywordVariadic
            )
    }

    /// The value this slot resolves to when no token is consumed.
    pub fn fallback(&self) -> ArgValue {
        match (&self.default, self.kind) {
            (Some(value), _) => value.clone(),
            (None, SlotKind::Variadic) => ArgValue::List(Vec::new()),
            (None, SlotKind::KeywordVariadic) => ArgValue::Map(BTreeMap::new()),
            _ => ArgValue::None,
        }
    }
}

/// Ordered sequence of argument slots.
///
/// Built through [`ArgsBuilder`]; an empty model is the default for nodes
/// that take no arguments.
///
/// # Examples
///
/// ```
/// use command_grammar_core::{Args, ArgValue, SlotPattern};
///
/// let args = Args::builder()
///     .required("foo", SlotPattern::Int)
///     .default("de", SlotPattern::Bool, ArgValue::Bool(true))
///     .build()
///     .unwrap();
///
/// assert_eq!(args.len(), 2);
/// assert!(args.get("de").unwrap().default.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Args {
    slots: Vec<ArgSlot>,
}

impl Args {
    /// An empty constraint model.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts a builder.
    pub fn builder() -> ArgsBuilder {
        ArgsBuilder { slots: Vec::new() }
    }

    /// Number of declared slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` when no slots are declared.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Looks a slot up by name.
    pub fn get(&self, name: &str) -> Option<&ArgSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    /// Iterates slots in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ArgSlot> {
        self.slots.iter()
    }

    /// Range of positional tokens this model can consume: `(min, max)`,
    /// `max = None` when a variadic slot makes it unbounded.
    pub fn positional_range(&self) -> (usize, Option<usize>) {
        let mut min = 0;
        let mut max = 0;
        let mut unbounded = false;
        for slot in &self.slots {
            match slot.kind {
                SlotKind::Required if slot.default.is_none() => {
                    min += 1;
                    max += 1;
                }
                SlotKind::Force | SlotKind::Anti => {
                    min += 1;
                    max += 1;
                }
                SlotKind::Required | SlotKind::Optional => max += 1,
                SlotKind::Variadic => unbounded = true,
                // Keyworded tokens are not positional.
                SlotKind::Keyword | SlotKind::KeywordVariadic => {}
            }
        }
        (min, if unbounded { None } else { Some(max) })
    }

    /// Compact `name: pattern` summary used in help output.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .slots
            .iter()
            .map(|s| {
                let marker = match s.kind {
                    SlotKind::Required => "",
                    SlotKind::Optional => "?",
                    SlotKind::Force => "#",
                    SlotKind::Anti => "!",
                    SlotKind::Variadic => "*",
                    SlotKind::KeywordVariadic => "**",
                    SlotKind::Keyword => "@",
                };
                format!("<{marker}{}: {}>", s.name, s.pattern.label())
            })
            .collect();
        parts.join(" ")
    }
}

/// Builder for [`Args`]; validates the slot-ordering invariants on `build`.
///
/// # Examples
///
/// ```
/// use command_grammar_core::{Args, ArgValue, SlotPattern};
///
/// // A required slot may not follow an optional one...
/// let err = Args::builder()
///     .optional("a", SlotPattern::Str)
///     .required("b", SlotPattern::Int)
///     .build();
/// assert!(err.is_err());
///
/// // ...unless a keyword or variadic slot separates them.
/// let ok = Args::builder()
///     .optional("a", SlotPattern::Str)
///     .keyword("named", SlotPattern::Int)
///     .required("b", SlotPattern::Int)
///     .build();
/// assert!(ok.is_ok());
/// ```
pub struct ArgsBuilder {
    slots: Vec<ArgSlot>,
}

impl ArgsBuilder {
    /// Adds a required slot.
    pub fn required(self, name: &str, pattern: SlotPattern) -> Self {
        self.slot(ArgSlot::new(name, pattern))
    }

    /// Adds a required slot with a default value.
    pub fn default(self, name: &str, pattern: SlotPattern, default: ArgValue) -> Self {
        self.slot(ArgSlot::new(name, pattern).with_default(default))
    }

    /// Adds an optional slot.
    pub fn optional(self, name: &str, pattern: SlotPattern) -> Self {
        self.slot(ArgSlot::new(name, pattern).with_kind(SlotKind::Optional))
    }

    /// Adds a force slot (token consumed, value replaced by the default).
    pub fn force(self, name: &str, pattern: SlotPattern) -> Self {
        self.slot(ArgSlot::new(name, pattern).with_kind(SlotKind::Force))
    }

    /// Adds an anti-pattern slot (token must not satisfy the pattern).
    pub fn anti(self, name: &str, pattern: SlotPattern) -> Self {
        self.slot(ArgSlot::new(name, pattern).with_kind(SlotKind::Anti))
    }

    /// Adds a greedy positional capture slot.
    pub fn variadic(self, name: &str, pattern: SlotPattern) -> Self {
        self.slot(ArgSlot::new(name, pattern).with_kind(SlotKind::Variadic))
    }

    /// Adds a greedy `key=value` capture slot.
    pub fn keyword_variadic(self, name: &str, pattern: SlotPattern) -> Self {
        self.slot(ArgSlot::new(name, pattern).with_kind(SlotKind::KeywordVariadic))
    }

    /// Adds a `name=value` slot.
    pub fn keyword(self, name: &str, pattern: SlotPattern) -> Self {
        self.slot(ArgSlot::new(name, pattern).with_kind(SlotKind::Keyword))
    }

    /// Adds a fully specified slot.
    pub fn slot(mut self, slot: ArgSlot) -> Self {
        self.slots.push(slot);
        self
    }

    /// Validates ordering and multiplicity, producing the model.
    ///
    /// # Errors
    ///
    /// [`GrammarError::DuplicateSlot`], [`GrammarError::MultipleVariadic`],
    /// [`GrammarError::MultipleKeywordVariadic`], or
    /// [`GrammarError::RequiredAfterOptional`].
    pub fn build(self) -> Result<Args, GrammarError> {
        let mut seen = std::collections::HashSet::new();
        let mut variadic = 0usize;
        let mut keyword_variadic = 0usize;
        let mut after_tolerant = false;

        for slot in &self.slots {
            if slot.name.trim().is_empty() {
                return Err(GrammarError::EmptyNodeName);
            }
            if !seen.insert(slot.name.clone()) {
                return Err(GrammarError::DuplicateSlot {
                    name: slot.name.clone(),
                });
            }
            match slot.kind {
                SlotKind::Variadic => {
                    variadic += 1;
                    if variadic > 1 {
                        return Err(GrammarError::MultipleVariadic);
                    }
                    after_tolerant = false;
                }
                SlotKind::KeywordVariadic => {
                    keyword_variadic += 1;
                    if keyword_variadic > 1 {
                        return Err(GrammarError::MultipleKeywordVariadic);
                    }
                    after_tolerant = false;
                }
                SlotKind::Keyword => after_tolerant = false,
                SlotKind::Required | SlotKind::Force | SlotKind::Anti
                    if slot.default.is_none() =>
                {
                    if after_tolerant {
                        return Err(GrammarError::RequiredAfterOptional {
                            name: slot.name.clone(),
                        });
                    }
                }
                _ => {}
            }
            if slot.default.is_some() || slot.kind == SlotKind::Optional {
                after_tolerant = true;
            }
        }

        Ok(Args { slots: self.slots })
    }
}
