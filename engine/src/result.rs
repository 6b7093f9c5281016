//! Structured match results.
//!
//! A [`MatchResult`] is created fresh per parse call, finalized by the
//! behavior pipeline, and immutable to consumers afterwards. Failures carry
//! an [`ErrorInfo`] diagnostic instead of raising, unless the command's
//! failure policy says otherwise; a help request is a distinct success shape
//! carrying rendered text.

use std::collections::BTreeMap;

use command_grammar_core::ArgValue;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Matched data recorded for one option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionMatch {
    /// Presence marker or action-assigned value.
    pub value: ArgValue,
    /// The option's own matched arguments.
    pub args: BTreeMap<String, ArgValue>,
}

impl Default for OptionMatch {
    fn default() -> Self {
        Self {
            value: ArgValue::None,
            args: BTreeMap::new(),
        }
    }
}

/// Matched data recorded for one subcommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcommandMatch {
    /// Presence marker or action-assigned value.
    pub value: ArgValue,
    /// The subcommand's own matched arguments.
    pub args: BTreeMap<String, ArgValue>,
    /// Nested option matches.
    pub options: BTreeMap<String, OptionMatch>,
}

impl Default for SubcommandMatch {
    fn default() -> Self {
        Self {
            value: ArgValue::None,
            args: BTreeMap::new(),
            options: BTreeMap::new(),
        }
    }
}

/// Category of a failure diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No declared header matched.
    HeaderMismatch,
    /// A token run could not be placed.
    UnknownToken,
    /// A required slot rejected its token.
    SlotMismatch,
    /// Input ended before a required slot was filled.
    MissingArgument,
    /// A requires path was not satisfied.
    RequiresUnsatisfied,
    /// Vetoed by the cooldown behavior.
    CooldownActive,
    /// Vetoed by a mutual-exclusion behavior.
    MutuallyExclusive,
    /// Vetoed by a custom behavior.
    Vetoed,
}

/// Failure diagnostic attached to a non-matched result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable message naming the first unresolved requirement.
    pub message: String,
    /// Fuzzy "did you mean" candidate, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.suggestion {
            Some(candidate) => write!(f, "{} (did you mean {candidate}?)", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl From<&ParseError> for ErrorInfo {
    fn from(error: &ParseError) -> Self {
        let kind = match error {
            ParseError::HeaderMismatch { .. } => FailureKind::HeaderMismatch,
            ParseError::UnknownToken { .. } => FailureKind::UnknownToken,
            ParseError::SlotMismatch { .. } => FailureKind::SlotMismatch,
            ParseError::MissingArgument { .. } => FailureKind::MissingArgument,
            ParseError::RequiresUnsatisfied { .. } => FailureKind::RequiresUnsatisfied,
        };
        Self {
            kind,
            message: error.to_string(),
            suggestion: error.suggestion().map(String::from),
        }
    }
}

/// The structured outcome of one parse call.
///
/// # Examples
///
/// ```
/// use command_grammar_engine::MatchResult;
///
/// let result = MatchResult::default();
/// assert!(!result.matched);
/// assert!(result.error_info.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchResult {
    /// `true` when every required slot and construct resolved.
    pub matched: bool,
    /// The matched header value, when headers are declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<ArgValue>,
    /// Main-argument values by slot name.
    pub main_args: BTreeMap<String, ArgValue>,
    /// Option matches by dest key.
    pub options: BTreeMap<String, OptionMatch>,
    /// Subcommand matches by dest key.
    pub subcommands: BTreeMap<String, SubcommandMatch>,
    /// Every slot value across the whole tree, last write wins.
    pub all_matched_args: BTreeMap<String, ArgValue>,
    /// Diagnostic, populated on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ErrorInfo>,
    /// Rendered help, populated on a help-requested outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

impl MatchResult {
    /// A failure result carrying a diagnostic.
    pub fn failure(info: ErrorInfo) -> Self {
        Self {
            matched: false,
            error_info: Some(info),
            ..Self::default()
        }
    }

    /// A help-requested outcome carrying rendered text.
    ///
    /// Not an error: the distinct success shape for `--help` interception.
    pub fn help(text: String) -> Self {
        Self {
            matched: true,
            help_text: Some(text),
            ..Self::default()
        }
    }

    /// `true` when this outcome is a help request.
    pub fn is_help_request(&self) -> bool {
        self.help_text.is_some()
    }

    /// Looks a slot value up across the whole tree.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.all_matched_args.get(name)
    }

    /// Resolves a dotted path into the result tree.
    ///
    /// Supported roots: `header`, `main_args.<slot>`, `options.<dest>`
    /// (the option's value), `options.<dest>.args.<slot>`,
    /// `subcommands.<dest>`, `subcommands.<dest>.args.<slot>`,
    /// `subcommands.<dest>.options.<dest>`, and
    /// `subcommands.<dest>.options.<dest>.args.<slot>`.
    /// Returns `None` when any path element is absent.
    pub fn query(&self, path: &str) -> Option<ArgValue> {
        let mut parts = path.split('.');
        match parts.next()? {
            "header" => self.header.clone(),
            "main_args" => self.main_args.get(parts.next()?).cloned(),
            "options" => {
                let opt = self.options.get(parts.next()?)?;
                match parts.next() {
                    None => Some(opt.value.clone()),
                    Some("value") => Some(opt.value.clone()),
                    Some("args") => opt.args.get(parts.next()?).cloned(),
                    Some(_) => None,
                }
            }
            "subcommands" => {
                let sub = self.subcommands.get(parts.next()?)?;
                match parts.next() {
                    None => Some(sub.value.clone()),
                    Some("value") => Some(sub.value.clone()),
                    Some("args") => sub.args.get(parts.next()?).cloned(),
                    Some("options") => {
                        let opt = sub.options.get(parts.next()?)?;
                        match parts.next() {
                            None => Some(opt.value.clone()),
                            Some("value") => Some(opt.value.clone()),
                            Some("args") => opt.args.get(parts.next()?).cloned(),
                            Some(_) => None,
                        }
                    }
                    Some(_) => None,
                }
            }
            _ => None,
        }
    }

    /// Rebuilds the flattened `all_matched_args` view.
    pub(crate) fn flatten(&mut self) {
        let mut flat = BTreeMap::new();
        for (name, value) in &self.main_args {
            flat.insert(name.clone(), value.clone());
        }
        for option in self.options.values() {
            for (name, value) in &option.args {
                flat.insert(name.clone(), value.clone());
            }
        }
        for sub in self.subcommands.values() {
            for (name, value) in &sub.args {
                flat.insert(name.clone(), value.clone());
            }
            for option in sub.options.values() {
                for (name, value) in &option.args {
                    flat.insert(name.clone(), value.clone());
                }
            }
        }
        self.all_matched_args = flat;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MatchResult {
        let mut result = MatchResult {
            matched: true,
            ..MatchResult::default()
        };
        result
            .main_args
            .insert("city".to_string(), ArgValue::Str("london".to_string()));
        result.options.insert(
            "detail".to_string(),
            OptionMatch {
                value: ArgValue::Bool(true),
                args: BTreeMap::from([("level".to_string(), ArgValue::Int(2))]),
            },
        );
        let mut sub = SubcommandMatch::default();
        sub.args
            .insert("pak".to_string(), ArgValue::Str("requests".to_string()));
        sub.options.insert(
            "upgrade".to_string(),
            OptionMatch {
                value: ArgValue::Bool(true),
                args: BTreeMap::new(),
            },
        );
        result.subcommands.insert("install".to_string(), sub);
        result.flatten();
        result
    }

    #[test]
    fn test_query_paths() {
        let result = sample();
        assert_eq!(
            result.query("main_args.city"),
            Some(ArgValue::Str("london".to_string()))
        );
        assert_eq!(result.query("options.detail"), Some(ArgValue::Bool(true)));
        assert_eq!(
            result.query("options.detail.args.level"),
            Some(ArgValue::Int(2))
        );
        assert_eq!(
            result.query("subcommands.install.args.pak"),
            Some(ArgValue::Str("requests".to_string()))
        );
        assert_eq!(
            result.query("subcommands.install.options.upgrade"),
            Some(ArgValue::Bool(true))
        );
        assert_eq!(result.query("options.missing"), None);
        assert_eq!(result.query("bogus.path"), None);
    }

    #[test]
    fn test_flatten_last_write_wins() {
        let result = sample();
        assert_eq!(
            result.get("pak"),
            Some(&ArgValue::Str("requests".to_string()))
        );
        assert_eq!(result.get("level"), Some(&ArgValue::Int(2)));
        assert_eq!(result.get("city"), Some(&ArgValue::Str("london".to_string())));
    }

    #[test]
    fn test_help_outcome_is_distinct_success() {
        let result = MatchResult::help("usage".to_string());
        assert!(result.is_help_request());
        assert!(result.matched);
        assert!(result.error_info.is_none());
    }
}
