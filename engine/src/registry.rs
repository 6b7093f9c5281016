//! Command registry.
//!
//! The registry is the engine's explicit context object: it owns compiled
//! parsers keyed by command identity, enforces the live-command capacity,
//! serializes same-identity static parses on a per-entry lock, caches raw
//! message results in an LRU, expands shortcuts, and computes fuzzy
//! "did you mean" suggestions across everything registered.
//!
//! Concurrency model: the command table sits behind an `RwLock`, each entry's
//! parser behind its own `Mutex` (per-identity serialization; different
//! identities parse independently), and the message cache behind a `Mutex`
//! so lookups and evictions are atomic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use command_grammar_core::Command;
use tracing::{debug, warn};

use crate::behavior::{MatchBehavior, run_behaviors};
use crate::cache::LruCache;
use crate::config::EngineConfig;
use crate::error::{RegistryError, Result};
use crate::parser::{CommandParser, FuzzyOpts};
use crate::result::MatchResult;
use crate::similar::levenshtein_norm;

/// How a parse call uses the compiled-parser cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Reuse the cached parser, serialized per identity; consult the
    /// message-result cache.
    Static,
    /// Compile a throwaway parser for this call; no caching, no cross-call
    /// interference, higher per-call cost.
    Dynamic,
}

/// One registered command: grammar, compiled parser, behaviors.
pub struct RegistryEntry {
    command: Arc<Command>,
    parser: Mutex<CommandParser>,
    behaviors: Vec<Arc<dyn MatchBehavior>>,
    seq: u64,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("command", &self.command)
            .field("behaviors", &self.behaviors.len())
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

impl RegistryEntry {
    /// The registered grammar.
    pub fn command(&self) -> &Arc<Command> {
        &self.command
    }

    /// Registration sequence number (first registered = lowest).
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

struct Shortcut {
    identity: String,
    template: String,
    reserve_args: bool,
}

/// Registry of command grammars and their compiled parsers.
///
/// # Examples
///
/// ```
/// use command_grammar_core::{Args, Command, SlotPattern};
/// use command_grammar_engine::{CommandRegistry, EngineConfig, ParseMode};
///
/// let registry = CommandRegistry::new(EngineConfig::default());
/// let cmd = Command::builder("echo")
///     .main_args(Args::builder().required("text", SlotPattern::Str).build().unwrap())
///     .build()
///     .unwrap();
/// let identity = registry.register(cmd).unwrap();
///
/// let result = registry.parse(&identity, "echo hello", ParseMode::Static).unwrap();
/// assert!(result.matched);
/// ```
pub struct CommandRegistry {
    config: EngineConfig,
    commands: RwLock<HashMap<String, Arc<RegistryEntry>>>,
    shortcuts: RwLock<HashMap<String, Shortcut>>,
    message_cache: Mutex<LruCache<String, MatchResult>>,
    next_seq: AtomicU64,
}

impl CommandRegistry {
    /// Creates a registry with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let message_cache = LruCache::new(config.message_max_cache);
        Self {
            config,
            commands: RwLock::new(HashMap::new()),
            shortcuts: RwLock::new(HashMap::new()),
            message_cache: Mutex::new(message_cache),
            next_seq: AtomicU64::new(0),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registers a command.
    ///
    /// # Errors
    ///
    /// [`RegistryError::CapacityExceeded`] beyond the configured maximum,
    /// [`RegistryError::DuplicateCommand`] when the identity is taken.
    pub fn register(&self, command: Command) -> Result<String> {
        self.insert(command, Vec::new(), false)
    }

    /// Registers a command with an ordered behavior pipeline.
    pub fn register_with_behaviors(
        &self,
        command: Command,
        behaviors: Vec<Arc<dyn MatchBehavior>>,
    ) -> Result<String> {
        self.insert(command, behaviors, false)
    }

    /// Registers a command, replacing any existing one with the same
    /// identity (behaviors reset unless re-supplied).
    pub fn replace(&self, command: Command) -> Result<String> {
        self.insert(command, Vec::new(), true)
    }

    fn insert(
        &self,
        command: Command,
        behaviors: Vec<Arc<dyn MatchBehavior>>,
        replace: bool,
    ) -> Result<String> {
        let identity = command.identity();
        let mut commands = self.commands.write().expect("command table poisoned");
        let exists = commands.contains_key(&identity);
        if exists && !replace {
            return Err(RegistryError::DuplicateCommand { identity });
        }
        if !exists && commands.len() >= self.config.command_max_count {
            return Err(RegistryError::CapacityExceeded {
                max: self.config.command_max_count,
            });
        }
        let command = Arc::new(command);
        let parser = CommandParser::compile(command.clone()).with_fuzzy(self.fuzzy_opts());
        let entry = Arc::new(RegistryEntry {
            command,
            parser: Mutex::new(parser),
            behaviors,
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        });
        debug!(identity = %identity, replace = exists, "registered command");
        commands.insert(identity.clone(), entry);
        Ok(identity)
    }

    /// Removes a command and its shortcuts.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownCommand`] when nothing is registered under
    /// the identity.
    pub fn delete(&self, identity: &str) -> Result<()> {
        let resolved = self.resolve_identity(identity).ok_or_else(|| {
            RegistryError::UnknownCommand {
                identity: identity.to_string(),
                suggestion: self.suggest(identity),
            }
        })?;
        self.commands
            .write()
            .expect("command table poisoned")
            .remove(&resolved);
        self.shortcuts
            .write()
            .expect("shortcut table poisoned")
            .retain(|_, shortcut| shortcut.identity != resolved);
        debug!(identity = %resolved, "deleted command");
        Ok(())
    }

    /// Moves a command to another namespace, keeping its behaviors.
    pub fn reset_namespace(&self, identity: &str, namespace: &str) -> Result<String> {
        let entry = self.require(identity)?;
        let mut command = (*entry.command).clone();
        command.namespace = namespace.to_string();
        let new_identity = command.identity();

        let mut commands = self.commands.write().expect("command table poisoned");
        if commands.contains_key(&new_identity) {
            return Err(RegistryError::DuplicateCommand {
                identity: new_identity,
            });
        }
        commands.remove(&entry.command.identity());
        let command = Arc::new(command);
        let parser = CommandParser::compile(command.clone()).with_fuzzy(self.fuzzy_opts());
        let new_entry = Arc::new(RegistryEntry {
            command,
            parser: Mutex::new(parser),
            behaviors: entry.behaviors.clone(),
            seq: entry.seq,
        });
        commands.insert(new_identity.clone(), new_entry);
        Ok(new_identity)
    }

    /// Returns the compiled entry for an identity.
    ///
    /// Idempotent: repeated lookups return the same entry (cache hit), so
    /// static parses share one serialized parser.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownCommand`], carrying a fuzzy suggestion when
    /// one clears the threshold.
    pub fn require(&self, identity: &str) -> Result<Arc<RegistryEntry>> {
        let resolved = self.resolve_identity(identity);
        let commands = self.commands.read().expect("command table poisoned");
        resolved
            .and_then(|id| commands.get(&id).cloned())
            .ok_or_else(|| RegistryError::UnknownCommand {
                identity: identity.to_string(),
                suggestion: self.suggest_locked(&commands, identity),
            })
    }

    /// Parses a line against a registered command.
    ///
    /// `Static` serializes on the entry's cached parser and consults the
    /// message cache (raw, pre-behavior results; behaviors always re-run);
    /// `Dynamic` compiles a throwaway parser. The command's failure policy
    /// decides whether an unmatched grammar raises; behavior vetoes never
    /// raise.
    pub fn parse(&self, identity: &str, line: &str, mode: ParseMode) -> Result<MatchResult> {
        let entry = self.require(identity)?;
        let raw = self.raw_parse(&entry, line, mode);
        let raw_matched = raw.matched;
        let result = run_behaviors(raw, &entry.behaviors);
        if !raw_matched && !result.is_help_request() && entry.command.raise_on_failure {
            if let Some(info) = result.error_info.clone() {
                return Err(RegistryError::Unmatched(info));
            }
        }
        Ok(result)
    }

    fn raw_parse(&self, entry: &RegistryEntry, line: &str, mode: ParseMode) -> MatchResult {
        match mode {
            ParseMode::Static => {
                let key = format!("{}\u{1}{line}", entry.command.identity());
                if self.config.enable_message_cache {
                    let mut cache = self.message_cache.lock().expect("message cache poisoned");
                    if let Some(hit) = cache.get(&key) {
                        debug!(identity = %entry.command.identity(), "message cache hit");
                        return hit.clone();
                    }
                }
                let result = entry
                    .parser
                    .lock()
                    .expect("parser lock poisoned")
                    .parse_line(line);
                if self.config.enable_message_cache {
                    self.message_cache
                        .lock()
                        .expect("message cache poisoned")
                        .insert(key, result.clone());
                }
                result
            }
            ParseMode::Dynamic => CommandParser::compile(entry.command.clone())
                .with_fuzzy(self.fuzzy_opts())
                .parse_line(line),
        }
    }

    /// Binds a shortcut key to a command-line template.
    ///
    /// With `reserve_args`, tokens the caller supplies after the key are
    /// appended to the expansion.
    pub fn add_shortcut(
        &self,
        identity: &str,
        key: &str,
        template: &str,
        reserve_args: bool,
    ) -> Result<()> {
        let entry = self.require(identity)?;
        self.shortcuts
            .write()
            .expect("shortcut table poisoned")
            .insert(
                key.to_string(),
                Shortcut {
                    identity: entry.command.identity(),
                    template: template.to_string(),
                    reserve_args,
                },
            );
        Ok(())
    }

    /// Expands a shortcut into `(identity, command line)`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownShortcut`] for an unbound key.
    pub fn resolve_shortcut(&self, key: &str, trailing: &[&str]) -> Result<(String, String)> {
        let shortcuts = self.shortcuts.read().expect("shortcut table poisoned");
        let shortcut = shortcuts
            .get(key)
            .ok_or_else(|| RegistryError::UnknownShortcut {
                key: key.to_string(),
            })?;
        let mut line = shortcut.template.clone();
        if shortcut.reserve_args && !trailing.is_empty() {
            line.push(' ');
            line.push_str(&trailing.join(" "));
        } else if !trailing.is_empty() {
            warn!(key, "shortcut drops trailing tokens");
        }
        Ok((shortcut.identity.clone(), line))
    }

    /// Expands and parses a shortcut in one step.
    pub fn parse_shortcut(
        &self,
        key: &str,
        trailing: &[&str],
        mode: ParseMode,
    ) -> Result<MatchResult> {
        let (identity, line) = self.resolve_shortcut(key, trailing)?;
        self.parse(&identity, &line, mode)
    }

    /// Closest registered command name above the fuzzy threshold, ties
    /// broken by first-registered order. Suggestions consider identities
    /// and display names.
    pub fn suggest(&self, name: &str) -> Option<String> {
        let commands = self.commands.read().expect("command table poisoned");
        self.suggest_locked(&commands, name)
    }

    fn suggest_locked(
        &self,
        commands: &HashMap<String, Arc<RegistryEntry>>,
        name: &str,
    ) -> Option<String> {
        let mut entries: Vec<&Arc<RegistryEntry>> = commands.values().collect();
        entries.sort_by_key(|e| e.seq);
        let mut best: Option<(String, f64)> = None;
        for entry in entries {
            let mut candidates = entry.command.invocation_forms();
            candidates.push(entry.command.display_name());
            candidates.push(entry.command.identity());
            for candidate in candidates {
                let score = levenshtein_norm(name, &candidate);
                if score >= self.config.fuzzy_threshold
                    && best.as_ref().is_none_or(|(_, b)| score > *b)
                {
                    best = Some((candidate, score));
                }
            }
        }
        best.map(|(candidate, _)| candidate)
    }

    /// Paginated one-line summaries of every registered command.
    ///
    /// `label_template` may contain `{current}` and `{total}` placeholders;
    /// pages are 1-based and clamped into range.
    pub fn all_command_help(
        &self,
        page_size: usize,
        page: usize,
        label_template: &str,
    ) -> String {
        let commands = self.commands.read().expect("command table poisoned");
        let mut entries: Vec<&Arc<RegistryEntry>> = commands.values().collect();
        entries.sort_by_key(|e| e.seq);

        let page_size = page_size.max(1);
        let total = entries.len().div_ceil(page_size).max(1);
        let page = page.clamp(1, total);
        let label = label_template
            .replace("{current}", &page.to_string())
            .replace("{total}", &total.to_string());

        let mut out = label;
        for entry in entries
            .iter()
            .skip((page - 1) * page_size)
            .take(page_size)
        {
            out.push('\n');
            out.push_str(&entry.command.help_summary());
        }
        out
    }

    /// Parses a line against every registered command, first-registered
    /// first, returning the first match.
    pub fn broadcast(&self, line: &str) -> Option<(String, MatchResult)> {
        let mut entries: Vec<Arc<RegistryEntry>> = self
            .commands
            .read()
            .expect("command table poisoned")
            .values()
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.seq);
        for entry in entries {
            let raw = self.raw_parse(&entry, line, ParseMode::Static);
            if raw.matched && !raw.is_help_request() {
                let result = run_behaviors(raw, &entry.behaviors);
                return Some((entry.command.identity(), result));
            }
        }
        None
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.read().expect("command table poisoned").len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` when the identity resolves to a registered command.
    pub fn contains(&self, identity: &str) -> bool {
        self.resolve_identity(identity).is_some()
    }

    /// All registered identities, first-registered first.
    pub fn identities(&self) -> Vec<String> {
        let commands = self.commands.read().expect("command table poisoned");
        let mut entries: Vec<&Arc<RegistryEntry>> = commands.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries
            .iter()
            .map(|e| e.command.identity())
            .collect()
    }

    /// Drops every cached message result.
    pub fn clear_message_cache(&self) {
        self.message_cache
            .lock()
            .expect("message cache poisoned")
            .clear();
    }

    fn fuzzy_opts(&self) -> FuzzyOpts {
        FuzzyOpts {
            enabled: self.config.fuzzy_match,
            threshold: self.config.fuzzy_threshold,
        }
    }

    /// Accepts a full identity, a bare name in the default namespace, or a
    /// bare name unique to any namespace (first-registered wins).
    fn resolve_identity(&self, identity: &str) -> Option<String> {
        let commands = self.commands.read().expect("command table poisoned");
        if commands.contains_key(identity) {
            return Some(identity.to_string());
        }
        if !identity.contains("::") {
            let namespaced = format!("{}::{identity}", self.config.default_namespace);
            if commands.contains_key(&namespaced) {
                return Some(namespaced);
            }
            let mut entries: Vec<&Arc<RegistryEntry>> = commands.values().collect();
            entries.sort_by_key(|e| e.seq);
            for entry in entries {
                if entry.command.display_name() == identity
                    || entry.command.invocation_forms().iter().any(|f| f == identity)
                {
                    return Some(entry.command.identity());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_grammar_core::{Args, SlotPattern};

    fn command(name: &str) -> Command {
        Command::builder(name).build().unwrap()
    }

    fn registry() -> CommandRegistry {
        CommandRegistry::new(EngineConfig::default())
    }

    #[test]
    fn test_register_and_require_idempotent() {
        let registry = registry();
        let identity = registry.register(command("alpha")).unwrap();
        let a = registry.require(&identity).unwrap();
        let b = registry.require(&identity).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = registry();
        registry.register(command("alpha")).unwrap();
        assert!(matches!(
            registry.register(command("alpha")),
            Err(RegistryError::DuplicateCommand { .. })
        ));
        // ...unless the caller explicitly replaces.
        assert!(registry.replace(command("alpha")).is_ok());
    }

    #[test]
    fn test_capacity_enforced() {
        let config = EngineConfig {
            command_max_count: 3,
            ..EngineConfig::default()
        };
        let registry = CommandRegistry::new(config);
        for name in ["a", "b", "c"] {
            registry.register(command(name)).unwrap();
        }
        assert!(matches!(
            registry.register(command("d")),
            Err(RegistryError::CapacityExceeded { max: 3 })
        ));
    }

    #[test]
    fn test_bare_name_resolves_in_default_namespace() {
        let registry = registry();
        registry.register(command("alpha")).unwrap();
        assert!(registry.contains("alpha"));
        assert!(registry.require("alpha").is_ok());
    }

    #[test]
    fn test_reset_namespace_moves_entry() {
        let registry = registry();
        let identity = registry.register(command("alpha")).unwrap();
        let moved = registry.reset_namespace(&identity, "other").unwrap();
        assert_eq!(moved, "other::alpha");
        assert!(!registry.contains(&identity));
        assert!(registry.contains("other::alpha"));
    }

    #[test]
    fn test_suggest_returns_best_above_threshold() {
        let registry = registry();
        registry.register(command("/pip")).unwrap();
        registry.register(command("/npm")).unwrap();
        assert_eq!(registry.suggest("/pio").as_deref(), Some("/pip"));
        assert_eq!(registry.suggest("zzzzzz"), None);
    }

    #[test]
    fn test_broadcast_first_registered_wins() {
        let registry = registry();
        let text_args = || {
            Args::builder()
                .variadic("rest", SlotPattern::Str)
                .build()
                .unwrap()
        };
        registry
            .register(
                Command::builder("cmd")
                    .namespace("first")
                    .main_args(text_args())
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                Command::builder("cmd")
                    .namespace("second")
                    .main_args(text_args())
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let (identity, result) = registry.broadcast("cmd hello").unwrap();
        assert_eq!(identity, "first::cmd");
        assert!(result.matched);
    }

    #[test]
    fn test_help_pagination() {
        let registry = registry();
        for name in ["a", "b", "c", "d", "e"] {
            registry.register(command(name)).unwrap();
        }
        let page = registry.all_command_help(2, 3, "[{current}/{total}]");
        assert!(page.starts_with("[3/3]"));
        assert!(page.contains("e :"));
        assert!(!page.contains("a :"));
    }

    #[test]
    fn test_shortcut_expansion() {
        let registry = registry();
        registry
            .register(
                Command::builder("pip")
                    .subcommand(
                        command_grammar_core::SubcommandSpec::new("install")
                            .unwrap()
                            .with_args(
                                Args::builder()
                                    .required("pak", SlotPattern::Str)
                                    .build()
                                    .unwrap(),
                            ),
                    )
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .add_shortcut("pip", "pi", "pip install", true)
            .unwrap();
        let (identity, line) = registry.resolve_shortcut("pi", &["requests"]).unwrap();
        assert_eq!(identity, "main::pip");
        assert_eq!(line, "pip install requests");
        let result = registry
            .parse_shortcut("pi", &["requests"], ParseMode::Static)
            .unwrap();
        assert!(result.matched, "{:?}", result.error_info);

        // Without reservation, trailing tokens are dropped.
        registry
            .add_shortcut("pip", "px", "pip install requests", false)
            .unwrap();
        let (_, line) = registry.resolve_shortcut("px", &["ignored"]).unwrap();
        assert_eq!(line, "pip install requests");
        assert!(matches!(
            registry.resolve_shortcut("nope", &[]),
            Err(RegistryError::UnknownShortcut { .. })
        ));
    }

    #[test]
    fn test_static_parse_uses_message_cache() {
        let registry = registry();
        registry
            .register(
                Command::builder("echo")
                    .main_args(
                        Args::builder()
                            .required("text", SlotPattern::Str)
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let a = registry.parse("echo", "echo hi", ParseMode::Static).unwrap();
        let b = registry.parse("echo", "echo hi", ParseMode::Static).unwrap();
        assert_eq!(a, b);
        let c = registry.parse("echo", "echo hi", ParseMode::Dynamic).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_unknown_command_carries_suggestion() {
        let config = EngineConfig {
            fuzzy_match: true,
            ..EngineConfig::default()
        };
        let registry = CommandRegistry::new(config);
        registry.register(command("deploy")).unwrap();
        match registry.require("depoy") {
            Err(RegistryError::UnknownCommand { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("deploy"));
            }
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
    }
}
