//! The disorder-tolerant matching engine.
//!
//! A [`CommandParser`] is compiled once from a [`Command`] and reused across
//! parse calls: alias and header tables are precomputed, while per-call
//! cursor and accumulator state is cleared by [`CommandParser::reset`]
//! (called automatically at the start of every [`CommandParser::parse`]).
//! A compiled parser is therefore reusable but not concurrently shareable;
//! the registry serializes access per command identity.
//!
//! Matching runs in phases: header, then a body scan that tolerates
//! arbitrary ordering of options, subcommands, and main-argument tokens,
//! then main-argument evaluation over whatever the body scan deferred.
//! The built-in `--help` option short-circuits to a help-requested outcome
//! from anywhere in the body scan.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use command_grammar_core::{
    ArgValue, Args, Command, CommandComponent, HeaderMatcher, OptionSpec, SlotKind,
    SubcommandSpec,
};
use regex::Regex;
use tracing::{debug, trace};

use crate::error::ParseError;
use crate::result::{ErrorInfo, MatchResult, OptionMatch, SubcommandMatch};
use crate::similar::levenshtein_norm;
use crate::token::{MessageInput, Unit};

/// Fuzzy-suggestion settings a parser applies to its own failures.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyOpts {
    /// Offer suggestions at all.
    pub enabled: bool,
    /// Similarity cutoff in `(0, 1)`.
    pub threshold: f64,
}

impl Default for FuzzyOpts {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.6,
        }
    }
}

#[derive(Clone)]
enum Param {
    Opt(Arc<OptionSpec>),
    Sub(Arc<SubTables>),
    Sentence,
}

struct SubTables {
    spec: SubcommandSpec,
    params: HashMap<String, Arc<OptionSpec>>,
    compact: Vec<Arc<OptionSpec>>,
}

struct Tables {
    name: String,
    /// Full first-token forms: text headers concatenated with the name.
    header_literals: Vec<String>,
    pattern_headers: Vec<Regex>,
    /// Element headers: kind plus the word expected to follow, if any.
    element_headers: Vec<(String, Option<String>)>,
    params: HashMap<String, Param>,
    compact: Vec<Arc<OptionSpec>>,
    /// Alias/name pool for fuzzy diagnosis.
    known_names: Vec<String>,
}

#[derive(Default)]
struct ParseState {
    units: Vec<Unit>,
    cursor: usize,
    header: Option<ArgValue>,
    main_args: BTreeMap<String, ArgValue>,
    options: BTreeMap<String, OptionMatch>,
    subcommands: BTreeMap<String, SubcommandMatch>,
    sentences: Vec<String>,
    deferred: Vec<Unit>,
    help_requested: bool,
}

enum Peek {
    End,
    Boundary,
    Word(String),
    Element(String),
}

/// A matching engine compiled from one command grammar.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use command_grammar_core::{Args, Command, OptionSpec, SlotPattern};
/// use command_grammar_engine::CommandParser;
///
/// let cmd = Command::builder("cmd")
///     .option(OptionSpec::new("foo").unwrap())
///     .main_args(Args::builder().required("bar", SlotPattern::Int).build().unwrap())
///     .build()
///     .unwrap();
/// let mut parser = CommandParser::compile(Arc::new(cmd));
///
/// // Options and main arguments match in either order.
/// let a = parser.parse_line("cmd foo 1");
/// let b = parser.parse_line("cmd 1 foo");
/// assert!(a.matched && b.matched);
/// assert_eq!(a.options, b.options);
/// assert_eq!(a.main_args, b.main_args);
/// ```
pub struct CommandParser {
    command: Arc<Command>,
    tables: Tables,
    fuzzy: FuzzyOpts,
    state: ParseState,
}

impl CommandParser {
    /// Compiles the alias and header tables for a command.
    pub fn compile(command: Arc<Command>) -> Self {
        let mut params: HashMap<String, Param> = HashMap::new();
        let mut compact = Vec::new();
        let mut known_names = Vec::new();
        let mut sentence_literals = Vec::new();

        for component in &command.components {
            match component {
                CommandComponent::Option(opt) => {
                    let opt = Arc::new(opt.clone());
                    for alias in &opt.aliases {
                        params.insert(alias.clone(), Param::Opt(opt.clone()));
                        known_names.push(alias.clone());
                    }
                    if opt.is_compact() {
                        compact.push(opt.clone());
                    }
                    sentence_literals.extend(opt.requires.iter().cloned());
                }
                CommandComponent::Subcommand(sub) => {
                    let mut sub_params = HashMap::new();
                    let mut sub_compact = Vec::new();
                    for opt in &sub.options {
                        let opt = Arc::new(opt.clone());
                        for alias in &opt.aliases {
                            sub_params.insert(alias.clone(), opt.clone());
                            known_names.push(alias.clone());
                        }
                        if opt.is_compact() {
                            sub_compact.push(opt.clone());
                        }
                    }
                    let tables = Arc::new(SubTables {
                        spec: sub.clone(),
                        params: sub_params,
                        compact: sub_compact,
                    });
                    params.insert(sub.name.clone(), Param::Sub(tables));
                    known_names.push(sub.name.clone());
                    sentence_literals.extend(sub.requires.iter().cloned());
                }
            }
        }

        for literal in sentence_literals {
            params.entry(literal).or_insert(Param::Sentence);
        }

        compact.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.name.len().cmp(&a.name.len()))
        });

        let mut header_literals = Vec::new();
        let mut pattern_headers = Vec::new();
        let mut element_headers = Vec::new();
        if command.headers.is_empty() {
            header_literals.push(command.name.clone());
        }
        for header in &command.headers {
            match header {
                HeaderMatcher::Literal(text) => {
                    header_literals.push(format!("{text}{}", command.name));
                }
                HeaderMatcher::Pattern { compiled, .. } => {
                    pattern_headers.push(compiled.clone());
                }
                HeaderMatcher::Element { kind } => {
                    let follow = (!command.name.is_empty()).then(|| command.name.clone());
                    element_headers.push((kind.clone(), follow));
                }
                HeaderMatcher::ElementPair { kind, suffix } => {
                    element_headers
                        .push((kind.clone(), Some(format!("{suffix}{}", command.name))));
                }
            }
        }

        debug!(
            identity = %command.identity(),
            params = params.len(),
            headers = header_literals.len(),
            "compiled parser"
        );

        Self {
            tables: Tables {
                name: command.name.clone(),
                header_literals,
                pattern_headers,
                element_headers,
                params,
                compact,
                known_names,
            },
            command,
            fuzzy: FuzzyOpts::default(),
            state: ParseState::default(),
        }
    }

    /// Sets the fuzzy-suggestion policy.
    pub fn with_fuzzy(mut self, fuzzy: FuzzyOpts) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    /// The grammar this parser was compiled from.
    pub fn command(&self) -> &Arc<Command> {
        &self.command
    }

    /// Clears all per-call state; must run between reuses.
    pub fn reset(&mut self) {
        self.state = ParseState::default();
    }

    /// Tokenizes a raw line with the command's separators and parses it.
    pub fn parse_line(&mut self, line: &str) -> MatchResult {
        let input = MessageInput::from_line(line, &self.command.separators);
        self.parse(&input)
    }

    /// Parses a tokenized input into a structured result.
    ///
    /// Failures are folded into a non-matched result with `error_info`
    /// populated; the caller applies the command's failure policy.
    pub fn parse(&mut self, input: &MessageInput) -> MatchResult {
        self.reset();
        self.state.units = input.units.clone();
        match self.run() {
            Ok(()) if self.state.help_requested => {
                trace!(identity = %self.command.identity(), "help requested");
                MatchResult::help(self.command.render_help())
            }
            Ok(()) => self.finalize(),
            Err(error) => {
                trace!(identity = %self.command.identity(), %error, "parse failed");
                MatchResult::failure(ErrorInfo::from(&error))
            }
        }
    }

    fn run(&mut self) -> Result<(), ParseError> {
        let tables = &self.tables;
        let state = &mut self.state;
        let fuzzy = self.fuzzy;

        Self::parse_header(tables, state, fuzzy)?;
        while state.cursor < state.units.len() && !state.help_requested {
            Self::parse_next(tables, state)?;
        }
        if state.help_requested {
            return Ok(());
        }
        if let Some(leftover) = state.sentences.first() {
            return Err(ParseError::UnknownToken {
                token: leftover.clone(),
                suggestion: suggest(leftover, &tables.known_names, fuzzy),
            });
        }
        Self::parse_main(tables, state, &self.command.main_args, fuzzy)?;
        Ok(())
    }

    fn parse_header(
        tables: &Tables,
        state: &mut ParseState,
        fuzzy: FuzzyOpts,
    ) -> Result<(), ParseError> {
        let Some(unit) = state.units.get(state.cursor).cloned() else {
            return Err(ParseError::HeaderMismatch {
                token: String::new(),
                suggestion: None,
            });
        };
        match unit {
            Unit::Word(word) => {
                if tables.header_literals.iter().any(|h| h == &word) {
                    state.header = Some(ArgValue::Str(word));
                    state.cursor += 1;
                    return Ok(());
                }
                for pattern in &tables.pattern_headers {
                    if tables.name.is_empty() {
                        if pattern.is_match(&word) {
                            state.header = Some(ArgValue::Str(word));
                            state.cursor += 1;
                            return Ok(());
                        }
                    } else if let Some(prefix) = word.strip_suffix(tables.name.as_str()) {
                        if pattern.is_match(prefix) {
                            state.header = Some(ArgValue::Str(prefix.to_string()));
                            state.cursor += 1;
                            return Ok(());
                        }
                    }
                }
                Err(ParseError::HeaderMismatch {
                    suggestion: suggest(&word, &tables.header_literals, fuzzy),
                    token: word,
                })
            }
            Unit::Element { kind, value } => {
                for (header_kind, follow) in &tables.element_headers {
                    if header_kind != &kind {
                        continue;
                    }
                    match follow {
                        None => {
                            state.header = Some(ArgValue::Str(value));
                            state.cursor += 1;
                            return Ok(());
                        }
                        Some(expected) => {
                            if state.units.get(state.cursor + 1).and_then(Unit::as_word)
                                == Some(expected.as_str())
                            {
                                state.header = Some(ArgValue::Str(value));
                                state.cursor += 2;
                                return Ok(());
                            }
                        }
                    }
                }
                Err(ParseError::HeaderMismatch {
                    token: format!("<{kind}>"),
                    suggestion: None,
                })
            }
        }
    }

    fn parse_next(tables: &Tables, state: &mut ParseState) -> Result<(), ParseError> {
        let word = match &state.units[state.cursor] {
            Unit::Word(word) => word.clone(),
            element @ Unit::Element { .. } => {
                state.deferred.push(element.clone());
                state.cursor += 1;
                return Ok(());
            }
        };

        match tables.params.get(&word).cloned() {
            Some(Param::Opt(opt)) => Self::parse_option(tables, state, opt, None),
            Some(Param::Sub(sub)) => Self::parse_subcommand(tables, state, sub),
            Some(Param::Sentence) => {
                state.sentences.push(word);
                state.cursor += 1;
                Ok(())
            }
            None => {
                if let Some((opt, rest)) = match_compact(&tables.compact, &word) {
                    Self::parse_option(tables, state, opt, Some(rest))
                } else {
                    state.deferred.push(Unit::Word(word));
                    state.cursor += 1;
                    Ok(())
                }
            }
        }
    }

    fn parse_option(
        tables: &Tables,
        state: &mut ParseState,
        opt: Arc<OptionSpec>,
        remainder: Option<String>,
    ) -> Result<(), ParseError> {
        state.cursor += 1;
        if let Some(rest) = remainder {
            state.units.insert(state.cursor, Unit::Word(rest));
        }
        consume_requires(&opt, &mut state.sentences)?;

        let boundary = |token: &str| tables.params.contains_key(token);
        let mut args = evaluate_args(&opt.args, &mut state.units, &mut state.cursor, &boundary)?;
        if let Some(action) = &opt.action {
            action(&mut args);
        }
        let value = if opt.args.is_empty() {
            ArgValue::Bool(true)
        } else {
            ArgValue::None
        };
        // A repeated option overwrites its earlier record.
        state
            .options
            .insert(opt.dest.clone(), OptionMatch { value, args });
        if opt.dest == "help" {
            state.help_requested = true;
        }
        Ok(())
    }

    fn parse_subcommand(
        tables: &Tables,
        state: &mut ParseState,
        sub: Arc<SubTables>,
    ) -> Result<(), ParseError> {
        state.cursor += 1;
        consume_requires_path(
            &sub.spec.name,
            &sub.spec.requires,
            &mut state.sentences,
        )?;

        let (_, max_positional) = sub.spec.positional_range();
        let mut options: BTreeMap<String, OptionMatch> = BTreeMap::new();
        let mut buffer: Vec<Unit> = Vec::new();

        while state.cursor < state.units.len() {
            let word = match &state.units[state.cursor] {
                Unit::Word(word) => word.clone(),
                element @ Unit::Element { .. } => {
                    if max_positional.is_none_or(|max| buffer.len() < max) {
                        buffer.push(element.clone());
                        state.cursor += 1;
                        continue;
                    }
                    break;
                }
            };
            if let Some(opt) = sub.params.get(&word).cloned() {
                state.cursor += 1;
                let boundary = |token: &str| {
                    sub.params.contains_key(token) || tables.params.contains_key(token)
                };
                let mut args =
                    evaluate_args(&opt.args, &mut state.units, &mut state.cursor, &boundary)?;
                if let Some(action) = &opt.action {
                    action(&mut args);
                }
                let value = if opt.args.is_empty() {
                    ArgValue::Bool(true)
                } else {
                    ArgValue::None
                };
                options.insert(opt.dest.clone(), OptionMatch { value, args });
                continue;
            }
            if let Some((opt, rest)) = match_compact(&sub.compact, &word) {
                state.cursor += 1;
                state.units.insert(state.cursor, Unit::Word(rest));
                let boundary = |token: &str| {
                    sub.params.contains_key(token) || tables.params.contains_key(token)
                };
                let mut args =
                    evaluate_args(&opt.args, &mut state.units, &mut state.cursor, &boundary)?;
                if let Some(action) = &opt.action {
                    action(&mut args);
                }
                options.insert(
                    opt.dest.clone(),
                    OptionMatch {
                        value: ArgValue::None,
                        args,
                    },
                );
                continue;
            }
            if tables.params.contains_key(&word) {
                // Unrelated token: hand control back to the outer scope.
                break;
            }
            if max_positional.is_none_or(|max| buffer.len() < max) {
                buffer.push(Unit::Word(word));
                state.cursor += 1;
                continue;
            }
            break;
        }

        let mut pos = 0;
        let no_boundary = |_: &str| false;
        let mut args = evaluate_args(&sub.spec.args, &mut buffer, &mut pos, &no_boundary)?;
        // Tokens the subcommand's own model left over go back to main args.
        state.deferred.extend(buffer.drain(pos..));
        if let Some(action) = &sub.spec.action {
            action(&mut args);
        }
        let value = if sub.spec.args.is_empty() && options.is_empty() {
            ArgValue::Bool(true)
        } else {
            ArgValue::None
        };
        state.subcommands.insert(
            sub.spec.dest.clone(),
            SubcommandMatch {
                value,
                args,
                options,
            },
        );
        Ok(())
    }

    fn parse_main(
        tables: &Tables,
        state: &mut ParseState,
        main_args: &Args,
        fuzzy: FuzzyOpts,
    ) -> Result<(), ParseError> {
        let mut units = std::mem::take(&mut state.deferred);
        let mut pos = 0;
        let no_boundary = |_: &str| false;
        state.main_args = evaluate_args(main_args, &mut units, &mut pos, &no_boundary)?;
        if let Some(leftover) = units.get(pos) {
            let token = leftover.display();
            return Err(ParseError::UnknownToken {
                suggestion: suggest(&token, &tables.known_names, fuzzy),
                token,
            });
        }
        Ok(())
    }

    fn finalize(&mut self) -> MatchResult {
        let state = &mut self.state;
        let mut result = MatchResult {
            matched: true,
            header: state.header.take(),
            main_args: std::mem::take(&mut state.main_args),
            options: std::mem::take(&mut state.options),
            subcommands: std::mem::take(&mut state.subcommands),
            ..MatchResult::default()
        };
        result.flatten();
        result
    }
}

fn consume_requires(opt: &OptionSpec, sentences: &mut Vec<String>) -> Result<(), ParseError> {
    consume_requires_path(&opt.name, &opt.requires, sentences)
}

fn consume_requires_path(
    name: &str,
    requires: &[String],
    sentences: &mut Vec<String>,
) -> Result<(), ParseError> {
    if requires.is_empty() {
        return Ok(());
    }
    if sentences.as_slice().ends_with(requires) {
        sentences.clear();
        Ok(())
    } else {
        Err(ParseError::RequiresUnsatisfied {
            name: name.to_string(),
            path: requires.join(" "),
        })
    }
}

fn match_compact(compact: &[Arc<OptionSpec>], word: &str) -> Option<(Arc<OptionSpec>, String)> {
    for opt in compact {
        for alias in &opt.aliases {
            if let Some(rest) = word.strip_prefix(alias.as_str()) {
                if !rest.is_empty() {
                    return Some((opt.clone(), rest.to_string()));
                }
            }
        }
    }
    None
}

fn suggest(token: &str, candidates: &[String], fuzzy: FuzzyOpts) -> Option<String> {
    if !fuzzy.enabled {
        return None;
    }
    let mut best: Option<(&String, f64)> = None;
    for candidate in candidates {
        let score = levenshtein_norm(token, candidate);
        if score >= fuzzy.threshold && best.is_none_or(|(_, b)| score > b) {
            best = Some((candidate, score));
        }
    }
    best.map(|(candidate, _)| candidate.clone())
}

fn peek_token(units: &[Unit], pos: usize, is_boundary: &dyn Fn(&str) -> bool) -> Peek {
    match units.get(pos) {
        None => Peek::End,
        Some(Unit::Word(word)) => {
            if is_boundary(word) {
                Peek::Boundary
            } else {
                Peek::Word(word.clone())
            }
        }
        Some(element @ Unit::Element { .. }) => Peek::Element(element.display()),
    }
}

/// Evaluates a constraint model against a unit stream, consuming from `pos`.
///
/// The boundary predicate stops variadic capture and token consumption at
/// recognized option/subcommand aliases.
fn evaluate_args(
    args: &Args,
    units: &mut Vec<Unit>,
    pos: &mut usize,
    is_boundary: &dyn Fn(&str) -> bool,
) -> Result<BTreeMap<String, ArgValue>, ParseError> {
    let mut out = BTreeMap::new();
    let slots: Vec<_> = args.iter().collect();

    for (index, slot) in slots.iter().enumerate() {
        let name = slot.name.clone();
        match slot.kind {
            SlotKind::Required => match peek_token(units, *pos, is_boundary) {
                Peek::Word(token) => match slot.pattern.coerce(&token) {
                    Some(value) => {
                        *pos += 1;
                        out.insert(name, value);
                    }
                    None => match &slot.default {
                        // Defaulted slot tolerates the mismatch and leaves
                        // the token for the next consumer.
                        Some(default) => {
                            out.insert(name, default.clone());
                        }
                        None => {
                            return Err(ParseError::SlotMismatch { slot: name, token });
                        }
                    },
                },
                Peek::Element(token) => match &slot.default {
                    Some(default) => {
                        out.insert(name, default.clone());
                    }
                    None => return Err(ParseError::SlotMismatch { slot: name, token }),
                },
                Peek::End | Peek::Boundary => match &slot.default {
                    Some(default) => {
                        out.insert(name, default.clone());
                    }
                    None => return Err(ParseError::MissingArgument { slot: name }),
                },
            },
            SlotKind::Optional => match peek_token(units, *pos, is_boundary) {
                Peek::Word(token) => match slot.pattern.coerce(&token) {
                    Some(value) => {
                        *pos += 1;
                        out.insert(name, value);
                    }
                    None => {
                        out.insert(name, slot.fallback());
                    }
                },
                _ => {
                    out.insert(name, slot.fallback());
                }
            },
            SlotKind::Force => match peek_token(units, *pos, is_boundary) {
                Peek::Word(_) | Peek::Element(_) => {
                    *pos += 1;
                    let value = slot
                        .default
                        .clone()
                        .unwrap_or_else(|| slot.pattern.type_default());
                    out.insert(name, value);
                }
                Peek::End | Peek::Boundary => match &slot.default {
                    Some(default) => {
                        out.insert(name, default.clone());
                    }
                    None => return Err(ParseError::MissingArgument { slot: name }),
                },
            },
            SlotKind::Anti => match peek_token(units, *pos, is_boundary) {
                Peek::Word(token) => {
                    if slot.pattern.coerce(&token).is_some() {
                        match &slot.default {
                            Some(default) => {
                                out.insert(name, default.clone());
                            }
                            None => {
                                return Err(ParseError::SlotMismatch { slot: name, token });
                            }
                        }
                    } else {
                        *pos += 1;
                        out.insert(name, ArgValue::Str(token));
                    }
                }
                Peek::Element(token) => {
                    *pos += 1;
                    out.insert(name, ArgValue::Str(token));
                }
                Peek::End | Peek::Boundary => match &slot.default {
                    Some(default) => {
                        out.insert(name, default.clone());
                    }
                    None => return Err(ParseError::MissingArgument { slot: name }),
                },
            },
            SlotKind::Variadic => {
                let keyworded_later = slots[index + 1..]
                    .iter()
                    .any(|s| s.kind == SlotKind::KeywordVariadic || s.kind == SlotKind::Keyword);
                let mut items = Vec::new();
                loop {
                    match peek_token(units, *pos, is_boundary) {
                        Peek::Word(token) => {
                            if keyworded_later && looks_keyworded(&token) {
                                break;
                            }
                            match slot.pattern.coerce(&token) {
                                Some(value) => {
                                    *pos += 1;
                                    items.push(value);
                                }
                                None => break,
                            }
                        }
                        _ => break,
                    }
                }
                let value = if items.is_empty() {
                    slot.fallback()
                } else {
                    ArgValue::List(items)
                };
                out.insert(name, value);
            }
            SlotKind::KeywordVariadic => {
                let mut map = BTreeMap::new();
                loop {
                    match peek_token(units, *pos, is_boundary) {
                        Peek::Word(token) => match token.split_once('=') {
                            Some((key, raw)) if !key.is_empty() => {
                                match slot.pattern.coerce(raw) {
                                    Some(value) => {
                                        *pos += 1;
                                        map.insert(key.to_string(), value);
                                    }
                                    None => break,
                                }
                            }
                            _ => break,
                        },
                        _ => break,
                    }
                }
                let value = if map.is_empty() {
                    slot.fallback()
                } else {
                    ArgValue::Map(map)
                };
                out.insert(name, value);
            }
            SlotKind::Keyword => match peek_token(units, *pos, is_boundary) {
                Peek::Word(token) => match token.split_once('=') {
                    Some((key, raw)) if key == slot.name => match slot.pattern.coerce(raw) {
                        Some(value) => {
                            *pos += 1;
                            out.insert(name, value);
                        }
                        None => {
                            return Err(ParseError::SlotMismatch { slot: name, token });
                        }
                    },
                    _ => match &slot.default {
                        Some(default) => {
                            out.insert(name, default.clone());
                        }
                        None => {
                            return Err(ParseError::SlotMismatch { slot: name, token });
                        }
                    },
                },
                Peek::Element(token) => match &slot.default {
                    Some(default) => {
                        out.insert(name, default.clone());
                    }
                    None => return Err(ParseError::SlotMismatch { slot: name, token }),
                },
                Peek::End | Peek::Boundary => match &slot.default {
                    Some(default) => {
                        out.insert(name, default.clone());
                    }
                    None => return Err(ParseError::MissingArgument { slot: name }),
                },
            },
        }
    }

    Ok(out)
}

fn looks_keyworded(token: &str) -> bool {
    token
        .split_once('=')
        .is_some_and(|(key, _)| !key.is_empty())
}

/// Evaluates a constraint model against a raw line, outside any grammar.
///
/// The standalone entry point for exercising slot semantics directly;
/// leftover tokens are ignored.
///
/// # Examples
///
/// ```
/// use command_grammar_core::{Args, ArgValue, SlotPattern};
/// use command_grammar_engine::parse_args;
///
/// let args = Args::builder()
///     .required("foo", SlotPattern::Int)
///     .default("de", SlotPattern::Bool, ArgValue::Bool(true))
///     .build()
///     .unwrap();
///
/// let matched = parse_args(&args, "123").unwrap();
/// assert_eq!(matched["foo"], ArgValue::Int(123));
/// assert_eq!(matched["de"], ArgValue::Bool(true));
///
/// let matched = parse_args(&args, "123 False").unwrap();
/// assert_eq!(matched["de"], ArgValue::Bool(false));
/// ```
pub fn parse_args(
    args: &Args,
    line: &str,
) -> Result<BTreeMap<String, ArgValue>, ParseError> {
    let mut units: Vec<Unit> = crate::token::split(line, " ")
        .into_iter()
        .map(Unit::Word)
        .collect();
    let mut pos = 0;
    let no_boundary = |_: &str| false;
    evaluate_args(args, &mut units, &mut pos, &no_boundary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_grammar_core::SlotPattern;

    fn compile(command: Command) -> CommandParser {
        CommandParser::compile(Arc::new(command))
    }

    fn int_main(name: &str) -> Args {
        Args::builder()
            .required(name, SlotPattern::Int)
            .build()
            .unwrap()
    }

    #[test]
    fn test_disorder_tolerance() {
        let cmd = Command::builder("cmd")
            .option(OptionSpec::new("foo").unwrap())
            .main_args(int_main("bar"))
            .build()
            .unwrap();
        let mut parser = compile(cmd);

        let a = parser.parse_line("cmd foo 1");
        let b = parser.parse_line("cmd 1 foo");
        assert!(a.matched, "{:?}", a.error_info);
        assert!(b.matched, "{:?}", b.error_info);
        assert_eq!(a.options, b.options);
        assert_eq!(a.main_args, b.main_args);
        assert_eq!(a.main_args["bar"], ArgValue::Int(1));
        assert!(a.options.contains_key("foo"));
    }

    #[test]
    fn test_header_combinations() {
        let cmd = Command::builder("cmd")
            .header("!")
            .header("/")
            .build()
            .unwrap();
        let mut parser = compile(cmd);
        assert!(parser.parse_line("!cmd").matched);
        assert!(parser.parse_line("/cmd").matched);
        let miss = parser.parse_line("?cmd");
        assert!(!miss.matched);
    }

    #[test]
    fn test_element_header() {
        let cmd = Command::builder("weather")
            .header_matcher(HeaderMatcher::Element {
                kind: "at".to_string(),
            })
            .build()
            .unwrap();
        let mut parser = compile(cmd);
        let input = MessageInput::from_segments(
            &[
                crate::token::Segment::Element {
                    kind: "at".to_string(),
                    value: "8888".to_string(),
                },
                crate::token::Segment::Text("weather".to_string()),
            ],
            " ",
        );
        let result = parser.parse(&input);
        assert!(result.matched, "{:?}", result.error_info);
        assert_eq!(result.header, Some(ArgValue::Str("8888".to_string())));
    }

    #[test]
    fn test_option_args_and_repeat_overwrites() {
        let cmd = Command::builder("cmd")
            .option(
                OptionSpec::new("--level")
                    .unwrap()
                    .with_args(int_main("n")),
            )
            .build()
            .unwrap();
        let mut parser = compile(cmd);
        let result = parser.parse_line("cmd --level 1 --level 2");
        assert!(result.matched);
        assert_eq!(result.options["level"].args["n"], ArgValue::Int(2));
    }

    #[test]
    fn test_subcommand_scope() {
        let cmd = Command::builder("pip")
            .subcommand(
                SubcommandSpec::new("install")
                    .unwrap()
                    .with_option(OptionSpec::new("--upgrade|-U").unwrap())
                    .with_args(
                        Args::builder()
                            .required("pak", SlotPattern::Str)
                            .build()
                            .unwrap(),
                    ),
            )
            .build()
            .unwrap();
        let mut parser = compile(cmd);
        let result = parser.parse_line("pip install requests --upgrade");
        assert!(result.matched, "{:?}", result.error_info);
        let sub = &result.subcommands["install"];
        assert_eq!(sub.args["pak"], ArgValue::Str("requests".to_string()));
        assert!(sub.options.contains_key("upgrade"));
        assert_eq!(result.get("pak"), Some(&ArgValue::Str("requests".to_string())));
    }

    #[test]
    fn test_requires_path_via_sentences() {
        let cmd = Command::builder("git")
            .option(OptionSpec::new("remote add --track").unwrap())
            .build()
            .unwrap();
        let mut parser = compile(cmd);
        let ok = parser.parse_line("git remote add --track");
        assert!(ok.matched, "{:?}", ok.error_info);
        assert!(ok.options.contains_key("remote_add_--track"));

        let missing = parser.parse_line("git --track");
        assert!(!missing.matched);
    }

    #[test]
    fn test_help_interception_short_circuits() {
        let cmd = Command::builder("cmd")
            .main_args(int_main("bar"))
            .build()
            .unwrap();
        let mut parser = compile(cmd);
        // Required main arg absent, but --help still wins.
        let result = parser.parse_line("cmd --help");
        assert!(result.is_help_request());
        let text = result.help_text.unwrap();
        assert!(text.contains("--help"));
    }

    #[test]
    fn test_compact_option() {
        let cmd = Command::builder("gcc")
            .option(
                OptionSpec::new("-O")
                    .unwrap()
                    .separate("")
                    .with_args(int_main("level")),
            )
            .build()
            .unwrap();
        let mut parser = compile(cmd);
        let result = parser.parse_line("gcc -O3");
        assert!(result.matched, "{:?}", result.error_info);
        assert_eq!(result.options["O"].args["level"], ArgValue::Int(3));
    }

    #[test]
    fn test_unknown_token_fails_with_suggestion() {
        let cmd = Command::builder("cmd")
            .option(OptionSpec::new("foobar").unwrap())
            .build()
            .unwrap();
        let mut parser = compile(cmd).with_fuzzy(FuzzyOpts {
            enabled: true,
            threshold: 0.6,
        });
        let result = parser.parse_line("cmd foobaz");
        assert!(!result.matched);
        let info = result.error_info.unwrap();
        assert_eq!(info.suggestion.as_deref(), Some("foobar"));
    }

    #[test]
    fn test_parse_args_choice() {
        let args = Args::builder()
            .required(
                "choice",
                SlotPattern::Choice(vec!["a".into(), "b".into(), "c".into()]),
            )
            .build()
            .unwrap();
        assert_eq!(
            parse_args(&args, "a").unwrap()["choice"],
            ArgValue::Str("a".to_string())
        );
        assert!(matches!(
            parse_args(&args, "d"),
            Err(ParseError::SlotMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_args_anti_pattern() {
        let args = Args::builder()
            .anti("anti", SlotPattern::regex(r"(.+?)/(.+?)\.py").unwrap())
            .build()
            .unwrap();
        assert_eq!(
            parse_args(&args, "a/b.mp3").unwrap()["anti"],
            ArgValue::Str("a/b.mp3".to_string())
        );
        assert!(matches!(
            parse_args(&args, "a/b.py"),
            Err(ParseError::SlotMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_args_variadic_and_keyword_variadic() {
        let args = Args::builder()
            .variadic("multi", SlotPattern::Str)
            .build()
            .unwrap();
        let matched = parse_args(&args, "a b c d").unwrap();
        assert_eq!(
            matched["multi"],
            ArgValue::List(vec![
                ArgValue::Str("a".into()),
                ArgValue::Str("b".into()),
                ArgValue::Str("c".into()),
                ArgValue::Str("d".into()),
            ])
        );

        let args = Args::builder()
            .keyword_variadic("kwargs", SlotPattern::Str)
            .build()
            .unwrap();
        let matched = parse_args(&args, "a=b c=d").unwrap();
        let ArgValue::Map(map) = &matched["kwargs"] else {
            panic!("expected map capture");
        };
        assert_eq!(map["a"], ArgValue::Str("b".to_string()));
        assert_eq!(map["c"], ArgValue::Str("d".to_string()));
    }

    #[test]
    fn test_parse_args_keyword_requires_named_form() {
        let args = Args::builder()
            .keyword("bar", SlotPattern::Int)
            .build()
            .unwrap();
        assert_eq!(parse_args(&args, "bar=123").unwrap()["bar"], ArgValue::Int(123));
        assert!(matches!(
            parse_args(&args, "123"),
            Err(ParseError::SlotMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_args_force_discards_value() {
        let args = Args::builder()
            .force("bar", SlotPattern::Bool)
            .build()
            .unwrap();
        assert_eq!(
            parse_args(&args, "True").unwrap()["bar"],
            ArgValue::Bool(false)
        );
    }

    #[test]
    fn test_parse_args_optional_tolerates_mismatch() {
        let args = Args::builder()
            .optional("bar", SlotPattern::Int)
            .build()
            .unwrap();
        assert_eq!(parse_args(&args, "abc").unwrap()["bar"], ArgValue::None);
        assert_eq!(parse_args(&args, "42").unwrap()["bar"], ArgValue::Int(42));
    }

    #[test]
    fn test_parser_reuse_requires_no_manual_reset() {
        let cmd = Command::builder("cmd")
            .main_args(int_main("bar"))
            .build()
            .unwrap();
        let mut parser = compile(cmd);
        assert!(parser.parse_line("cmd 1").matched);
        assert!(!parser.parse_line("cmd x").matched);
        let again = parser.parse_line("cmd 2");
        assert!(again.matched);
        assert_eq!(again.main_args["bar"], ArgValue::Int(2));
    }
}
