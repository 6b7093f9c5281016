//! Post-match behavior pipeline.
//!
//! Behaviors run in declared order over a matched result, through a narrow
//! mutation interface. A behavior may inject defaults, rewrite fields, or
//! veto the match. After a veto, every remaining behavior still executes and
//! observes the full result, but positive mutations become no-ops, so vetoes
//! compose independently.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use command_grammar_core::ArgValue;

use crate::result::{ErrorInfo, FailureKind, MatchResult, OptionMatch, SubcommandMatch};

/// A post-match transform or validator.
pub trait MatchBehavior: Send + Sync {
    /// Observes and optionally mutates the result through the context.
    fn operate(&self, ctx: &mut BehaviorContext<'_>);
}

/// Mutation interface handed to behaviors.
///
/// Read access is unrestricted; write access is suppressed once any behavior
/// has vetoed the match.
pub struct BehaviorContext<'a> {
    result: &'a mut MatchResult,
    vetoed: bool,
}

impl<'a> BehaviorContext<'a> {
    fn new(result: &'a mut MatchResult) -> Self {
        Self {
            result,
            vetoed: false,
        }
    }

    /// Resolves a dotted path into the result (see [`MatchResult::query`]).
    pub fn require(&self, path: &str) -> Option<ArgValue> {
        self.result.query(path)
    }

    /// Current matched flag.
    pub fn matched(&self) -> bool {
        self.result.matched
    }

    /// Vetoes the match with a diagnostic. Idempotent; the first veto wins.
    pub fn veto(&mut self, kind: FailureKind, message: &str) {
        if self.vetoed {
            return;
        }
        self.vetoed = true;
        self.result.matched = false;
        self.result.error_info = Some(ErrorInfo {
            kind,
            message: message.to_string(),
            suggestion: None,
        });
    }

    /// Sets the matched flag; `false` behaves like a generic veto.
    pub fn set_matched(&mut self, matched: bool) {
        if matched {
            if !self.vetoed {
                self.result.matched = true;
            }
        } else {
            self.veto(FailureKind::Vetoed, "vetoed by behavior");
        }
    }

    /// Writes a main-argument slot value.
    pub fn set_main_arg(&mut self, name: &str, value: ArgValue) {
        if self.vetoed {
            return;
        }
        self.result
            .main_args
            .insert(name.to_string(), value.clone());
        self.result
            .all_matched_args
            .insert(name.to_string(), value);
    }

    /// Writes an option's value, creating the record when absent.
    pub fn set_option(&mut self, dest: &str, value: ArgValue) {
        if self.vetoed {
            return;
        }
        self.result
            .options
            .entry(dest.to_string())
            .or_insert_with(OptionMatch::default)
            .value = value;
    }

    /// Writes a subcommand's value, creating the record when absent.
    pub fn set_subcommand(&mut self, dest: &str, value: ArgValue) {
        if self.vetoed {
            return;
        }
        self.result
            .subcommands
            .entry(dest.to_string())
            .or_insert_with(SubcommandMatch::default)
            .value = value;
    }
}

/// Runs a behavior list over a result, in order.
///
/// Only invoked for matched, non-help results; every behavior executes even
/// after a veto.
pub fn run_behaviors(mut result: MatchResult, behaviors: &[Arc<dyn MatchBehavior>]) -> MatchResult {
    if !result.matched || result.is_help_request() {
        return result;
    }
    let mut ctx = BehaviorContext::new(&mut result);
    for behavior in behaviors {
        behavior.operate(&mut ctx);
    }
    result
}

/// Where [`set_default`] injects its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultTarget {
    /// A main-argument slot.
    MainArg(String),
    /// An option, by dest key.
    Option(String),
    /// A subcommand, by dest key.
    Subcommand(String),
}

struct SetDefault {
    value: ArgValue,
    target: DefaultTarget,
}

impl MatchBehavior for SetDefault {
    fn operate(&self, ctx: &mut BehaviorContext<'_>) {
        match &self.target {
            DefaultTarget::MainArg(name) => {
                if ctx.require(&format!("main_args.{name}")).is_none() {
                    ctx.set_main_arg(name, self.value.clone());
                }
            }
            DefaultTarget::Option(dest) => {
                if ctx.require(&format!("options.{dest}")).is_none() {
                    ctx.set_option(dest, self.value.clone());
                }
            }
            DefaultTarget::Subcommand(dest) => {
                if ctx.require(&format!("subcommands.{dest}")).is_none() {
                    ctx.set_subcommand(dest, self.value.clone());
                }
            }
        }
    }
}

/// Injects a value into an absent-but-optional slot, option, or subcommand.
///
/// # Examples
///
/// ```
/// use command_grammar_core::ArgValue;
/// use command_grammar_engine::behavior::{DefaultTarget, set_default};
///
/// let behavior = set_default(ArgValue::Int(321), DefaultTarget::Option("foo".into()));
/// # let _ = behavior;
/// ```
pub fn set_default(value: ArgValue, target: DefaultTarget) -> Arc<dyn MatchBehavior> {
    Arc::new(SetDefault { value, target })
}

struct Exclusion {
    target_path: String,
    other_path: String,
}

impl MatchBehavior for Exclusion {
    fn operate(&self, ctx: &mut BehaviorContext<'_>) {
        if ctx.require(&self.target_path).is_some() && ctx.require(&self.other_path).is_some() {
            ctx.veto(
                FailureKind::MutuallyExclusive,
                &format!(
                    "{} and {} are mutually exclusive",
                    self.target_path, self.other_path
                ),
            );
        }
    }
}

/// Vetoes the match when both paths matched.
pub fn exclusion(target_path: &str, other_path: &str) -> Arc<dyn MatchBehavior> {
    Arc::new(Exclusion {
        target_path: target_path.to_string(),
        other_path: other_path.to_string(),
    })
}

struct CoolDown {
    window: Duration,
    // Monotonic timestamp of the last accepted call; the read-decide-write
    // sequence holds the lock so two near-simultaneous calls cannot both pass.
    last: Mutex<Option<Instant>>,
}

impl MatchBehavior for CoolDown {
    fn operate(&self, ctx: &mut BehaviorContext<'_>) {
        let mut last = self.last.lock().expect("cooldown state poisoned");
        let now = Instant::now();
        match *last {
            Some(previous) if now.duration_since(previous) < self.window => {
                ctx.veto(
                    FailureKind::CooldownActive,
                    &format!("cooldown active: retry after {:?}", self.window),
                );
            }
            _ => *last = Some(now),
        }
    }
}

/// Vetoes matches arriving within `window` of the previous accepted one.
///
/// State is per behavior instance; attach one instance per command
/// registration to rate-limit that command.
pub fn cool_down(window: Duration) -> Arc<dyn MatchBehavior> {
    Arc::new(CoolDown {
        window,
        last: Mutex::new(None),
    })
}
