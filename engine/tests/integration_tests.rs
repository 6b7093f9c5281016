//! End-to-end tests across the grammar model, parser, behaviors, and
//! registry.

use std::sync::Arc;
use std::time::Duration;

use command_grammar_core::{
    ArgValue, Args, Command, CommandLayout, OptionSpec, SlotPattern, SubcommandSpec,
};
use command_grammar_engine::behavior::{DefaultTarget, cool_down, exclusion, set_default};
use command_grammar_engine::{
    CommandRegistry, CommandStub, EngineConfig, FailureKind, ParseMode, RegistryError,
};

fn registry() -> CommandRegistry {
    CommandRegistry::new(EngineConfig::default())
}

fn pip_command() -> Command {
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
                        .build()
                        .unwrap(),
                ),
        )
        .build()
        .unwrap()
}

#[test]
fn disorder_tolerant_matching_is_order_independent() {
    let registry = registry();
    let identity = registry
        .register(
            Command::builder("cmd")
                .option(OptionSpec::new("foo").unwrap())
                .main_args(
                    Args::builder()
                        .required("bar", SlotPattern::Int)
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap(),
        )
        .unwrap();

    let a = registry.parse(&identity, "cmd foo 1", ParseMode::Static).unwrap();
    let b = registry.parse(&identity, "cmd 1 foo", ParseMode::Static).unwrap();
    assert!(a.matched && b.matched);
    assert_eq!(a.options, b.options);
    assert_eq!(a.main_args, b.main_args);
    assert_eq!(a.main_args["bar"], ArgValue::Int(1));
}

#[test]
fn full_command_parse_with_header_and_subcommand() {
    let registry = registry();
    let identity = registry.register(pip_command()).unwrap();

    let result = registry
        .parse(&identity, "/pip install requests --upgrade", ParseMode::Static)
        .unwrap();
    assert!(result.matched, "{:?}", result.error_info);
    assert_eq!(result.header, Some(ArgValue::Str("/pip".to_string())));
    let sub = &result.subcommands["install"];
    assert_eq!(sub.args["pak"], ArgValue::Str("requests".to_string()));
    assert!(sub.options.contains_key("upgrade"));
    assert_eq!(
        result.all_matched_args["pak"],
        ArgValue::Str("requests".to_string())
    );
}

#[test]
fn static_and_dynamic_modes_agree() {
    let registry = registry();
    let identity = registry.register(pip_command()).unwrap();
    let line = "/pip install requests -U --retries 3";
    let fixed = registry.parse(&identity, line, ParseMode::Static).unwrap();
    let fresh = registry.parse(&identity, line, ParseMode::Dynamic).unwrap();
    assert_eq!(fixed, fresh);
}

#[test]
fn layout_round_trip_preserves_grammar_and_behavior() {
    let original = pip_command();
    let layout = original.to_layout().unwrap();

    let json = serde_json::to_string(&layout).unwrap();
    let restored_layout: CommandLayout = serde_json::from_str(&json).unwrap();
    assert_eq!(restored_layout, layout);

    let restored = Command::from_layout(&restored_layout).unwrap();
    assert_eq!(restored.to_layout().unwrap(), layout);

    // The restored grammar parses identically.
    let registry = registry();
    let identity = registry.register(restored).unwrap();
    let result = registry
        .parse(&identity, "/pip install requests", ParseMode::Static)
        .unwrap();
    assert!(result.matched);
}

#[test]
fn default_injection_behavior_fills_absent_option() {
    let registry = registry();
    let identity = registry
        .register_with_behaviors(
            Command::builder("command")
                .option(OptionSpec::new("foo").unwrap())
                .main_args(
                    Args::builder()
                        .required("bar", SlotPattern::Int)
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap(),
            vec![set_default(
                ArgValue::Int(321),
                DefaultTarget::Option("foo".into()),
            )],
        )
        .unwrap();

    let result = registry
        .parse(&identity, "command 123", ParseMode::Static)
        .unwrap();
    assert!(result.matched);
    assert_eq!(result.options["foo"].value, ArgValue::Int(321));
    assert_eq!(result.main_args["bar"], ArgValue::Int(123));
}

#[test]
fn exclusion_behavior_vetoes_conflicting_options() {
    let registry = registry();
    let identity = registry
        .register_with_behaviors(
            Command::builder("exclusive")
                .option(OptionSpec::new("foo").unwrap())
                .option(OptionSpec::new("bar").unwrap())
                .build()
                .unwrap(),
            vec![exclusion("options.foo", "options.bar")],
        )
        .unwrap();

    let ok = registry
        .parse(&identity, "exclusive foo", ParseMode::Static)
        .unwrap();
    assert!(ok.matched);

    let vetoed = registry
        .parse(&identity, "exclusive foo bar", ParseMode::Static)
        .unwrap();
    assert!(!vetoed.matched);
    assert_eq!(
        vetoed.error_info.unwrap().kind,
        FailureKind::MutuallyExclusive
    );
}

#[test]
fn cooldown_behavior_rate_limits_alternate_calls() {
    let registry = registry();
    let identity = registry
        .register_with_behaviors(
            Command::builder("cool")
                .main_args(
                    Args::builder()
                        .required("bar", SlotPattern::Int)
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap(),
            vec![cool_down(Duration::from_millis(200))],
        )
        .unwrap();

    let mut outcomes = Vec::new();
    for i in 0..4 {
        std::thread::sleep(Duration::from_millis(100));
        let result = registry
            .parse(&identity, &format!("cool {i}"), ParseMode::Static)
            .unwrap();
        if result.matched {
            outcomes.push(true);
        } else {
            assert_eq!(
                result.error_info.as_ref().unwrap().kind,
                FailureKind::CooldownActive
            );
            outcomes.push(false);
        }
    }
    assert_eq!(outcomes, vec![true, false, true, false]);
}

#[test]
fn capacity_is_enforced_on_the_next_registration() {
    let config = EngineConfig {
        command_max_count: 4,
        ..EngineConfig::default()
    };
    let registry = CommandRegistry::new(config);
    for name in ["a", "b", "c", "d"] {
        registry
            .register(Command::builder(name).build().unwrap())
            .unwrap();
    }
    assert!(matches!(
        registry.register(Command::builder("e").build().unwrap()),
        Err(RegistryError::CapacityExceeded { max: 4 })
    ));
    assert_eq!(registry.len(), 4);
}

#[test]
fn fuzzy_suggestion_names_the_closest_command() {
    let config = EngineConfig {
        fuzzy_match: true,
        ..EngineConfig::default()
    };
    let registry = CommandRegistry::new(config);
    registry.register(pip_command()).unwrap();
    registry
        .register(Command::builder("npm").header("/").build().unwrap())
        .unwrap();

    // Near-miss lookup carries the closest registered name.
    match registry.require("/pio") {
        Err(RegistryError::UnknownCommand { suggestion, .. }) => {
            assert_eq!(suggestion.as_deref(), Some("/pip"));
        }
        other => panic!("expected UnknownCommand, got {other:?}"),
    }

    // Near-miss input gets an in-result suggestion.
    let identity = registry.require("/pip").map(|e| e.command().identity());
    let identity = identity.unwrap();
    let result = registry
        .parse(&identity, "/pip instal requests", ParseMode::Static)
        .unwrap();
    assert!(!result.matched);
    assert_eq!(
        result.error_info.unwrap().suggestion.as_deref(),
        Some("install")
    );
}

#[test]
fn help_is_intercepted_anywhere_in_the_body() {
    let registry = registry();
    let identity = registry.register(pip_command()).unwrap();
    let result = registry
        .parse(&identity, "/pip --help", ParseMode::Static)
        .unwrap();
    assert!(result.is_help_request());
    let text = result.help_text.unwrap();
    assert!(text.contains("package installer"));
    assert!(text.contains("--retries"));
    assert!(text.contains("install"));
}

#[test]
fn shortcut_expands_and_reserves_trailing_tokens() {
    let registry = registry();
    let identity = registry.register(pip_command()).unwrap();
    registry
        .add_shortcut(&identity, "pi", "/pip install", true)
        .unwrap();

    let result = registry
        .parse_shortcut("pi", &["requests"], ParseMode::Static)
        .unwrap();
    assert!(result.matched, "{:?}", result.error_info);
    assert_eq!(
        result.subcommands["install"].args["pak"],
        ArgValue::Str("requests".to_string())
    );
}

#[test]
fn broadcast_finds_the_first_matching_command() {
    let registry = registry();
    registry.register(pip_command()).unwrap();
    registry
        .register(
            Command::builder("echo")
                .main_args(
                    Args::builder()
                        .variadic("rest", SlotPattern::Str)
                        .build()
                        .unwrap(),
                )
                .build()
                .unwrap(),
        )
        .unwrap();

    let (identity, result) = registry.broadcast("echo hello world").unwrap();
    assert_eq!(identity, "main::echo");
    assert!(result.matched);
    assert!(registry.broadcast("nothing matches this").is_none());
}

#[test]
fn paginated_help_lists_registered_commands() {
    let registry = registry();
    for name in ["alpha", "beta", "gamma"] {
        registry
            .register(Command::builder(name).help_text(name).build().unwrap())
            .unwrap();
    }
    let page = registry.all_command_help(2, 1, "[{current}/{total}]");
    assert!(page.starts_with("[1/2]"));
    assert!(page.contains("alpha"));
    assert!(page.contains("beta"));
    assert!(!page.contains("gamma"));
}

#[test]
fn stub_view_reads_without_mutating() {
    let registry = registry();
    let identity = registry.register(pip_command()).unwrap();
    let entry = registry.require(&identity).unwrap();
    let result = registry
        .parse(&identity, "/pip install requests -U", ParseMode::Static)
        .unwrap();

    let mut stub = CommandStub::new(Arc::clone(entry.command()));
    stub.set_target(&result);
    assert!(stub.matched());
    let sub = stub.subcommand("install").unwrap();
    assert_eq!(sub.arg::<String>("pak").unwrap(), "requests");
    assert!(sub.option("upgrade").is_ok());
    assert_eq!(stub.arg::<String>("pak").unwrap(), "requests");

    // The result itself is unchanged by stub access.
    let again = registry
        .parse(&identity, "/pip install requests -U", ParseMode::Static)
        .unwrap();
    assert_eq!(again, result);
}

#[test]
fn raise_on_failure_surfaces_parse_errors() {
    let registry = registry();
    let identity = registry
        .register(
            Command::builder("strict")
                .main_args(
                    Args::builder()
                        .required("n", SlotPattern::Int)
                        .build()
                        .unwrap(),
                )
                .raise_on_failure(true)
                .build()
                .unwrap(),
        )
        .unwrap();

    assert!(registry.parse(&identity, "strict 1", ParseMode::Static).is_ok());
    assert!(matches!(
        registry.parse(&identity, "strict x", ParseMode::Static),
        Err(RegistryError::Unmatched(_))
    ));
}
