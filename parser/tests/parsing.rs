//! End-to-end matching tests against built command graphs.

use argbind_core::*;
use argbind_parser::{
    Error, MapEnvironment, ParseResult, Parser, ScriptedPrompter, ValueOrigin, complete,
};
use proptest::prelude::*;
use std::sync::Arc;

fn int() -> TypeDescriptor {
    TypeDescriptor::Scalar(ScalarType::Integer)
}

fn string() -> TypeDescriptor {
    TypeDescriptor::Scalar(ScalarType::String)
}

fn archive_def() -> CommandDef {
    CommandDef::new("archive")
        .with_option(OptionDef::flag(&["-a"]))
        .with_option(OptionDef::flag(&["-b"]))
        .with_option(OptionDef::flag(&["-c"]))
        .with_option(
            OptionDef::with_value(&["-n", "--numbers"], TypeDescriptor::Collection(ScalarType::Integer))
                .with_split(","),
        )
        .with_option(OptionDef::with_value(&["-l", "--level"], int()))
        .with_option(OptionDef::flag(&["--color"]).negatable())
        .with_positional(PositionalDef::optional(
            "<files>",
            TypeDescriptor::Collection(ScalarType::Path),
        ))
}

fn parse(graph: &CommandGraph, args: &[&str]) -> Result<ParseResult, Error> {
    Parser::new(graph).unwrap().parse(args.iter().copied())
}

fn value<'r>(result: &'r ParseResult, graph: &CommandGraph, name: &str) -> Option<&'r Value> {
    result.get(graph, name)
}

proptest! {
    #[test]
    fn test_clustered_flags_match_separate_flags(
        letters in prop::collection::vec(prop::sample::select(vec!['a', 'b', 'c']), 1..6)
    ) {
        let graph = archive_def().build().unwrap();
        let clustered: String = std::iter::once('-').chain(letters.iter().copied()).collect();
        let separate: Vec<String> = letters.iter().map(|c| format!("-{c}")).collect();

        let left = Parser::new(&graph).unwrap().parse([clustered]).unwrap();
        let right = Parser::new(&graph).unwrap().parse(separate).unwrap();
        for name in ["-a", "-b", "-c"] {
            prop_assert_eq!(value(&left, &graph, name), value(&right, &graph, name));
        }
    }

    #[test]
    fn test_split_values_become_separate_elements(
        numbers in prop::collection::vec(0u16..1000, 1..8)
    ) {
        let graph = archive_def().build().unwrap();
        let joined = numbers.iter().map(u16::to_string).collect::<Vec<_>>().join(",");
        let result = Parser::new(&graph).unwrap().parse([format!("-n{joined}")]).unwrap();
        let expected = Value::List(numbers.iter().map(|n| Value::Int(i64::from(*n))).collect());
        prop_assert_eq!(value(&result, &graph, "--numbers"), Some(&expected));
    }
}

#[test]
fn test_scalar_keeps_last_value() {
    let graph = archive_def().build().unwrap();
    let result = parse(&graph, &["--level", "1", "-l", "2"]).unwrap();
    assert_eq!(value(&result, &graph, "--level"), Some(&Value::Int(2)));
    assert_eq!(result.match_count(graph.find_option(graph.root(), "-l").unwrap().id), 2);
}

#[test]
fn test_collection_accumulates_values() {
    let graph = archive_def().build().unwrap();
    let result = parse(&graph, &["-n", "1,2", "--numbers=3"]).unwrap();
    assert_eq!(
        value(&result, &graph, "-n"),
        Some(&Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
    );
}

#[test]
fn test_overwriting_can_be_rejected() {
    let graph = archive_def().build().unwrap();
    let config = ParserConfig {
        overwritten_options_allowed: false,
        ..ParserConfig::default()
    };
    let parser = Parser::configured(&graph, config, &ConverterRegistry::new()).unwrap();
    let err = parser.parse(["-l", "1", "-l", "2"]).unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            source: ParseError::OptionOverwritten { .. },
            ..
        }
    ));
}

#[test]
fn test_same_input_gives_equal_results_across_graphs() {
    let first = archive_def().build().unwrap();
    let second = archive_def().build().unwrap();
    let args = ["-ab", "--level=4", "-n", "7,8", "one.txt", "two.txt"];
    assert_eq!(parse(&first, &args).unwrap(), parse(&second, &args).unwrap());
}

#[test]
fn test_negated_form_sets_false() {
    let graph = archive_def().build().unwrap();
    let result = parse(&graph, &["--no-color"]).unwrap();
    assert_eq!(value(&result, &graph, "--color"), Some(&Value::Bool(false)));

    let result = parse(&graph, &["--color"]).unwrap();
    assert_eq!(value(&result, &graph, "--color"), Some(&Value::Bool(true)));
}

#[test]
fn test_negation_is_relative_to_the_default() {
    let graph = CommandDef::new("sync")
        .with_option(OptionDef::flag(&["--no-backup"]).negatable().with_default("true"))
        .with_option(OptionDef::flag(&["--color"]).negatable().with_default("true"))
        .build()
        .unwrap();

    let result = parse(&graph, &[]).unwrap();
    assert_eq!(value(&result, &graph, "--no-backup"), Some(&Value::Bool(true)));
    let result = parse(&graph, &["--no-backup"]).unwrap();
    assert_eq!(value(&result, &graph, "--no-backup"), Some(&Value::Bool(false)));
    let result = parse(&graph, &["--backup"]).unwrap();
    assert_eq!(value(&result, &graph, "--no-backup"), Some(&Value::Bool(true)));

    let result = parse(&graph, &["--no-color"]).unwrap();
    assert_eq!(value(&result, &graph, "--color"), Some(&Value::Bool(true)));
    let result = parse(&graph, &["--color"]).unwrap();
    assert_eq!(value(&result, &graph, "--color"), Some(&Value::Bool(false)));
}

#[test]
fn test_unmatched_flag_defaults_to_false() {
    let graph = archive_def().build().unwrap();
    let result = parse(&graph, &[]).unwrap();
    let a = graph.find_option(graph.root(), "-a").unwrap().id;
    assert_eq!(result.value(a), Some(&Value::Bool(false)));
    assert_eq!(result.origin(a), Some(ValueOrigin::Implicit));
    assert!(!result.is_matched(a));
}

#[test]
fn test_resolved_values_serialize_with_origin() {
    let graph = archive_def().build().unwrap();
    let result = parse(&graph, &["--level", "4"]).unwrap();
    let level = graph.find_option(graph.root(), "--level").unwrap().id;
    let a = graph.find_option(graph.root(), "-a").unwrap().id;

    assert_eq!(
        serde_json::to_value(result.resolved(level)).unwrap(),
        serde_json::json!({"value": 4, "origin": "matched"})
    );
    assert_eq!(
        serde_json::to_value(result.resolved(a)).unwrap(),
        serde_json::json!({"value": false, "origin": "implicit"})
    );
}

#[test]
fn test_positionals_after_delimiter() {
    let graph = archive_def().build().unwrap();
    let result = parse(&graph, &["--", "-a", "--level"]).unwrap();
    assert_eq!(
        value(&result, &graph, "<files>"),
        Some(&Value::List(vec![
            Value::Path("-a".into()),
            Value::Path("--level".into())
        ]))
    );
    assert_eq!(value(&result, &graph, "-a"), Some(&Value::Bool(false)));
}

#[test]
fn test_unknown_option_is_rejected() {
    let graph = archive_def().build().unwrap();
    let err = parse(&graph, &["--bogus"]).unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            source: ParseError::UnknownOption { ref token },
            ..
        } if token == "--bogus"
    ));
}

#[test]
fn test_negative_number_is_a_value() {
    let graph = archive_def().build().unwrap();
    let result = parse(&graph, &["--level", "-5"]).unwrap();
    assert_eq!(value(&result, &graph, "--level"), Some(&Value::Int(-5)));

    let result = parse(&graph, &["--level", "-9223372036854775808"]).unwrap();
    assert_eq!(value(&result, &graph, "--level"), Some(&Value::Int(i64::MIN)));

    let err = parse(&graph, &["--level=--5"]).unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            source: ParseError::Conversion { .. },
            ..
        }
    ));
}

#[test]
fn test_missing_option_parameter() {
    let graph = archive_def().build().unwrap();
    let err = parse(&graph, &["--level"]).unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            source: ParseError::MissingParameter { found: None, .. },
            ..
        }
    ));

    let err = parse(&graph, &["--level", "-a"]).unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            source: ParseError::MissingParameter { found: Some(_), .. },
            ..
        }
    ));
}

#[test]
fn test_conversion_failure_names_the_option() {
    let graph = archive_def().build().unwrap();
    let err = parse(&graph, &["--level", "high"]).unwrap_err();
    let Error::Parse {
        source: ParseError::Conversion { name, value, .. },
        ..
    } = err
    else {
        panic!("expected conversion error, got {err:?}");
    };
    assert_eq!(name, "--level");
    assert_eq!(value, "high");
}

#[test]
fn test_unmatched_tokens_are_captured_when_allowed() {
    let graph = CommandDef::new("tool")
        .with_option(OptionDef::flag(&["-v"]))
        .build()
        .unwrap();
    let config = ParserConfig {
        unmatched_arguments_allowed: true,
        ..ParserConfig::default()
    };
    let parser = Parser::configured(&graph, config, &ConverterRegistry::new()).unwrap();
    let result = parser.parse(["--bogus", "-v", "stray"]).unwrap();
    assert_eq!(result.unmatched(), ["--bogus", "stray"]);
    assert_eq!(result.get(&graph, "-v"), Some(&Value::Bool(true)));
}

#[test]
fn test_stop_at_unmatched_captures_the_rest() {
    let graph = CommandDef::new("tool")
        .with_option(OptionDef::flag(&["-v"]))
        .build()
        .unwrap();
    let config = ParserConfig {
        stop_at_unmatched: true,
        ..ParserConfig::default()
    };
    let parser = Parser::configured(&graph, config, &ConverterRegistry::new()).unwrap();
    let result = parser.parse(["stray", "-v"]).unwrap();
    assert_eq!(result.unmatched(), ["stray", "-v"]);
    assert_eq!(result.get(&graph, "-v"), Some(&Value::Bool(false)));
}

#[test]
fn test_abbreviated_options() {
    let graph = CommandDef::new("tool")
        .with_option(OptionDef::flag(&["--verbose"]))
        .with_option(OptionDef::flag(&["--version-info"]))
        .with_option(OptionDef::with_value(&["--output-dir"], string()))
        .build()
        .unwrap();
    let config = ParserConfig {
        abbreviated_options: true,
        ..ParserConfig::default()
    };
    let parser = Parser::configured(&graph, config, &ConverterRegistry::new()).unwrap();

    let result = parser.parse(["--verb", "--o-d=out"]).unwrap();
    assert_eq!(result.get(&graph, "--verbose"), Some(&Value::Bool(true)));
    assert_eq!(result.get(&graph, "--output-dir"), Some(&Value::Str("out".into())));

    let err = parser.parse(["--ver"]).unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            source: ParseError::AmbiguousOption { .. },
            ..
        }
    ));
}

#[test]
fn test_exclusive_group_reports_one_violation() {
    let graph = CommandDef::new("tool")
        .with_option(OptionDef::flag(&["-x"]))
        .with_option(OptionDef::flag(&["-y"]))
        .with_group(GroupDef::exclusive("mode").with_arg("-x").with_arg("-y"))
        .build()
        .unwrap();
    let err = parse(&graph, &["-x", "-y"]).unwrap_err();
    let Error::Constraint { source, .. } = err else {
        panic!("expected constraint error, got {err:?}");
    };
    assert_eq!(source.violations.len(), 1);
    assert!(matches!(
        &source.violations[0],
        Violation::MutuallyExclusive { members, .. } if members == &["-x", "-y"]
    ));

    assert!(parse(&graph, &["-x"]).is_ok());
    assert!(parse(&graph, &[]).is_ok());
}

#[test]
fn test_repeated_member_counts_as_one_kind() {
    let graph = CommandDef::new("tool")
        .with_option(OptionDef::flag(&["-x"]))
        .with_option(OptionDef::flag(&["-y"]))
        .with_option(OptionDef::flag(&["-a"]))
        .with_option(OptionDef::flag(&["-b"]))
        .with_group(GroupDef::co_occurring("pair").with_arg("-a").with_arg("-b"))
        .with_group(GroupDef::exclusive("mode").with_arg("-x").with_arg("-y").with_group("pair"))
        .build()
        .unwrap();

    assert!(parse(&graph, &["-x", "-x"]).is_ok());
    assert!(parse(&graph, &["-a", "-b", "-a", "-b"]).is_ok());

    let err = parse(&graph, &["-x", "-a", "-b"]).unwrap_err();
    let Error::Constraint { source, .. } = err else {
        panic!("expected constraint error, got {err:?}");
    };
    assert!(matches!(
        &source.violations[..],
        [Violation::MutuallyExclusive { members, .. }] if members == &["-x", "(-a -b)"]
    ));
}

#[test]
fn test_multiplicity_counts_distinct_members() {
    let graph = CommandDef::new("tool")
        .with_option(OptionDef::flag(&["-x"]))
        .with_option(OptionDef::flag(&["-y"]))
        .with_group(
            GroupDef::exclusive("mode")
                .with_arg("-x")
                .with_arg("-y")
                .with_multiplicity(Arity::range(2, 2)),
        )
        .build()
        .unwrap();

    let err = parse(&graph, &["-x", "-x"]).unwrap_err();
    let Error::Constraint { source, .. } = err else {
        panic!("expected constraint error, got {err:?}");
    };
    assert!(matches!(
        &source.violations[..],
        [Violation::GroupMultiplicity { occurrences: 1, .. }]
    ));
}

#[test]
fn test_required_group_missing() {
    let graph = CommandDef::new("tool")
        .with_option(OptionDef::flag(&["-x"]))
        .with_option(OptionDef::flag(&["-y"]))
        .with_group(
            GroupDef::exclusive("mode")
                .with_arg("-x")
                .with_arg("-y")
                .required(),
        )
        .build()
        .unwrap();
    let err = parse(&graph, &[]).unwrap_err();
    let Error::Constraint { source, .. } = err else {
        panic!("expected constraint error, got {err:?}");
    };
    assert_eq!(
        source.violations,
        vec![Violation::MissingGroup {
            group: graph.root_groups(graph.root()).next().unwrap().id,
            label: "(-x | -y)".to_string(),
        }]
    );
}

#[test]
fn test_co_occurring_group_requires_all_members() {
    let graph = CommandDef::new("login")
        .with_option(OptionDef::with_value(&["--user"], string()).required())
        .with_option(OptionDef::with_value(&["--password"], string()).required())
        .with_group(
            GroupDef::co_occurring("credentials")
                .with_arg("--user")
                .with_arg("--password"),
        )
        .build()
        .unwrap();

    assert!(parse(&graph, &[]).is_ok());
    assert!(parse(&graph, &["--user", "u", "--password", "p"]).is_ok());

    let err = parse(&graph, &["--user", "u"]).unwrap_err();
    let Error::Constraint { source, .. } = err else {
        panic!("expected constraint error, got {err:?}");
    };
    assert!(matches!(
        &source.violations[..],
        [Violation::MissingInGroup { missing, .. }] if missing == &["--password"]
    ));
}

#[test]
fn test_all_violations_are_aggregated() {
    let graph = CommandDef::new("tool")
        .with_option(OptionDef::flag(&["-x"]))
        .with_option(OptionDef::flag(&["-y"]))
        .with_option(OptionDef::with_value(&["--name"], string()).required())
        .with_group(GroupDef::exclusive("mode").with_arg("-x").with_arg("-y"))
        .build()
        .unwrap();
    let err = parse(&graph, &["-x", "-y"]).unwrap_err();
    let Error::Constraint { source, .. } = err else {
        panic!("expected constraint error, got {err:?}");
    };
    assert_eq!(source.violations.len(), 2);
}

#[test]
fn test_help_request_skips_constraints() {
    let graph = CommandDef::new("tool")
        .with_option(OptionDef::flag(&["-h", "--help"]).usage_help())
        .with_option(OptionDef::with_value(&["--name"], string()).required())
        .build()
        .unwrap();
    let result = parse(&graph, &["--help"]).unwrap();
    assert!(result.usage_help_requested());
}

#[test]
fn test_required_positional_missing() {
    let graph = CommandDef::new("cp")
        .with_positional(PositionalDef::required("<source>", string()))
        .with_positional(PositionalDef::required("<target>", string()))
        .build()
        .unwrap();
    let err = parse(&graph, &["a"]).unwrap_err();
    let Error::Constraint { source, .. } = err else {
        panic!("expected constraint error, got {err:?}");
    };
    assert!(matches!(
        &source.violations[..],
        [Violation::MissingRequired { name, .. }] if name == "<target>"
    ));
}

#[test]
fn test_inherited_option_in_subcommand() {
    let graph = CommandDef::new("git")
        .with_option(OptionDef::flag(&["-v", "--verbose"]).inherited())
        .with_option(OptionDef::flag(&["--local"]))
        .with_subcommand(
            CommandDef::new("commit")
                .with_option(OptionDef::with_value(&["-m", "--message"], string())),
        )
        .build()
        .unwrap();
    let commit = graph.find_subcommand(graph.root(), "commit").unwrap();

    let result = parse(&graph, &["commit", "-v", "-m", "fix"]).unwrap();
    assert_eq!(result.commands(), [graph.root(), commit]);
    assert_eq!(result.get(&graph, "--verbose"), Some(&Value::Bool(true)));
    assert_eq!(result.get(&graph, "-m"), Some(&Value::Str("fix".into())));

    let err = parse(&graph, &["commit", "--local"]).unwrap_err();
    assert_eq!(err.command(), commit);
}

#[test]
fn test_abbreviated_subcommands() {
    let graph = CommandDef::new("git")
        .with_subcommand(CommandDef::new("commit"))
        .with_subcommand(CommandDef::new("checkout"))
        .with_subcommand(CommandDef::new("status").with_alias("st"))
        .build()
        .unwrap();
    let config = ParserConfig {
        abbreviated_subcommands: true,
        ..ParserConfig::default()
    };
    let parser = Parser::configured(&graph, config, &ConverterRegistry::new()).unwrap();

    let result = parser.parse(["com"]).unwrap();
    assert_eq!(graph.command(result.command()).name, "commit");

    let err = parser.parse(["c"]).unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            source: ParseError::AmbiguousSubcommand { .. },
            ..
        }
    ));
}

#[test]
fn test_argument_file_expansion() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("opts");
    std::fs::write(&file, "--level 3\n# comment\n\"my file.txt\"\n").unwrap();

    let graph = archive_def().build().unwrap();
    let result = Parser::new(&graph)
        .unwrap()
        .parse([format!("@{}", file.display())])
        .unwrap();
    assert_eq!(result.get(&graph, "--level"), Some(&Value::Int(3)));
    assert_eq!(
        result.get(&graph, "<files>"),
        Some(&Value::List(vec![Value::Path("my file.txt".into())]))
    );
}

#[test]
fn test_deferred_defaults() {
    let graph = CommandDef::new("server")
        .with_option(OptionDef::with_value(&["--home"], string()).with_default("${env:APP_HOME:-/opt/app}"))
        .with_option(OptionDef::with_value(&["--port"], int()).with_default("${sys:server.port}"))
        .with_option(OptionDef::with_value(&["--user"], string()).with_default("${provider:whoami}"))
        .build()
        .unwrap();

    let parser = Parser::new(&graph)
        .unwrap()
        .with_environment(
            MapEnvironment::new()
                .with_var("APP_HOME", "/srv")
                .with_property("server.port", "8080"),
        )
        .with_provider("whoami", |_arg: &ArgSpec| Some("root".to_string()));
    let result = parser.parse(Vec::<String>::new()).unwrap();
    assert_eq!(result.get(&graph, "--home"), Some(&Value::Str("/srv".into())));
    assert_eq!(result.get(&graph, "--port"), Some(&Value::Int(8080)));
    assert_eq!(result.get(&graph, "--user"), Some(&Value::Str("root".into())));

    let home = graph.find_option(graph.root(), "--home").unwrap().id;
    assert_eq!(result.origin(home), Some(ValueOrigin::Default));

    let parser = Parser::new(&graph).unwrap().with_environment(MapEnvironment::new());
    let result = parser.parse(["--home", "/tmp"]).unwrap();
    assert_eq!(result.get(&graph, "--home"), Some(&Value::Str("/tmp".into())));
    assert_eq!(result.get(&graph, "--port"), None);
    assert_eq!(result.get(&graph, "--user"), None);
}

#[test]
fn test_default_satisfies_required() {
    let graph = CommandDef::new("tool")
        .with_option(OptionDef::with_value(&["--level"], int()).required().with_default("2"))
        .build()
        .unwrap();
    let result = parse(&graph, &[]).unwrap();
    assert_eq!(result.get(&graph, "--level"), Some(&Value::Int(2)));
}

#[test]
fn test_unresolved_default_leaves_required_flag_missing() {
    let graph = CommandDef::new("deploy")
        .with_option(
            OptionDef::flag(&["--force"])
                .required()
                .with_default("${env:DEPLOY_FORCE}"),
        )
        .build()
        .unwrap();

    let parser = Parser::new(&graph).unwrap().with_environment(MapEnvironment::new());
    let err = parser.parse(Vec::<String>::new()).unwrap_err();
    let Error::Constraint { source, .. } = err else {
        panic!("expected constraint error, got {err:?}");
    };
    assert!(matches!(
        &source.violations[..],
        [Violation::MissingRequired { name, .. }] if name == "--force"
    ));

    let parser = Parser::new(&graph)
        .unwrap()
        .with_environment(MapEnvironment::new().with_var("DEPLOY_FORCE", "true"));
    let result = parser.parse(Vec::<String>::new()).unwrap();
    let force = graph.find_option(graph.root(), "--force").unwrap().id;
    assert_eq!(result.value(force), Some(&Value::Bool(true)));
    assert_eq!(result.origin(force), Some(ValueOrigin::Default));
}

#[test]
fn test_interactive_option_prompts_without_value() {
    let graph = CommandDef::new("login")
        .with_option(OptionDef::with_value(&["--password"], string()).interactive(None, false))
        .build()
        .unwrap();

    let prompter = Arc::new(ScriptedPrompter::new(["s3cret"]));
    let parser = Parser::new(&graph)
        .unwrap()
        .with_prompter(Arc::clone(&prompter));
    let result = parser.parse(["--password"]).unwrap();
    let password = graph.find_option(graph.root(), "--password").unwrap().id;
    assert_eq!(result.value(password), Some(&Value::Str("s3cret".into())));
    assert_eq!(result.origin(password), Some(ValueOrigin::Prompt));
    assert_eq!(prompter.asked(), vec![("--password".to_string(), false)]);

    let result = parser.parse(["--password", "given"]).unwrap();
    assert_eq!(result.origin(password), Some(ValueOrigin::Matched));
}

#[test]
fn test_interactive_without_terminal_fails() {
    let graph = CommandDef::new("login")
        .with_positional(PositionalDef::required("<pin>", int()).interactive(Some("PIN: "), false))
        .build()
        .unwrap();
    let parser = Parser::new(&graph)
        .unwrap()
        .with_prompter(ScriptedPrompter::new(Vec::<String>::new()));
    let err = parser.parse(Vec::<String>::new()).unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            source: ParseError::NoTerminal { .. },
            ..
        }
    ));

    let parser = Parser::new(&graph)
        .unwrap()
        .with_prompter(ScriptedPrompter::new(["1234"]));
    let result = parser.parse(Vec::<String>::new()).unwrap();
    assert_eq!(result.get(&graph, "<pin>"), Some(&Value::Int(1234)));
}

#[test]
fn test_map_option() {
    let graph = CommandDef::new("tool")
        .with_option(OptionDef::with_value(
            &["-D"],
            TypeDescriptor::Map(ScalarType::String, ScalarType::Integer),
        ))
        .build()
        .unwrap();
    let result = parse(&graph, &["-Da=1", "-D", "b=2", "-Da=3"]).unwrap();
    assert_eq!(
        result.get(&graph, "-D"),
        Some(&Value::Map(vec![
            (Value::Str("a".into()), Value::Int(3)),
            (Value::Str("b".into()), Value::Int(2)),
        ]))
    );

    let err = parse(&graph, &["-D", "novalue"]).unwrap_err();
    assert!(matches!(
        err,
        Error::Parse {
            source: ParseError::Conversion { .. },
            ..
        }
    ));
}

#[test]
fn test_token_consumer_takes_tokens_itself() {
    let graph = CommandDef::new("exec")
        .with_option(OptionDef::with_value(
            &["--cmd"],
            TypeDescriptor::Collection(ScalarType::Custom("Shell".into())),
        ))
        .with_option(OptionDef::flag(&["-v"]))
        .build()
        .unwrap();
    let mut registry = ConverterRegistry::new();
    registry
        .register("Shell", |raw: &str| Ok(Value::Str(raw.to_string())))
        .register_consumer("Shell", |_arg: &ArgSpec, stack: &mut ArgStack| {
            let mut taken = Vec::new();
            while let Some(token) = stack.pop() {
                if token == ";" {
                    break;
                }
                taken.push(token);
            }
            Ok(taken)
        });
    let parser = Parser::configured(&graph, ParserConfig::default(), &registry).unwrap();
    let result = parser.parse(["--cmd", "ls", "-v", ";", "-v"]).unwrap();
    assert_eq!(
        result.get(&graph, "--cmd"),
        Some(&Value::List(vec![Value::Str("ls".into()), Value::Str("-v".into())]))
    );
    assert_eq!(result.get(&graph, "-v"), Some(&Value::Bool(true)));
}

#[test]
fn test_bind_visits_values_in_order() {
    let graph = CommandDef::new("tool")
        .with_target("ToolArgs")
        .with_option(OptionDef::with_value(&["--level"], int()))
        .with_positional(PositionalDef::required("<file>", string()))
        .build()
        .unwrap();
    let result = parse(&graph, &["--level", "2", "f.txt"]).unwrap();

    let mut bound = Vec::new();
    result
        .bind(&graph, &mut |cmd: &CommandSpec, arg: &ArgSpec, value: &Value| {
            bound.push(format!(
                "{}.{}={value}",
                cmd.target.as_deref().unwrap_or("?"),
                arg.display_name()
            ));
            Ok(())
        })
        .unwrap();
    assert_eq!(bound, vec!["ToolArgs.--level=2", "ToolArgs.<file>=f.txt"]);
}

#[test]
fn test_bind_stops_at_first_failure() {
    let graph = archive_def().build().unwrap();
    let result = parse(&graph, &["-a"]).unwrap();
    let mut calls = 0;
    let err = result
        .bind(&graph, &mut |_: &CommandSpec, _: &ArgSpec, _: &Value| {
            calls += 1;
            Err(ExecutionError::new("target rejected value"))
        })
        .unwrap_err();
    assert_eq!(calls, 1);
    assert_eq!(err.to_string(), "target rejected value");
}

#[test]
fn test_completion_follows_parse_context() {
    let graph = CommandDef::new("git")
        .with_subcommand(
            CommandDef::new("commit").with_option(
                OptionDef::with_value(&["--cleanup"], string())
                    .with_candidates(&["strip", "whitespace", "verbatim"]),
            ),
        )
        .build()
        .unwrap();
    let config = ParserConfig::default();
    let args: Vec<String> = ["commit", "--cleanup", "w"].iter().map(|s| s.to_string()).collect();
    assert_eq!(complete(&graph, &config, &args, 2, 1), vec!["whitespace"]);
    assert_eq!(complete(&graph, &config, &args, 1, 3), vec!["--cleanup"]);
}
