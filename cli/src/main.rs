use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use argbind_core::{AnsiMode, CommandDef, CommandGraph, CommandId, ConverterRegistry, Settings};
use argbind_help::Help;
use argbind_parser::{ParseResult, Parser as ArgParser, ResolvedValue};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Exit code for command lines rejected by the parser or the validator.
const USAGE_EXIT_CODE: i32 = 2;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliColor {
    Auto,
    Always,
    Never,
}

impl From<CliColor> for AnsiMode {
    fn from(color: CliColor) -> Self {
        match color {
            CliColor::Auto => Self::Auto,
            CliColor::Always => Self::On,
            CliColor::Never => Self::Off,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "argbind")]
#[command(about = "Validate, exercise and document command-line specs")]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build one or more spec files and report definition errors.
    Validate(ValidateArgs),
    /// Parse a command line against a spec and print the resolved values.
    Parse(ParseArgs),
    /// Print the help text of a spec's command.
    Help(HelpArgs),
    /// Print completion candidates for one word of a command line.
    Complete(CompleteArgs),
}

#[derive(Debug, Args)]
struct SpecArgs {
    /// Command spec file (YAML, or JSON for `.json`).
    #[arg(long)]
    spec: PathBuf,
    /// Parser and help settings file.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Spec files to build.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct ParseArgs {
    #[command(flatten)]
    spec: SpecArgs,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// The command line to parse, after `--`.
    #[arg(last = true)]
    args: Vec<String>,
}

#[derive(Debug, Args)]
struct HelpArgs {
    #[command(flatten)]
    spec: SpecArgs,
    /// Subcommand path, e.g. `remote add`.
    path: Vec<String>,
    /// Also print the help of every subcommand.
    #[arg(long)]
    recursive: bool,
    /// Print the version lines instead.
    #[arg(long)]
    version_lines: bool,
    /// Width in columns, overriding the settings file.
    #[arg(long)]
    width: Option<usize>,
    /// When to use ANSI styles.
    #[arg(long)]
    color: Option<CliColor>,
}

#[derive(Debug, Args)]
struct CompleteArgs {
    #[command(flatten)]
    spec: SpecArgs,
    /// Index of the word being completed.
    #[arg(long)]
    index: usize,
    /// Cursor position inside that word; defaults to its end.
    #[arg(long)]
    position: Option<usize>,
    /// The command line being completed, after `--`.
    #[arg(last = true)]
    args: Vec<String>,
}

/// Resolved values of one command on the parsed path.
#[derive(Debug, Serialize)]
struct CommandReport<'a> {
    command: String,
    values: BTreeMap<&'a str, &'a ResolvedValue>,
}

#[derive(Debug, Serialize)]
struct ParseReport<'a> {
    commands: Vec<CommandReport<'a>>,
    unmatched: &'a [String],
}

/// Failure of a subcommand, with its exit code.
#[derive(Debug)]
struct Failure {
    message: String,
    code: i32,
}

impl From<String> for Failure {
    fn from(message: String) -> Self {
        Self { message, code: 1 }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Validate(args) => run_validate(args).map_err(Failure::from),
        Command::Parse(args) => run_parse(args),
        Command::Help(args) => run_help(args).map_err(Failure::from),
        Command::Complete(args) => run_complete(args).map_err(Failure::from),
    };

    if let Err(failure) = result {
        eprintln!("error: {}", failure.message);
        std::process::exit(failure.code);
    }
}

/// Uses `RUST_LOG` when set, otherwise the verbosity flags.
fn init_logging(verbose: bool, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_graph(path: &Path) -> Result<CommandGraph, String> {
    let def = CommandDef::load(path)
        .map_err(|err| format!("Failed to load spec '{}': {err}", path.display()))?;
    let graph = def
        .build()
        .map_err(|err| format!("Invalid spec '{}': {err}", path.display()))?;
    debug!(
        path = %path.display(),
        commands = graph.commands().len(),
        args = graph.arg_count(),
        "Loaded spec"
    );
    Ok(graph)
}

fn load_settings(path: Option<&Path>) -> Result<Settings, String> {
    match path {
        Some(path) => Settings::load(path)
            .map_err(|err| format!("Failed to load settings '{}': {err}", path.display())),
        None => Ok(Settings::default()),
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let mut commands = 0usize;
    for path in &args.inputs {
        commands += load_graph(path)?.commands().len();
    }
    println!(
        "Validated {} spec file(s) defining {commands} command(s).",
        args.inputs.len()
    );
    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<(), Failure> {
    let graph = load_graph(&args.spec.spec)?;
    let settings = load_settings(args.spec.settings.as_deref())?;
    let parser = ArgParser::configured(&graph, settings.parser, &ConverterRegistry::new())
        .map_err(|err| format!("Invalid spec '{}': {err}", args.spec.spec.display()))?;
    let help = Help::new(&graph, settings.help);

    let result = match parser.parse(args.args) {
        Ok(result) => result,
        Err(err) => {
            return Err(Failure {
                message: format!("{err}\n{}", help.synopsis(err.command()).trim_end()),
                code: USAGE_EXIT_CODE,
            });
        }
    };

    if result.usage_help_requested() {
        print!("{}", help.render(result.command()));
        return Ok(());
    }
    if result.version_help_requested() {
        print!("{}", help.render_version(result.command()));
        return Ok(());
    }

    let report = parse_report(&graph, &result);
    let raw = match args.format {
        CliOutputFormat::Json => serde_json::to_string_pretty(&report)
            .map_err(|err| format!("Failed to serialize result: {err}"))?,
        CliOutputFormat::Yaml => serde_yaml::to_string(&report)
            .map_err(|err| format!("Failed to serialize result: {err}"))?,
    };
    println!("{}", raw.trim_end());
    Ok(())
}

fn parse_report<'a>(graph: &'a CommandGraph, result: &'a ParseResult) -> ParseReport<'a> {
    let commands = result
        .commands()
        .iter()
        .map(|cmd| {
            let values = graph
                .options(*cmd)
                .chain(graph.positionals(*cmd))
                .filter_map(|arg| {
                    result
                        .resolved(arg.id)
                        .map(|value| (arg.display_name(), value))
                })
                .collect();
            CommandReport {
                command: graph.qualified_name(*cmd),
                values,
            }
        })
        .collect();
    ParseReport {
        commands,
        unmatched: result.unmatched(),
    }
}

fn find_command(graph: &CommandGraph, path: &[String]) -> Result<CommandId, String> {
    let mut cmd = graph.root();
    for name in path {
        cmd = graph.find_subcommand(cmd, name).ok_or_else(|| {
            format!(
                "'{}' has no subcommand '{name}'",
                graph.qualified_name(cmd)
            )
        })?;
        info!(command = %graph.qualified_name(cmd), "Entering subcommand");
    }
    Ok(cmd)
}

fn run_help(args: HelpArgs) -> Result<(), String> {
    let graph = load_graph(&args.spec.spec)?;
    let mut config = load_settings(args.spec.settings.as_deref())?.help;
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(color) = args.color {
        config.ansi = color.into();
    }

    let cmd = find_command(&graph, &args.path)?;
    let help = Help::new(&graph, config);
    let text = if args.version_lines {
        help.render_version(cmd)
    } else if args.recursive {
        help.render_recursive(cmd)
    } else {
        help.render(cmd)
    };
    print!("{text}");
    Ok(())
}

fn run_complete(args: CompleteArgs) -> Result<(), String> {
    let graph = load_graph(&args.spec.spec)?;
    let settings = load_settings(args.spec.settings.as_deref())?;
    if args.index > args.args.len() {
        return Err(format!(
            "--index {} is past the end of the command line ({} word(s))",
            args.index,
            args.args.len()
        ));
    }

    let word_len = args.args.get(args.index).map_or(0, |w| w.chars().count());
    let position = args.position.unwrap_or(word_len).min(word_len);
    let mut words = args.args;
    if words.len() == args.index {
        words.push(String::new());
    }
    for candidate in argbind_parser::complete(&graph, &settings.parser, &words, args.index, position)
    {
        println!("{candidate}");
    }
    Ok(())
}
