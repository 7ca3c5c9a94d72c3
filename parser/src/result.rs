//! Parse results and value binding.

use argbind_core::{ArgId, ArgSpec, CommandGraph, CommandId, CommandSpec, ExecutionError, Value};
use serde::Serialize;

/// One match of an argument, in command-line order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedArg {
    pub arg: ArgId,
    /// Command context the match happened in.
    pub command: CommandId,
    /// Raw values after splitting.
    pub values: Vec<String>,
}

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrigin {
    Matched,
    /// A resolved default value.
    Default,
    /// The `false` of an unmatched flag whose default did not resolve.
    Implicit,
    Prompt,
}

/// A converted value and its origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedValue {
    pub value: Value,
    pub origin: ValueOrigin,
}

/// Outcome of one parse.
///
/// Arguments are addressed by their graph handles, so results from two
/// identically built graphs compare equal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub(crate) matched: Vec<MatchedArg>,
    pub(crate) commands: Vec<CommandId>,
    pub(crate) unmatched: Vec<String>,
    pub(crate) values: Vec<Option<ResolvedValue>>,
    #[serde(skip)]
    pub(crate) counts: Vec<usize>,
    pub(crate) usage_help_requested: bool,
    pub(crate) version_help_requested: bool,
}

impl ParseResult {
    pub(crate) fn new(arg_count: usize, root: CommandId) -> Self {
        Self {
            matched: Vec::new(),
            commands: vec![root],
            unmatched: Vec::new(),
            values: vec![None; arg_count],
            counts: vec![0; arg_count],
            usage_help_requested: false,
            version_help_requested: false,
        }
    }

    /// Matches in command-line order.
    pub fn matched(&self) -> &[MatchedArg] {
        &self.matched
    }

    /// Matched command chain, root first.
    pub fn commands(&self) -> &[CommandId] {
        &self.commands
    }

    /// The innermost matched command.
    pub fn command(&self) -> CommandId {
        self.commands[self.commands.len() - 1]
    }

    /// Tokens captured because they matched nothing.
    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    pub fn value(&self, arg: ArgId) -> Option<&Value> {
        self.resolved(arg).map(|r| &r.value)
    }

    pub fn origin(&self, arg: ArgId) -> Option<ValueOrigin> {
        self.resolved(arg).map(|r| r.origin)
    }

    pub fn resolved(&self, arg: ArgId) -> Option<&ResolvedValue> {
        self.values.get(arg.index()).and_then(Option::as_ref)
    }

    /// How many times `arg` was matched.
    pub fn match_count(&self, arg: ArgId) -> usize {
        self.counts.get(arg.index()).copied().unwrap_or(0)
    }

    pub fn is_matched(&self, arg: ArgId) -> bool {
        self.match_count(arg) > 0
    }

    /// All raw values matched for `arg`, in order.
    pub fn raw_values(&self, arg: ArgId) -> Vec<&str> {
        self.matched
            .iter()
            .filter(|m| m.arg == arg)
            .flat_map(|m| m.values.iter().map(String::as_str))
            .collect()
    }

    /// Looks up a value by option name or positional label, searching the
    /// innermost command first.
    ///
    /// ```
    /// use argbind_core::*;
    /// use argbind_parser::Parser;
    ///
    /// let graph = CommandDef::new("tool")
    ///     .with_option(OptionDef::with_value(&["-n"], TypeDescriptor::Scalar(ScalarType::Integer)))
    ///     .build()
    ///     .unwrap();
    /// let result = Parser::new(&graph).unwrap().parse(["-n", "3"]).unwrap();
    /// assert_eq!(result.get(&graph, "-n"), Some(&Value::Int(3)));
    /// ```
    pub fn get(&self, graph: &CommandGraph, name: &str) -> Option<&Value> {
        self.commands.iter().rev().find_map(|cmd| {
            graph
                .find_option(*cmd, name)
                .or_else(|| graph.positionals(*cmd).find(|p| p.label == name))
                .and_then(|arg| self.value(arg.id))
        })
    }

    pub fn usage_help_requested(&self) -> bool {
        self.usage_help_requested
    }

    pub fn version_help_requested(&self) -> bool {
        self.version_help_requested
    }

    /// Hands every resolved value to `binder`, command by command, root first.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first [`ExecutionError`] raised by `binder`.
    pub fn bind<B: Bind + ?Sized>(
        &self,
        graph: &CommandGraph,
        binder: &mut B,
    ) -> Result<(), ExecutionError> {
        for cmd in &self.commands {
            let spec = graph.command(*cmd);
            for arg in graph.options(*cmd).chain(graph.positionals(*cmd)) {
                if let Some(value) = self.value(arg.id) {
                    binder.bind(spec, arg, value)?;
                }
            }
        }
        Ok(())
    }
}

/// Receives resolved values; implemented by whatever holds the bound targets.
///
/// [`CommandSpec::target`] names the target the command's values belong to.
pub trait Bind {
    fn bind(
        &mut self,
        command: &CommandSpec,
        arg: &ArgSpec,
        value: &Value,
    ) -> Result<(), ExecutionError>;
}

impl<F> Bind for F
where
    F: FnMut(&CommandSpec, &ArgSpec, &Value) -> Result<(), ExecutionError>,
{
    fn bind(
        &mut self,
        command: &CommandSpec,
        arg: &ArgSpec,
        value: &Value,
    ) -> Result<(), ExecutionError> {
        self(command, arg, value)
    }
}
