//! Error taxonomy shared by the model, the parser and the help renderer.
//!
//! - [`BuildError`]: malformed definitions, raised by
//!   [`CommandDef::build`](crate::CommandDef::build); fatal.
//! - [`ParseError`]: unrecognized tokens, missing values and conversion
//!   failures; stops matching for the affected command context.
//! - [`ConstraintError`]: every group and required-argument violation of a
//!   parse, collected into one report.
//! - [`ExecutionError`]: a failure raised by caller code while values are
//!   bound; passed through unmodified.

use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::graph::{ArgId, CommandId, GroupId};
use crate::types::Arity;

/// Boxed error returned by converters and token consumers.
pub type ConversionError = Box<dyn StdError + Send + Sync>;

/// Structural problems in a command definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Command name is empty or whitespace-only.
    #[error("command name cannot be empty")]
    EmptyCommandName,
    /// Arity or index text could not be parsed.
    #[error("invalid arity or index range: '{0}'")]
    InvalidArity(String),
    /// An option has no names.
    #[error("option in '{command}' must define at least one name")]
    MissingOptionName { command: String },
    /// Option name has the wrong shape (no dash prefix, whitespace, separator).
    #[error("invalid option name in '{command}': '{name}'")]
    InvalidOptionName { command: String, name: String },
    /// Two options visible in the same command share a name.
    #[error("duplicate option in '{command}': {name}")]
    DuplicateOption { command: String, name: String },
    /// Two subcommands of the same parent share a name or alias.
    #[error("duplicate subcommand in '{command}': {name}")]
    DuplicateSubcommand { command: String, name: String },
    /// Two positionals claim the same index.
    #[error("positional index conflict in '{command}': {first} and {second} overlap")]
    PositionalIndexConflict {
        command: String,
        first: String,
        second: String,
    },
    /// Positional indices leave a hole.
    #[error("positional indices in '{command}' skip index {index}")]
    PositionalIndexGap { command: String, index: usize },
    /// An open-ended positional is followed by another positional.
    #[error("unbounded positional {label} in '{command}' must be the last one")]
    UnboundedPositionalNotLast { command: String, label: String },
    /// Two positionals share a label.
    #[error("duplicate positional label in '{command}': {label}")]
    DuplicatePositional { command: String, label: String },
    /// A scalar argument was given an arity allowing several values.
    #[error("{arg} in '{command}' holds a single value but has arity {arity}")]
    ArityExceedsType {
        command: String,
        arg: String,
        arity: Arity,
    },
    /// An arity or positional index has its minimum above its maximum.
    #[error("{arg} in '{command}' has inverted range {range}")]
    InvertedRange {
        command: String,
        arg: String,
        range: Arity,
    },
    /// A negatable option is not a boolean or has no long name.
    #[error("negatable option {arg} in '{command}' must be a boolean with a long name")]
    InvalidNegatable { command: String, arg: String },
    /// A split pattern failed to compile.
    #[error("invalid split pattern for {arg}: {message}")]
    InvalidSplitPattern { arg: String, message: String },
    /// Two groups in the same command share a name.
    #[error("duplicate group in '{command}': {group}")]
    DuplicateGroup { command: String, group: String },
    /// A group has no members.
    #[error("group '{group}' in '{command}' has no members")]
    EmptyGroup { command: String, group: String },
    /// A group's multiplicity does not allow any occurrence.
    #[error("group '{group}' has invalid multiplicity {multiplicity}")]
    InvalidMultiplicity { group: String, multiplicity: Arity },
    /// A group references an argument the command does not declare.
    #[error("group '{group}' references unknown argument {member}")]
    UnknownGroupMember { group: String, member: String },
    /// A group references a group the command does not declare.
    #[error("group '{group}' references unknown group '{member}'")]
    UnknownGroup { group: String, member: String },
    /// An argument or group is claimed by more than one group.
    #[error("{member} belongs to more than one group")]
    MemberInMultipleGroups { member: String },
    /// Group nesting forms a cycle.
    #[error("group cycle detected at path: {0}")]
    GroupCycle(String),
    /// No converter is registered or built in for an argument's type.
    #[error("no converter for type '{type_name}' of {arg}")]
    NoConverter { arg: String, type_name: String },
}

/// Failures while matching tokens against a command.
#[derive(Debug, Error)]
pub enum ParseError {
    /// An option-like token matches no option.
    #[error("unknown option: '{token}'")]
    UnknownOption { token: String },
    /// A token could not be assigned to any positional parameter.
    #[error("unmatched argument at index {index}: '{token}'")]
    UnmatchedArgument { index: usize, token: String },
    /// An abbreviation matches several options.
    #[error("option '{token}' is ambiguous: {}", .candidates.join(", "))]
    AmbiguousOption {
        token: String,
        candidates: Vec<String>,
    },
    /// An abbreviation matches several subcommands.
    #[error("subcommand '{token}' is ambiguous: {}", .candidates.join(", "))]
    AmbiguousSubcommand {
        token: String,
        candidates: Vec<String>,
    },
    /// A matched argument did not receive its mandatory value(s).
    #[error("missing required parameter for {name}{}", .found.as_ref().map(|f| format!(" (found '{f}')")).unwrap_or_default())]
    MissingParameter {
        arg: ArgId,
        name: String,
        found: Option<String>,
    },
    /// A value was attached to an argument that takes none.
    #[error("{name} does not take a value, found '{value}'")]
    UnexpectedValue {
        arg: ArgId,
        name: String,
        value: String,
    },
    /// A raw value could not be converted.
    #[error("invalid value for {name}: '{value}': {source}")]
    Conversion {
        arg: ArgId,
        name: String,
        value: String,
        #[source]
        source: ConversionError,
    },
    /// A single-valued argument was matched twice while overwriting is disabled.
    #[error("{name} should be specified only once")]
    OptionOverwritten { arg: ArgId, name: String },
    /// An interactive argument needs a terminal and none is attached.
    #[error("cannot prompt for {name}: no interactive terminal")]
    NoTerminal { arg: ArgId, name: String },
    /// Reading an interactive value failed.
    #[error("failed to read value for {name}: {source}")]
    Prompt {
        arg: ArgId,
        name: String,
        #[source]
        source: std::io::Error,
    },
    /// An `@file` argument file could not be read.
    #[error("cannot read argument file {}: {source}", .path.display())]
    ArgumentFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// The argument this error is about, if any.
    pub fn arg(&self) -> Option<ArgId> {
        match self {
            Self::MissingParameter { arg, .. }
            | Self::UnexpectedValue { arg, .. }
            | Self::Conversion { arg, .. }
            | Self::OptionOverwritten { arg, .. }
            | Self::NoTerminal { arg, .. }
            | Self::Prompt { arg, .. } => Some(*arg),
            _ => None,
        }
    }
}

/// One group or required-argument violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Several members of an exclusive group were given.
    MutuallyExclusive { group: GroupId, members: Vec<String> },
    /// A co-occurring group was given without all its required members.
    MissingInGroup { group: GroupId, missing: Vec<String> },
    /// A required group was not given at all.
    MissingGroup { group: GroupId, label: String },
    /// A group occurred more or fewer times than its multiplicity allows.
    GroupMultiplicity {
        group: GroupId,
        label: String,
        occurrences: usize,
        multiplicity: Arity,
    },
    /// A required argument was neither matched nor defaulted.
    MissingRequired {
        command: CommandId,
        arg: ArgId,
        name: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MutuallyExclusive { members, .. } => write!(
                f,
                "{} are mutually exclusive (specify only one)",
                members.join(", ")
            ),
            Self::MissingInGroup { missing, .. } => {
                write!(f, "missing required argument(s): {}", missing.join(", "))
            }
            Self::MissingGroup { label, .. } => {
                write!(f, "missing required argument(s): {label}")
            }
            Self::GroupMultiplicity {
                label,
                occurrences,
                multiplicity,
                ..
            } => write!(
                f,
                "group {label} given {occurrences} time(s), expected {multiplicity}"
            ),
            Self::MissingRequired { name, .. } => {
                write!(f, "missing required argument: {name}")
            }
        }
    }
}

/// Every constraint violation found in one parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.as_slice() {
            [single] => write!(f, "{single}"),
            all => {
                write!(f, "{} constraint violations:", all.len())?;
                for violation in all {
                    write!(f, "\n  - {violation}")?;
                }
                Ok(())
            }
        }
    }
}

impl StdError for ConstraintError {}

/// A failure raised by caller code while values are bound.
#[derive(Debug)]
pub struct ExecutionError(ConversionError);

impl ExecutionError {
    /// Wraps a downstream error.
    pub fn new(err: impl Into<ConversionError>) -> Self {
        Self(err.into())
    }

    /// Returns the wrapped error.
    pub fn into_inner(self) -> ConversionError {
        self.0
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl StdError for ExecutionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Failures loading configuration or definition files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}
