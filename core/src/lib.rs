//! Command model, value conversion and error types for argbind.
//!
//! This crate defines everything the parser and help renderer share:
//!
//! - [`CommandDef`], [`OptionDef`], [`PositionalDef`], [`GroupDef`]: the
//!   serde-friendly definitions a command line is described with.
//! - [`CommandGraph`]: the validated, immutable arena built from a
//!   definition tree, addressed by [`CommandId`], [`ArgId`] and [`GroupId`].
//! - [`ConverterRegistry`]: string-to-[`Value`] converters resolved once per
//!   argument.
//! - [`Settings`]: parser and help configuration.
//! - The error taxonomy: [`BuildError`], [`ParseError`], [`ConstraintError`],
//!   [`ExecutionError`] and [`ConfigError`].
//!
//! Mixins ([`apply_mixins`]) copy shared options and parameters into every
//! command that lists them before the graph is built.
//!
//! # Example
//!
//! ```
//! use argbind_core::*;
//!
//! let def = CommandDef::new("mycli")
//!     .with_option(OptionDef::flag(&["-v", "--verbose"]).with_description("Enable verbose output"))
//!     .with_subcommand(
//!         CommandDef::new("run")
//!             .with_option(OptionDef::with_value(&["--port"], TypeDescriptor::Scalar(ScalarType::Integer)))
//!             .with_positional(PositionalDef::required("<script>", TypeDescriptor::Scalar(ScalarType::Path))),
//!     );
//!
//! let graph = def.build().unwrap();
//! let run = graph.find_subcommand(graph.root(), "run").unwrap();
//! assert_eq!(graph.qualified_name(run), "mycli run");
//! assert_eq!(graph.positionals(run).count(), 1);
//! ```

mod config;
mod convert;
mod error;
mod graph;
mod merge;
mod types;
mod value;

pub use config::{
    AnsiMode, Headings, HelpConfig, HelpSection, OptionOrder, ParserConfig, Settings,
    SynopsisElement,
};
pub use convert::{ArgConverter, ArgStack, Converter, ConverterRegistry, TokenConsumer, ValueError};
pub use error::{
    BuildError, ConfigError, ConstraintError, ConversionError, ExecutionError, ParseError,
    Violation,
};
pub use graph::{
    ArgGroupSpec, ArgId, ArgKind, ArgSpec, CommandGraph, CommandId, CommandSpec, GroupId,
    GroupMember, negate_name,
};
pub use merge::apply_mixins;
pub use types::*;
pub use value::{Value, format_duration};
