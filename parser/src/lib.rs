//! Token matching, constraint validation and completion for argbind.
//!
//! A [`Parser`] borrows a built [`CommandGraph`] and resolves one converter
//! per argument up front. Each call to [`Parser::parse`] then runs a fresh
//! matching pass and returns an independent [`ParseResult`], so one parser
//! (and one graph) can serve any number of parses.
//!
//! Matching happens in three stages:
//!
//! 1. `@file` tokens are expanded (see [`argfile`]).
//! 2. Tokens are classified and matched against the current command context,
//!    switching context on subcommand names.
//! 3. Unmatched arguments receive their defaults and every group and
//!    required-argument constraint is checked, all violations aggregated.
//!
//! # Example
//!
//! ```
//! use argbind_core::*;
//! use argbind_parser::Parser;
//!
//! let graph = CommandDef::new("tar")
//!     .with_option(OptionDef::flag(&["-x"]))
//!     .with_option(OptionDef::flag(&["-v"]))
//!     .with_option(OptionDef::with_value(&["-f"], TypeDescriptor::Scalar(ScalarType::Path)))
//!     .build()
//!     .unwrap();
//!
//! let result = Parser::new(&graph).unwrap().parse(["-xvf", "archive.tar"]).unwrap();
//! assert_eq!(result.get(&graph, "-x"), Some(&Value::Bool(true)));
//! assert_eq!(result.get(&graph, "-f"), Some(&Value::Path("archive.tar".into())));
//! ```

pub mod argfile;
mod complete;
mod constraints;
mod defaults;
mod interpreter;
mod lexer;
mod prompt;
mod result;

use std::sync::Arc;

use argbind_core::{
    ArgConverter, BuildError, CommandGraph, CommandId, ConstraintError, ConverterRegistry,
    ParseError, ParserConfig, TokenConsumer,
};
use thiserror::Error;
use tracing::debug;

pub use complete::complete;
pub use constraints::validate;
pub use defaults::{DefaultProviders, Environment, MapEnvironment, SystemEnvironment};
pub use prompt::{Prompter, ScriptedPrompter, TerminalPrompter};
pub use result::{Bind, MatchedArg, ParseResult, ResolvedValue, ValueOrigin};

use interpreter::Interpreter;

/// A failed parse, tagged with the command context it failed in.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{source}")]
    Parse {
        command: CommandId,
        #[source]
        source: ParseError,
    },
    #[error("{source}")]
    Constraint {
        command: CommandId,
        #[source]
        source: ConstraintError,
    },
}

impl Error {
    /// The innermost command matched when the error occurred.
    pub fn command(&self) -> CommandId {
        match self {
            Self::Parse { command, .. } | Self::Constraint { command, .. } => *command,
        }
    }
}

/// Matches command lines against a [`CommandGraph`].
pub struct Parser<'g> {
    graph: &'g CommandGraph,
    config: ParserConfig,
    converters: Vec<ArgConverter>,
    consumers: Vec<Option<Arc<dyn TokenConsumer>>>,
    environment: Box<dyn Environment>,
    prompter: Box<dyn Prompter>,
    providers: DefaultProviders,
}

impl std::fmt::Debug for Parser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("root", &self.graph.command(self.graph.root()).name)
            .field("config", &self.config)
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

impl<'g> Parser<'g> {
    /// Creates a parser with the default configuration and built-in
    /// converters.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::NoConverter`] when an argument has a custom type.
    pub fn new(graph: &'g CommandGraph) -> Result<Self, BuildError> {
        Self::configured(graph, ParserConfig::default(), &ConverterRegistry::new())
    }

    /// Creates a parser with `config`, resolving converters from `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::NoConverter`] for an argument whose type has
    /// neither a registered nor a built-in converter.
    pub fn configured(
        graph: &'g CommandGraph,
        config: ParserConfig,
        registry: &ConverterRegistry,
    ) -> Result<Self, BuildError> {
        let converters = graph
            .args()
            .iter()
            .map(|arg| registry.resolve(arg, config.case_insensitive_enum_values))
            .collect::<Result<Vec<_>, _>>()?;
        let consumers = graph.args().iter().map(|arg| registry.consumer(arg)).collect();
        debug!(
            command = %graph.command(graph.root()).name,
            args = converters.len(),
            "Resolved converters"
        );

        Ok(Self {
            graph,
            config,
            converters,
            consumers,
            environment: Box::new(SystemEnvironment::new()),
            prompter: Box::new(TerminalPrompter),
            providers: DefaultProviders::new(),
        })
    }

    /// Resolves environment and property defaults from `environment`.
    pub fn with_environment(mut self, environment: impl Environment + 'static) -> Self {
        self.environment = Box::new(environment);
        self
    }

    /// Reads interactive values from `prompter`.
    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Box::new(prompter);
        self
    }

    /// Registers a named default-value provider.
    pub fn with_provider<F>(mut self, name: &str, provider: F) -> Self
    where
        F: Fn(&argbind_core::ArgSpec) -> Option<String> + Send + Sync + 'static,
    {
        self.providers.register(name, provider);
        self
    }

    pub fn graph(&self) -> &'g CommandGraph {
        self.graph
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses one command line (program name excluded).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for the first token that cannot be matched
    /// or converted, and [`Error::Constraint`] with every violation when the
    /// tokens matched but groups or required arguments are not satisfied.
    /// Constraints are not checked when usage or version help was requested.
    pub fn parse<I, S>(&self, args: I) -> Result<ParseResult, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args: Vec<String> = args.into_iter().map(Into::into).collect();
        if self.config.expand_at_files {
            args = argfile::expand(args, &self.config.end_of_options_delimiter).map_err(
                |source| Error::Parse {
                    command: self.graph.root(),
                    source,
                },
            )?;
        }
        debug!(
            command = %self.graph.command(self.graph.root()).name,
            tokens = args.len(),
            "Parsing command line"
        );
        Interpreter::new(self, args).run()
    }
}
