//! The matching loop.
//!
//! One [`Interpreter`] runs per parse. It pops tokens off an [`ArgStack`],
//! classifies them in the current command context and records matches in a
//! fresh [`ParseResult`]. Subcommand tokens switch the context; the graph is
//! never touched.

use argbind_core::{
    ArgId, ArgSpec, ArgStack, CommandGraph, CommandId, ParseError, ParserConfig, TypeDescriptor,
    Value,
};
use tracing::{debug, info};

use crate::constraints;
use crate::defaults;
use crate::lexer::{ClusterPart, Lexer, Token, is_option_like};
use crate::result::{MatchedArg, ParseResult, ResolvedValue, ValueOrigin};
use crate::{Error, Parser};

pub(crate) struct Interpreter<'p, 'g> {
    parser: &'p Parser<'g>,
    graph: &'g CommandGraph,
    config: &'p ParserConfig,
    lexer: Lexer<'p>,
    stack: ArgStack,
    total: usize,
    context: CommandId,
    positional_index: usize,
    end_of_options: bool,
    positional_only: bool,
    capture_rest: bool,
    result: ParseResult,
}

impl<'p, 'g> Interpreter<'p, 'g>
where
    'g: 'p,
{
    pub fn new(parser: &'p Parser<'g>, args: Vec<String>) -> Self {
        let graph = parser.graph;
        let root = graph.root();
        Self {
            parser,
            graph,
            config: &parser.config,
            lexer: Lexer::new(graph, &parser.config),
            total: args.len(),
            stack: ArgStack::new(args),
            context: root,
            positional_index: 0,
            end_of_options: false,
            positional_only: false,
            capture_rest: false,
            result: ParseResult::new(graph.arg_count(), root),
        }
    }

    pub fn run(mut self) -> Result<ParseResult, Error> {
        while let Some(token) = self.stack.pop() {
            self.process(token).map_err(|source| Error::Parse {
                command: self.context,
                source,
            })?;
        }
        self.apply_defaults().map_err(|source| Error::Parse {
            command: self.context,
            source,
        })?;

        if self.result.usage_help_requested || self.result.version_help_requested {
            debug!("Help requested, skipping constraint validation");
        } else {
            constraints::validate(self.graph, &self.result).map_err(|source| {
                Error::Constraint {
                    command: self.context,
                    source,
                }
            })?;
        }
        Ok(self.result)
    }

    fn process(&mut self, token: String) -> Result<(), ParseError> {
        if self.capture_rest {
            self.result.unmatched.push(token);
            return Ok(());
        }
        if self.end_of_options || self.positional_only {
            return self.positional(token);
        }

        let classified = self.lexer.classify(self.context, &token)?;
        debug!(token = %token, kind = ?classified, "Classified token");
        match classified {
            Token::Delimiter => {
                self.end_of_options = true;
                Ok(())
            }
            Token::Subcommand(sub) => {
                info!(command = %self.graph.qualified_name(sub), "Entering subcommand");
                self.context = sub;
                self.positional_index = 0;
                self.result.commands.push(sub);
                Ok(())
            }
            Token::Option {
                arg,
                name,
                attached,
            } => self.option(arg, &name, attached),
            Token::Negated { arg, .. } => self.flag(arg, true),
            Token::Cluster(parts) => self.cluster(parts),
            Token::Unknown if self.config.unmatched_options_as_positional => {
                self.positional(token)
            }
            Token::Unknown => self.unmatched(token),
            Token::Positional => self.positional(token),
        }
    }

    fn token_index(&self) -> usize {
        self.total.saturating_sub(self.stack.len() + 1)
    }

    fn unmatched(&mut self, token: String) -> Result<(), ParseError> {
        if self.config.stop_at_unmatched {
            self.capture_rest = true;
        } else if !self.config.unmatched_arguments_allowed {
            return Err(if is_option_like(&token) {
                ParseError::UnknownOption { token }
            } else {
                ParseError::UnmatchedArgument {
                    index: self.token_index(),
                    token,
                }
            });
        }
        debug!(token = %token, "Captured unmatched token");
        self.result.unmatched.push(token);
        Ok(())
    }

    fn positional(&mut self, token: String) -> Result<(), ParseError> {
        if self.config.stop_at_positional {
            self.positional_only = true;
        }
        let graph = self.graph;
        let Some(arg) = graph.positional_at(self.context, self.positional_index) else {
            return self.unmatched(token);
        };
        self.positional_index += 1;
        self.record(arg.id, vec![token], ValueOrigin::Matched)
    }

    fn cluster(&mut self, parts: Vec<ClusterPart>) -> Result<(), ParseError> {
        for part in parts {
            self.option(part.arg, &part.name, part.attached)?;
        }
        Ok(())
    }

    fn option(
        &mut self,
        arg: ArgId,
        name: &str,
        attached: Option<String>,
    ) -> Result<(), ParseError> {
        let graph = self.graph;
        let spec = graph.arg(arg);
        self.result.usage_help_requested |= spec.is_usage_help();
        self.result.version_help_requested |= spec.is_version_help();

        if let Some(consumer) = self.parser.consumers[arg.index()].clone() {
            if let Some(value) = attached {
                self.stack.push(value);
            }
            let raw = consumer
                .consume(spec, &mut self.stack)
                .map_err(|source| ParseError::Conversion {
                    arg,
                    name: name.to_string(),
                    value: String::new(),
                    source,
                })?;
            return self.record(arg, raw, ValueOrigin::Matched);
        }

        if spec.takes_no_value() {
            if let Some(value) = attached {
                return Err(ParseError::UnexpectedValue {
                    arg,
                    name: name.to_string(),
                    value,
                });
            }
            return if spec.is_boolean() {
                self.flag(arg, false)
            } else {
                self.record(arg, Vec::new(), ValueOrigin::Matched)
            };
        }

        let mut values: Vec<String> = attached.into_iter().collect();
        while values.len() < spec.arity.min {
            let Some(next) = self.stack.pop() else {
                return Err(ParseError::MissingParameter {
                    arg,
                    name: name.to_string(),
                    found: None,
                });
            };
            if !self.config.options_as_option_values && self.stops_values(&next) {
                return Err(ParseError::MissingParameter {
                    arg,
                    name: name.to_string(),
                    found: Some(next),
                });
            }
            values.push(next);
        }
        while spec.arity.max.is_none_or(|max| values.len() < max) {
            let Some(next) = self.stack.peek() else {
                break;
            };
            if self.stops_values(next) || (spec.is_boolean() && !is_boolean_literal(next)) {
                break;
            }
            if let Some(next) = self.stack.pop() {
                values.push(next);
            }
        }

        if !values.is_empty() {
            return self.record(arg, values, ValueOrigin::Matched);
        }
        if spec.interactive.is_some() {
            let answer = self.parser.prompter.prompt(spec)?;
            return self.record(arg, vec![answer], ValueOrigin::Prompt);
        }
        if spec.is_boolean() {
            return self.flag(arg, false);
        }
        self.record(arg, Vec::new(), ValueOrigin::Matched)
    }

    fn stops_values(&self, token: &str) -> bool {
        token == self.config.end_of_options_delimiter
            || self.lexer.stops_values(self.context, token)
    }

    /// A negatable option's declared form sets the opposite of its default
    /// and the negated form restores the default. Plain flags set `true`.
    fn flag(&mut self, arg: ArgId, negated: bool) -> Result<(), ParseError> {
        let spec = self.graph.arg(arg);
        let value = if spec.is_negatable() {
            self.boolean_default(spec) == negated
        } else {
            !negated
        };
        self.record(arg, vec![value.to_string()], ValueOrigin::Matched)
    }

    fn boolean_default(&self, spec: &ArgSpec) -> bool {
        spec.default_value
            .as_ref()
            .and_then(|source| {
                defaults::resolve(
                    source,
                    spec,
                    self.parser.environment.as_ref(),
                    &self.parser.providers,
                )
            })
            .is_some_and(|raw| raw.trim().eq_ignore_ascii_case("true"))
    }

    fn record(
        &mut self,
        arg: ArgId,
        raw: Vec<String>,
        origin: ValueOrigin,
    ) -> Result<(), ParseError> {
        let graph = self.graph;
        let spec = graph.arg(arg);
        if !spec.is_multi_value()
            && self.result.counts[arg.index()] > 0
            && !self.config.overwritten_options_allowed
        {
            return Err(ParseError::OptionOverwritten {
                arg,
                name: spec.display_name().to_string(),
            });
        }

        let logical = self.split(spec, raw);
        let previous = self.result.values[arg.index()].take();
        let value = self.convert(spec, &logical, previous)?;
        debug!(arg = %spec.display_name(), values = ?logical, "Matched argument");

        self.result.values[arg.index()] = value.map(|value| ResolvedValue { value, origin });
        self.result.counts[arg.index()] += 1;
        self.result.matched.push(MatchedArg {
            arg,
            command: self.context,
            values: logical,
        });
        Ok(())
    }

    fn split(&self, spec: &ArgSpec, raw: Vec<String>) -> Vec<String> {
        let mut logical = Vec::with_capacity(raw.len());
        for value in raw {
            let value = if self.config.trim_quotes {
                trim_quotes(&value).to_string()
            } else {
                value
            };
            match &spec.split {
                Some(pattern) => logical.extend(pattern.split(&value).map(String::from)),
                None => logical.push(value),
            }
        }
        logical
    }

    /// Converts `logical` and folds it into the previous value.
    fn convert(
        &self,
        spec: &ArgSpec,
        logical: &[String],
        previous: Option<ResolvedValue>,
    ) -> Result<Option<Value>, ParseError> {
        let converter = &self.parser.converters[spec.id.index()];
        let converted = logical
            .iter()
            .map(|raw| {
                converter
                    .convert(raw)
                    .map_err(|source| ParseError::Conversion {
                        arg: spec.id,
                        name: spec.display_name().to_string(),
                        value: raw.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        // defaults never mix with matched values
        let previous = previous
            .filter(|p| p.origin != ValueOrigin::Default)
            .map(|p| p.value);
        Ok(fold(&spec.value_type, previous, converted))
    }

    /// Gives every unmatched argument of the chain its default, prompting
    /// for interactive positionals.
    fn apply_defaults(&mut self) -> Result<(), ParseError> {
        let graph = self.graph;
        let chain = self.result.commands.clone();
        for cmd in chain {
            for spec in graph.options(cmd).chain(graph.positionals(cmd)) {
                let index = spec.id.index();
                if self.result.values[index].is_some() {
                    continue;
                }

                if spec.is_positional()
                    && spec.interactive.is_some()
                    && self.result.counts[index] == 0
                    && !self.help_requested()
                {
                    let answer = self.parser.prompter.prompt(spec)?;
                    let logical = self.split(spec, vec![answer]);
                    let value = self.convert(spec, &logical, None)?;
                    self.result.values[index] = value.map(|value| ResolvedValue {
                        value,
                        origin: ValueOrigin::Prompt,
                    });
                    continue;
                }

                let resolved = spec.default_value.as_ref().and_then(|source| {
                    defaults::resolve(
                        source,
                        spec,
                        self.parser.environment.as_ref(),
                        &self.parser.providers,
                    )
                });
                self.result.values[index] = match resolved {
                    Some(raw) => {
                        let logical = self.split(spec, vec![raw]);
                        self.convert(spec, &logical, None)?.map(|value| ResolvedValue {
                            value,
                            origin: ValueOrigin::Default,
                        })
                    }
                    None if spec.is_option() && spec.is_boolean() => Some(ResolvedValue {
                        value: Value::Bool(false),
                        origin: ValueOrigin::Implicit,
                    }),
                    None => None,
                };
            }
        }
        Ok(())
    }

    fn help_requested(&self) -> bool {
        self.result.usage_help_requested || self.result.version_help_requested
    }
}

/// Folds converted values into the previous value according to the shape.
fn fold(value_type: &TypeDescriptor, previous: Option<Value>, converted: Vec<Value>) -> Option<Value> {
    match value_type {
        TypeDescriptor::Scalar(_) => converted.into_iter().last().or(previous),
        TypeDescriptor::Collection(_) => {
            let mut items = match previous {
                Some(Value::List(items)) => items,
                _ => Vec::new(),
            };
            items.extend(converted);
            Some(Value::List(items))
        }
        TypeDescriptor::Map(..) => {
            let mut entries = match previous {
                Some(Value::Map(entries)) => entries,
                _ => Vec::new(),
            };
            for entry in converted {
                let Value::Map(new) = entry else {
                    continue;
                };
                for (key, value) in new {
                    match entries.iter_mut().find(|(k, _)| *k == key) {
                        Some(slot) => slot.1 = value,
                        None => entries.push((key, value)),
                    }
                }
            }
            Some(Value::Map(entries))
        }
    }
}

fn is_boolean_literal(token: &str) -> bool {
    token.eq_ignore_ascii_case("true") || token.eq_ignore_ascii_case("false")
}

fn trim_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
