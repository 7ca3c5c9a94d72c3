//! Completion candidates for a partial command line.
//!
//! [`complete`] replays token classification up to the cursor, without
//! converting anything, to learn which command the cursor is in and whether
//! an option is still waiting for values. It then proposes option names, the
//! candidates of the argument being filled, or subcommand names.

use argbind_core::{ArgId, ArgSpec, CommandGraph, CommandId, ParserConfig};
use tracing::debug;

use crate::lexer::{Lexer, Token};

/// Option waiting for values at the cursor.
struct Pending {
    arg: ArgId,
    taken: usize,
}

/// Completion candidates for `args[arg_index]`, using its first `position`
/// characters as the prefix.
///
/// # Examples
///
/// ```
/// use argbind_core::*;
/// use argbind_parser::complete;
///
/// let graph = CommandDef::new("git")
///     .with_option(OptionDef::flag(&["--verbose"]))
///     .with_subcommand(CommandDef::new("commit"))
///     .with_subcommand(CommandDef::new("checkout"))
///     .build()
///     .unwrap();
/// let config = ParserConfig::default();
///
/// let args = vec!["ch".to_string()];
/// assert_eq!(complete(&graph, &config, &args, 0, 2), vec!["checkout"]);
///
/// let args = vec!["--v".to_string()];
/// assert_eq!(complete(&graph, &config, &args, 0, 3), vec!["--verbose"]);
/// ```
pub fn complete(
    graph: &CommandGraph,
    config: &ParserConfig,
    args: &[String],
    arg_index: usize,
    position: usize,
) -> Vec<String> {
    let lexer = Lexer::new(graph, config);
    let mut context = graph.root();
    let mut positional_index = 0usize;
    let mut pending: Option<Pending> = None;
    let mut end_of_options = false;

    for token in args.iter().take(arg_index) {
        if let Some(p) = pending.as_mut() {
            let arity = graph.arg(p.arg).arity;
            let mandatory = p.taken < arity.min;
            let room = arity.max.is_none_or(|max| p.taken < max);
            if mandatory || (room && !lexer.stops_values(context, token)) {
                p.taken += 1;
                if arity.max.is_some_and(|max| p.taken >= max) {
                    pending = None;
                }
                continue;
            }
            pending = None;
        }
        if end_of_options {
            positional_index += 1;
            continue;
        }

        match lexer.classify(context, token) {
            Ok(Token::Delimiter) => end_of_options = true,
            Ok(Token::Subcommand(sub)) => {
                context = sub;
                positional_index = 0;
            }
            Ok(Token::Option {
                arg,
                attached: None,
                ..
            }) => pending = awaiting(graph.arg(arg)),
            Ok(Token::Cluster(parts)) => {
                pending = parts
                    .last()
                    .filter(|part| part.attached.is_none())
                    .and_then(|part| awaiting(graph.arg(part.arg)));
            }
            Ok(Token::Positional) => positional_index += 1,
            _ => {}
        }
    }

    let current = args.get(arg_index).map(String::as_str).unwrap_or("");
    let prefix: String = current.chars().take(position).collect();
    debug!(command = %graph.qualified_name(context), prefix = %prefix, "Completing");

    if let Some(p) = pending {
        return filter(candidates(graph.arg(p.arg)), &prefix);
    }
    if end_of_options {
        return positional_candidates(graph, context, positional_index, &prefix);
    }
    if prefix.starts_with('-') {
        return option_candidates(graph, config, context, &prefix);
    }

    let mut found: Vec<String> = graph
        .subcommands(context)
        .filter(|sub| !sub.hidden)
        .flat_map(|sub| std::iter::once(sub.name.clone()).chain(sub.aliases.iter().cloned()))
        .collect();
    found.extend(candidates_at(graph, context, positional_index));
    filter(found, &prefix)
}

fn awaiting(arg: &ArgSpec) -> Option<Pending> {
    (!arg.takes_no_value() && !arg.is_boolean()).then_some(Pending {
        arg: arg.id,
        taken: 0,
    })
}

fn option_candidates(
    graph: &CommandGraph,
    config: &ParserConfig,
    context: CommandId,
    prefix: &str,
) -> Vec<String> {
    let separator = config.separator.as_str();
    if !separator.is_empty() {
        if let Some((name, value)) = prefix.split_once(separator) {
            let Some(arg) = graph.find_option(context, name) else {
                return Vec::new();
            };
            return filter(candidates(arg), value)
                .into_iter()
                .map(|c| format!("{name}{separator}{c}"))
                .collect();
        }
    }

    let names: Vec<String> = graph
        .visible_options(context)
        .into_iter()
        .filter(|arg| !arg.hidden)
        .flat_map(|arg| arg.names().iter().cloned().chain(arg.negated_names()))
        .collect();
    filter(names, prefix)
}

fn positional_candidates(
    graph: &CommandGraph,
    context: CommandId,
    index: usize,
    prefix: &str,
) -> Vec<String> {
    filter(candidates_at(graph, context, index), prefix)
}

fn candidates_at(graph: &CommandGraph, context: CommandId, index: usize) -> Vec<String> {
    graph
        .positional_at(context, index)
        .map(candidates)
        .unwrap_or_default()
}

/// Explicit candidates, or the variants of an enum type.
fn candidates(arg: &ArgSpec) -> Vec<String> {
    if arg.completion_candidates.is_empty() {
        arg.value_type.element().variants().to_vec()
    } else {
        arg.completion_candidates.clone()
    }
}

fn filter(mut found: Vec<String>, prefix: &str) -> Vec<String> {
    found.retain(|c| c.starts_with(prefix));
    let mut seen = std::collections::HashSet::new();
    found.retain(|c| seen.insert(c.clone()));
    found
}
