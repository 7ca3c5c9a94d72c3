//! Option, parameter and command lists.
//!
//! Argument rows use five columns:
//!
//! ```text
//! | marker (2) | short (2) | comma (1) | long names + param | description |
//! ```
//!
//! The long column holds one leading space, the longest entry (capped by
//! `long_options_max_width`) and one space of gap. The description takes the
//! remaining width and wraps inside its column; name text that overflows the
//! long column pushes the description to the next line.

use argbind_core::{ArgSpec, CommandGraph, CommandSpec, HelpConfig, OptionOrder};

use crate::markup::Text;
use crate::scheme::Styles;
use crate::table::{Column, Overflow, TextTable};

/// Narrowest description column the layout shrinks the long column for.
const MIN_DESCRIPTION: usize = 10;

/// Width of the marker, short-name and comma columns together.
const PREFIX: usize = 5;

/// Whether `name` is a single-dash, single-character option name.
pub(crate) fn is_short(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c != '-') && chars.next().is_none()
}

/// Option name as displayed; negatable long names read `--[no-]name`.
pub(crate) fn option_name(arg: &ArgSpec, name: &str, styles: &Styles) -> Text {
    if arg.is_negatable() {
        if let Some(rest) = name.strip_prefix("--") {
            let base = rest.strip_prefix("no-").unwrap_or(rest);
            return styles.option(&format!("--[no-]{base}"));
        }
    }
    styles.option(name)
}

/// Parameter text of an option: `=<x>`, `[=<x>]`, `=<x> <x>`, `=<x>...`.
pub(crate) fn option_param(arg: &ArgSpec, styles: &Styles) -> Text {
    if arg.takes_no_value() {
        return Text::new();
    }
    let arity = arg.arity;
    let repeats = arity.max.is_none_or(|max| max > arity.min.max(1));
    let label = styles.parameter(&arg.label);
    let mut out = Text::new();
    if arity.min == 0 {
        out.push_str("[=");
        out.push(label);
        if repeats {
            out.push_str("...");
        }
        out.push_str("]");
        return out;
    }
    out.push_str("=");
    out.push(label.clone());
    for _ in 1..arity.min {
        out.push_str(" ");
        out.push(label.clone());
    }
    if repeats {
        out.push_str("...");
    }
    out
}

/// Positional label, with `...` when it takes several values.
pub(crate) fn positional_label(arg: &ArgSpec, styles: &Styles) -> Text {
    let mut out = styles.parameter(&arg.label);
    if arg.arity.max.is_none_or(|max| max > 1) {
        out.push_str("...");
    }
    out
}

/// Sorts options in place.
pub(crate) fn sort_options(options: &mut [&ArgSpec], order: OptionOrder) {
    match order {
        OptionOrder::Alphabetical => options.sort_by_cached_key(|arg| {
            let name = arg.shortest_name();
            (name.trim_start_matches('-').to_lowercase(), name.to_string())
        }),
        OptionOrder::Declaration => options.sort_by_key(|arg| (arg.order.is_none(), arg.order)),
        OptionOrder::Unsorted => {}
    }
}

/// Cells of one argument row.
struct Row {
    marker: Text,
    short: Text,
    comma: Text,
    long: Text,
    description: Text,
}

/// Builds argument tables that share one column layout.
pub(crate) struct ArgLayout<'a> {
    config: &'a HelpConfig,
    styles: &'a Styles,
    long_width: usize,
    description_width: usize,
}

impl<'a> ArgLayout<'a> {
    /// Sizes the columns for every argument in `args`.
    pub fn new(config: &'a HelpConfig, styles: &'a Styles, args: &[&ArgSpec]) -> Self {
        let width = config.width;
        let longest = args
            .iter()
            .map(|arg| Self::long_text(arg, styles).width())
            .max()
            .unwrap_or(0)
            .min(config.long_options_max_width);
        let long_width = (longest + 2)
            .min(width.saturating_sub(PREFIX + MIN_DESCRIPTION))
            .max(1);
        Self {
            config,
            styles,
            long_width,
            description_width: width.saturating_sub(PREFIX + long_width).max(1),
        }
    }

    fn long_text(arg: &ArgSpec, styles: &Styles) -> Text {
        if arg.is_positional() {
            return positional_label(arg, styles);
        }
        let longs: Vec<&String> = arg.names().iter().filter(|n| !is_short(n)).collect();
        if longs.is_empty() {
            return Text::new();
        }
        let mut out = Text::new();
        for (i, name) in longs.into_iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push(option_name(arg, name, styles));
        }
        out.push(option_param(arg, styles));
        out
    }

    fn row(&self, arg: &ArgSpec) -> Row {
        let marker = match self.config.required_option_marker {
            Some(c) if arg.required => Text::plain(&c.to_string()),
            _ => Text::new(),
        };
        let long = Self::long_text(arg, self.styles);
        let short_name = arg.names().iter().find(|n| is_short(n));

        let mut short = Text::new();
        let mut comma = Text::new();
        if let Some(name) = short_name {
            short = option_name(arg, name, self.styles);
            if long.is_empty() {
                short.push(option_param(arg, self.styles));
            } else {
                comma = Text::plain(",");
            }
        }

        Row {
            marker,
            short,
            comma,
            long,
            description: self.description(arg),
        }
    }

    fn description(&self, arg: &ArgSpec) -> Text {
        let mut text = arg
            .description
            .as_deref()
            .map(Text::parse)
            .unwrap_or_default();
        if self.config.show_default_values {
            if let Some(default) = &arg.default_value {
                if !text.is_empty() {
                    text.push_str("\n");
                }
                text.push_str(&format!("Default: {default}"));
            }
        }
        text
    }

    /// A table with one row per argument, in the given order.
    pub fn table(&self, args: &[&ArgSpec]) -> TextTable {
        let mut table = TextTable::new(vec![
            Column::new(2, 0, Overflow::Span),
            Column::new(2, 0, Overflow::Span),
            Column::new(1, 0, Overflow::Span),
            Column::new(self.long_width, 1, Overflow::Span),
            Column::new(self.description_width, 0, Overflow::Wrap),
        ]);
        for arg in args {
            let row = self.row(arg);
            table.add_row(vec![row.marker, row.short, row.comma, row.long, row.description]);
        }
        table
    }
}

/// Subcommand list: names and aliases, then the first description line.
pub(crate) fn command_table(
    graph: &CommandGraph,
    commands: &[&CommandSpec],
    config: &HelpConfig,
    styles: &Styles,
) -> TextTable {
    let names: Vec<Text> = commands
        .iter()
        .map(|cmd| {
            let mut text = styles.command(&cmd.name);
            for alias in &cmd.aliases {
                text.push_str(", ");
                text.push(styles.command(alias));
            }
            text
        })
        .collect();

    let width = config.width;
    let longest = names
        .iter()
        .map(Text::width)
        .max()
        .unwrap_or(0)
        .min(config.long_options_max_width);
    let name_width = (longest + 4).min(width.saturating_sub(MIN_DESCRIPTION)).max(3);
    let mut table = TextTable::new(vec![
        Column::new(name_width, 2, Overflow::Span),
        Column::new(width.saturating_sub(name_width).max(1), 0, Overflow::Wrap),
    ]);

    for (cmd, name) in commands.iter().zip(names) {
        let summary = cmd
            .description
            .as_deref()
            .and_then(|d| d.lines().next())
            .map(Text::parse)
            .unwrap_or_default();
        tracing::trace!(command = %graph.qualified_name(cmd.id), "Listing subcommand");
        table.add_row(vec![name, summary]);
    }
    table
}
