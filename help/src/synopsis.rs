//! The usage line.
//!
//! ```text
//! Usage: tar [-cvx] [-f=<file>] (-a | -b) <path>... [COMMAND]
//! ```
//!
//! Elements are appended in the configured order. An element that does not
//! fit on the current line starts a new line indented to align with the
//! first element.

use argbind_core::{
    ArgGroupSpec, ArgSpec, CommandGraph, CommandId, GroupMember, HelpConfig, SynopsisElement,
};

use crate::layout::{is_short, option_name, option_param, positional_label, sort_options};
use crate::markup::Text;
use crate::scheme::Styles;

pub(crate) struct Synopsis<'a> {
    graph: &'a CommandGraph,
    config: &'a HelpConfig,
    styles: &'a Styles,
}

impl<'a> Synopsis<'a> {
    pub fn new(graph: &'a CommandGraph, config: &'a HelpConfig, styles: &'a Styles) -> Self {
        Self {
            graph,
            config,
            styles,
        }
    }

    /// Synopsis lines of `cmd`.
    pub fn lines(&self, cmd: CommandId) -> Vec<Text> {
        let heading = Text::parse(&self.config.headings.synopsis);
        let mut prefix = heading.clone();
        prefix.push(self.styles.command(&self.graph.qualified_name(cmd)));
        self.fill(prefix, heading.width(), self.elements(cmd))
    }

    fn elements(&self, cmd: CommandId) -> Vec<Text> {
        let mut out = Vec::new();
        let mut delimiter_done = !self.config.show_end_of_options_delimiter;
        for element in &self.config.synopsis_order {
            match element {
                SynopsisElement::Options => out.extend(self.options(cmd)),
                SynopsisElement::Groups => out.extend(
                    self.graph
                        .root_groups(cmd)
                        .filter_map(|group| self.group(group)),
                ),
                SynopsisElement::Positionals => {
                    if !delimiter_done {
                        out.push(Text::plain("[--]"));
                        delimiter_done = true;
                    }
                    out.extend(
                        self.graph
                            .positionals(cmd)
                            .filter(|arg| !arg.hidden && arg.group.is_none())
                            .map(|arg| self.positional(arg)),
                    );
                }
                SynopsisElement::Subcommands => {
                    if self.graph.subcommands(cmd).any(|sub| !sub.hidden) {
                        out.push(self.styles.command("[COMMAND]"));
                    }
                }
            }
        }
        if !delimiter_done {
            out.push(Text::plain("[--]"));
        }
        out
    }

    fn options(&self, cmd: CommandId) -> Vec<Text> {
        let mut options: Vec<&ArgSpec> = self
            .graph
            .visible_options(cmd)
            .into_iter()
            .filter(|arg| !arg.hidden && arg.group.is_none())
            .collect();
        sort_options(&mut options, self.config.sort_options);

        let (clustered, rest): (Vec<&ArgSpec>, Vec<&ArgSpec>) =
            options.into_iter().partition(|arg| {
                !arg.required && arg.takes_no_value() && arg.names().iter().any(|n| is_short(n))
            });

        let mut out = Vec::new();
        if !clustered.is_empty() {
            let letters: String = clustered
                .iter()
                .filter_map(|arg| arg.names().iter().find(|n| is_short(n)))
                .filter_map(|name| name.chars().nth(1))
                .collect();
            let mut text = Text::plain("[");
            text.push(self.styles.option(&format!("-{letters}")));
            text.push_str("]");
            out.push(text);
        }
        for arg in rest {
            let mut text = if arg.required {
                self.option_core(arg)
            } else {
                Self::bracket("[", self.option_core(arg), "]")
            };
            if arg.is_multi_value() {
                text.push_str("...");
            }
            out.push(text);
        }
        out
    }

    fn option_core(&self, arg: &ArgSpec) -> Text {
        let mut text = option_name(arg, arg.shortest_name(), self.styles);
        text.push(option_param(arg, self.styles));
        text
    }

    fn positional(&self, arg: &ArgSpec) -> Text {
        let label = positional_label(arg, self.styles);
        if arg.arity.min == 0 {
            Self::bracket("[", label, "]")
        } else {
            label
        }
    }

    fn member(&self, arg: &ArgSpec) -> Text {
        if arg.is_positional() {
            positional_label(arg, self.styles)
        } else {
            self.option_core(arg)
        }
    }

    /// A group such as `(-a | -b)` or `[-u=<user> [-p=<pass>]]`.
    fn group(&self, group: &ArgGroupSpec) -> Option<Text> {
        let separator = if group.exclusive { " | " } else { " " };
        let members: Vec<Text> = group
            .children
            .iter()
            .filter_map(|member| match member {
                GroupMember::Arg(id) => {
                    let arg = self.graph.arg(*id);
                    if arg.hidden {
                        return None;
                    }
                    let text = self.member(arg);
                    Some(if group.exclusive || arg.required {
                        text
                    } else {
                        Self::bracket("[", text, "]")
                    })
                }
                GroupMember::Group(sub) => self.group(self.graph.group(*sub)),
            })
            .collect();
        if members.is_empty() {
            return None;
        }

        let mut inner = Text::new();
        for (i, member) in members.into_iter().enumerate() {
            if i > 0 {
                inner.push_str(separator);
            }
            inner.push(member);
        }
        let mut text = if group.is_required() {
            Self::bracket("(", inner, ")")
        } else {
            Self::bracket("[", inner, "]")
        };
        if group.multiplicity.max.is_none_or(|max| max > 1) {
            text.push_str("...");
        }
        Some(text)
    }

    fn bracket(open: &str, inner: Text, close: &str) -> Text {
        let mut text = Text::plain(open);
        text.push(inner);
        text.push_str(close);
        text
    }

    /// Packs `elements` after `prefix`, wrapping at the configured width.
    fn fill(&self, prefix: Text, heading_width: usize, elements: Vec<Text>) -> Vec<Text> {
        let width = self.config.width;
        let mut indent = prefix.width() + 1;
        if indent > width / 2 {
            indent = heading_width.min(width / 2);
        }

        let mut lines = Vec::new();
        let mut line = prefix;
        for element in elements {
            if line.width() + 1 + element.width() <= width {
                line.push_str(" ");
                line.push(element);
                continue;
            }
            lines.push(std::mem::take(&mut line));
            let pad = " ".repeat(indent);
            let mut pieces = element.wrap(width.saturating_sub(indent).max(1));
            let last = pieces.pop().unwrap_or_default();
            for piece in pieces {
                lines.push(Text::plain(&pad).with(piece));
            }
            line = Text::plain(&pad).with(last);
        }
        lines.push(line);
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argbind_core::{Arity, CommandDef, GroupDef, OptionDef, PositionalDef, TypeDescriptor};

    fn render(def: CommandDef, config: &HelpConfig) -> String {
        let graph = def.build().unwrap();
        let styles = Styles::default();
        Synopsis::new(&graph, config, &styles)
            .lines(graph.root())
            .iter()
            .map(|line| format!("{}\n", line.plain_text()))
            .collect()
    }

    #[test]
    fn test_flags_cluster() {
        let def = CommandDef::new("tar")
            .with_option(OptionDef::flag(&["-v"]))
            .with_option(OptionDef::flag(&["-c", "--create"]))
            .with_option(OptionDef::with_value(&["-f", "--file"], TypeDescriptor::default()));
        assert_eq!(
            render(def, &HelpConfig::default()),
            "Usage: tar [-cv] [-f=<file>]\n"
        );
    }

    #[test]
    fn test_required_and_multi_value() {
        let def = CommandDef::new("app")
            .with_option(
                OptionDef::with_value(&["--name"], TypeDescriptor::default()).required(),
            )
            .with_option(OptionDef::with_value(
                &["-D"],
                TypeDescriptor::Collection(argbind_core::ScalarType::String),
            ))
            .with_positional(
                PositionalDef::optional(
                    "<files>",
                    TypeDescriptor::Collection(argbind_core::ScalarType::Path),
                )
                    .with_arity(Arity::at_least(0)),
            );
        assert_eq!(
            render(def, &HelpConfig::default()),
            "Usage: app [-D=<D>]... --name=<name> [<files>...]\n"
        );
    }

    #[test]
    fn test_groups() {
        let def = CommandDef::new("g")
            .with_option(OptionDef::flag(&["-a"]))
            .with_option(OptionDef::flag(&["-b"]))
            .with_option(OptionDef::with_value(&["-u"], TypeDescriptor::default()).required())
            .with_option(OptionDef::with_value(&["-p"], TypeDescriptor::default()))
            .with_group(GroupDef::exclusive("mode").with_arg("-a").with_arg("-b").required())
            .with_group(GroupDef::co_occurring("creds").with_arg("-u").with_arg("-p"));
        assert_eq!(
            render(def, &HelpConfig::default()),
            "Usage: g (-a | -b) [-u=<u> [-p=<p>]]\n"
        );
    }

    #[test]
    fn test_delimiter_and_subcommands() {
        let def = CommandDef::new("git")
            .with_positional(PositionalDef::required("<path>", TypeDescriptor::default()))
            .with_subcommand(CommandDef::new("commit"));
        let config = HelpConfig {
            show_end_of_options_delimiter: true,
            ..HelpConfig::default()
        };
        assert_eq!(render(def, &config), "Usage: git [--] <path> [COMMAND]\n");
    }

    #[test]
    fn test_wraps_aligned_after_command_name() {
        let mut def = CommandDef::new("cmd");
        for name in ["--alpha", "--bravo", "--charlie", "--delta"] {
            def = def.with_option(OptionDef::with_value(&[name], TypeDescriptor::default()));
        }
        let config = HelpConfig {
            width: 40,
            ..HelpConfig::default()
        };
        assert_eq!(
            render(def, &config),
            "Usage: cmd [--alpha=<alpha>]\n           [--bravo=<bravo>]\n           [--charlie=<charlie>]\n           [--delta=<delta>]\n"
        );
    }
}
