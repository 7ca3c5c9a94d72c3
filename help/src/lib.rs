//! # argbind-help
//!
//! Usage and help text for command graphs built with `argbind-core`.
//!
//! A help document is made of sections rendered in the configured order:
//!
//! - **Header** and **Description**: free text with `@|style text|@` markup
//! - **Synopsis**: `Usage: git commit [-av] [-m=<msg>] [<path>...]`
//! - **Parameters** and **Options**: aligned tables, wrapped descriptions
//! - **Commands**: subcommand names with their first description line
//! - **Footer**
//!
//! All output is wrapped to the configured width, measured in display
//! columns, with styles applied as ANSI escape codes when enabled.
//!
//! # Example
//!
//! ```
//! use argbind_core::{CommandDef, HelpConfig, OptionDef, TypeDescriptor};
//! use argbind_help::Help;
//!
//! let graph = CommandDef::new("tar")
//!     .with_option(OptionDef::flag(&["-v", "--verbose"]).with_description("Verbose output"))
//!     .with_option(OptionDef::with_value(&["-f", "--file"], TypeDescriptor::default()))
//!     .build()
//!     .unwrap();
//!
//! let help = Help::new(&graph, HelpConfig::default()).with_ansi(false);
//! assert_eq!(
//!     help.render(graph.root()),
//!     "Usage: tar [-v] [-f=<file>]\n  -f, --file=<file>\n  -v, --verbose     Verbose output\n"
//! );
//! ```

mod layout;
mod markup;
mod scheme;
mod synopsis;
mod table;
mod width;

use std::io::IsTerminal;

use argbind_core::{AnsiMode, ArgSpec, CommandGraph, CommandId, HelpConfig, HelpSection};
use tracing::debug;

pub use markup::{Color, Span, Style, Text};
pub use scheme::ColorScheme;
pub use table::{Column, Overflow, TextTable};
pub use width::{char_width, str_width};

use layout::{ArgLayout, command_table, sort_options};
use scheme::Styles;
use synopsis::Synopsis;

/// Arguments listed under a group heading, in order of first appearance.
type Headed<'g> = Vec<(String, Vec<&'g ArgSpec>)>;

/// Narrowest width the help is laid out for.
pub const MIN_WIDTH: usize = 20;

/// Renders usage and help text for the commands of one graph.
#[derive(Debug, Clone)]
pub struct Help<'g> {
    graph: &'g CommandGraph,
    config: HelpConfig,
    ansi: bool,
    styles: Styles,
}

impl<'g> Help<'g> {
    /// Creates a renderer; widths below [`MIN_WIDTH`] are raised to it.
    pub fn new(graph: &'g CommandGraph, mut config: HelpConfig) -> Self {
        config.width = config.width.max(MIN_WIDTH);
        let ansi = match config.ansi {
            AnsiMode::On => true,
            AnsiMode::Off => false,
            AnsiMode::Auto => {
                std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
            }
        };
        Self {
            graph,
            config,
            ansi,
            styles: Styles::new(&ColorScheme::default()),
        }
    }

    /// Overrides the ANSI mode of the configuration.
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    pub fn with_scheme(mut self, scheme: &ColorScheme) -> Self {
        self.styles = Styles::new(scheme);
        self
    }

    pub fn config(&self) -> &HelpConfig {
        &self.config
    }

    /// The usage line(s) of `cmd`.
    pub fn synopsis(&self, cmd: CommandId) -> String {
        self.finish(Synopsis::new(self.graph, &self.config, &self.styles).lines(cmd))
    }

    /// The complete help text of `cmd`.
    pub fn render(&self, cmd: CommandId) -> String {
        let spec = self.graph.command(cmd);
        debug!(
            command = %self.graph.qualified_name(cmd),
            width = self.config.width,
            ansi = self.ansi,
            "Rendering help"
        );

        let (positionals, options, headed) = self.partition(cmd);
        let mut all: Vec<&ArgSpec> = positionals.clone();
        all.extend(options.iter().copied());
        all.extend(headed.iter().flat_map(|(_, args)| args.iter().copied()));
        let layout = ArgLayout::new(&self.config, &self.styles, &all);

        let mut out = String::new();
        for section in &self.config.sections {
            match section {
                HelpSection::Header => out.push_str(&self.paragraph(spec.header.as_deref())),
                HelpSection::Synopsis => out.push_str(&self.synopsis(cmd)),
                HelpSection::Description => {
                    out.push_str(&self.paragraph(spec.description.as_deref()))
                }
                HelpSection::Parameters => {
                    out.push_str(&self.arg_section(
                        &self.config.headings.parameters,
                        &layout,
                        &positionals,
                    ));
                }
                HelpSection::Options => {
                    out.push_str(&self.arg_section(
                        &self.config.headings.options,
                        &layout,
                        &options,
                    ));
                    for (heading, args) in &headed {
                        out.push_str(&self.arg_section(heading, &layout, args));
                    }
                }
                HelpSection::Commands => out.push_str(&self.commands(cmd)),
                HelpSection::Footer => out.push_str(&self.paragraph(spec.footer.as_deref())),
            }
        }
        out
    }

    /// Help of `cmd` followed by the help of each visible subcommand, depth first.
    pub fn render_recursive(&self, cmd: CommandId) -> String {
        let mut out = self.render(cmd);
        for sub in self.graph.subcommands(cmd).filter(|sub| !sub.hidden) {
            out.push('\n');
            out.push_str(&self.render_recursive(sub.id));
        }
        out
    }

    /// Version lines of `cmd`.
    pub fn render_version(&self, cmd: CommandId) -> String {
        let lines = self
            .graph
            .command(cmd)
            .version
            .iter()
            .flat_map(|line| Text::parse(line).wrap(self.config.width))
            .collect();
        self.finish(lines)
    }

    /// Splits the visible arguments of `cmd` into positionals, options and
    /// sections of arguments whose group carries a heading.
    fn partition(&self, cmd: CommandId) -> (Vec<&'g ArgSpec>, Vec<&'g ArgSpec>, Headed<'g>) {
        let mut headed: Headed<'g> = Vec::new();
        let mut place = |arg: &'g ArgSpec| -> bool {
            let Some(heading) = self.heading_of(arg) else {
                return false;
            };
            match headed.iter_mut().find(|(h, _)| *h == heading) {
                Some((_, args)) => args.push(arg),
                None => headed.push((heading, vec![arg])),
            }
            true
        };

        let graph = self.graph;
        let positionals: Vec<&'g ArgSpec> = graph
            .positionals(cmd)
            .filter(|arg| !arg.hidden)
            .filter(|arg| !place(*arg))
            .collect();
        let mut options: Vec<&'g ArgSpec> = graph
            .visible_options(cmd)
            .into_iter()
            .filter(|arg| !arg.hidden)
            .collect();
        sort_options(&mut options, self.config.sort_options);
        let options = options.into_iter().filter(|arg| !place(*arg)).collect();
        (positionals, options, headed)
    }

    /// Heading of the nearest enclosing group that has one.
    fn heading_of(&self, arg: &ArgSpec) -> Option<String> {
        let mut group = arg.group;
        while let Some(id) = group {
            let spec = self.graph.group(id);
            if let Some(heading) = &spec.heading {
                return Some(heading.clone());
            }
            group = spec.parent;
        }
        None
    }

    fn arg_section(&self, heading: &str, layout: &ArgLayout<'_>, args: &[&ArgSpec]) -> String {
        if args.is_empty() {
            return String::new();
        }
        let mut out = self.heading(heading);
        out.push_str(&layout.table(args).render(self.ansi));
        out
    }

    fn commands(&self, cmd: CommandId) -> String {
        let subs: Vec<_> = self.graph.subcommands(cmd).filter(|sub| !sub.hidden).collect();
        if subs.is_empty() {
            return String::new();
        }
        let mut out = self.heading(&self.config.headings.commands);
        out.push_str(&command_table(self.graph, &subs, &self.config, &self.styles).render(self.ansi));
        out
    }

    fn heading(&self, heading: &str) -> String {
        if heading.is_empty() {
            return String::new();
        }
        self.finish(Text::parse(heading).wrap(self.config.width))
    }

    fn paragraph(&self, markup: Option<&str>) -> String {
        match markup {
            Some(markup) if !markup.is_empty() => {
                self.finish(Text::parse(markup).wrap(self.config.width))
            }
            _ => String::new(),
        }
    }

    fn finish(&self, lines: Vec<Text>) -> String {
        lines
            .iter()
            .map(|line| format!("{}\n", line.render(self.ansi)))
            .collect()
    }
}
