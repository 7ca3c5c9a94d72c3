//! The built, immutable command graph.
//!
//! [`CommandDef::build`](crate::CommandDef::build) turns a definition tree into
//! a [`CommandGraph`]: an arena of commands, arguments and groups addressed by
//! the opaque handles [`CommandId`], [`ArgId`] and [`GroupId`]. Parent links
//! are plain handles, so inherited-option lookup is an upward walk over the
//! arena and no node owns its parent.
//!
//! Building validates the structural invariants eagerly: duplicate or
//! malformed option names, duplicate subcommands, conflicting positional
//! indices, bad arities, uncompilable split patterns, unknown or reused group
//! members and group cycles are all rejected with a [`BuildError`].

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::merge::apply_mixins;
use crate::types::{
    Arity, CommandDef, DefaultSource, GroupDef, IndexRange, InteractiveDef, OptionDef,
    PositionalDef, ScalarType, Scope, TypeDescriptor,
};

/// Handle of a command in a [`CommandGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommandId(pub(crate) usize);

/// Handle of an option or positional parameter in a [`CommandGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArgId(pub(crate) usize);

/// Handle of an argument group in a [`CommandGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub(crate) usize);

impl CommandId {
    /// Arena index of the command.
    pub fn index(self) -> usize {
        self.0
    }
}

impl ArgId {
    /// Arena index of the argument.
    pub fn index(self) -> usize {
        self.0
    }
}

impl GroupId {
    /// Arena index of the group.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A built command.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub id: CommandId,
    pub name: String,
    pub aliases: Vec<String>,
    pub version: Vec<String>,
    pub description: Option<String>,
    pub header: Option<String>,
    pub footer: Option<String>,
    /// Own options in declaration order.
    pub options: Vec<ArgId>,
    /// Own positionals in index order.
    pub positionals: Vec<ArgId>,
    /// All groups declared on the command, nested ones included.
    pub groups: Vec<GroupId>,
    pub subcommands: Vec<CommandId>,
    /// Non-owning link to the parent command.
    pub parent: Option<CommandId>,
    /// Handle of the target receiving bound values.
    pub target: Option<String>,
    /// Names of the mixins merged into this command.
    pub mixins: Vec<String>,
    pub hidden: bool,
}

impl CommandSpec {
    /// Returns `true` if `name` is the command's name or one of its aliases.
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

/// Option- or positional-specific attributes.
#[derive(Debug, Clone)]
pub enum ArgKind {
    Option {
        names: Vec<String>,
        negatable: bool,
        usage_help: bool,
        version_help: bool,
    },
    Positional {
        index: IndexRange,
    },
}

/// A built option or positional parameter.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub id: ArgId,
    /// The declaring command.
    pub command: CommandId,
    pub kind: ArgKind,
    /// Parameter label (`<file>`), also the positional's reference name.
    pub label: String,
    pub description: Option<String>,
    pub arity: Arity,
    pub value_type: TypeDescriptor,
    /// Required relative to the enclosing group, or to the command when ungrouped.
    pub required: bool,
    pub default_value: Option<DefaultSource>,
    pub split: Option<Regex>,
    pub interactive: Option<InteractiveDef>,
    pub scope: Scope,
    pub hidden: bool,
    pub completion_candidates: Vec<String>,
    pub group: Option<GroupId>,
    pub order: Option<i32>,
    /// Position among the declaring command's options or positionals.
    pub declaration: usize,
}

impl ArgSpec {
    pub fn is_option(&self) -> bool {
        matches!(self.kind, ArgKind::Option { .. })
    }

    pub fn is_positional(&self) -> bool {
        matches!(self.kind, ArgKind::Positional { .. })
    }

    /// Option names; empty for positionals.
    pub fn names(&self) -> &[String] {
        match &self.kind {
            ArgKind::Option { names, .. } => names,
            ArgKind::Positional { .. } => &[],
        }
    }

    pub fn is_negatable(&self) -> bool {
        matches!(self.kind, ArgKind::Option { negatable: true, .. })
    }

    pub fn is_usage_help(&self) -> bool {
        matches!(self.kind, ArgKind::Option { usage_help: true, .. })
    }

    pub fn is_version_help(&self) -> bool {
        matches!(self.kind, ArgKind::Option { version_help: true, .. })
    }

    /// Index range of a positional.
    pub fn index(&self) -> Option<IndexRange> {
        match &self.kind {
            ArgKind::Positional { index } => Some(*index),
            ArgKind::Option { .. } => None,
        }
    }

    /// Name used in messages: the longest option name, or the label.
    pub fn display_name(&self) -> &str {
        self.names()
            .iter()
            .max_by_key(|n| n.len())
            .map(String::as_str)
            .unwrap_or(&self.label)
    }

    /// The shortest option name, or the label.
    pub fn shortest_name(&self) -> &str {
        self.names()
            .iter()
            .min_by_key(|n| n.len())
            .map(String::as_str)
            .unwrap_or(&self.label)
    }

    /// Negated forms of the option's long names.
    pub fn negated_names(&self) -> Vec<String> {
        if !self.is_negatable() {
            return Vec::new();
        }
        self.names().iter().filter_map(|n| negate_name(n)).collect()
    }

    pub fn is_boolean(&self) -> bool {
        self.value_type.is_boolean()
    }

    pub fn is_multi_value(&self) -> bool {
        self.value_type.is_multi_value()
    }

    /// Returns `true` when the argument never consumes a value.
    pub fn takes_no_value(&self) -> bool {
        self.arity.max == Some(0)
    }

    /// Prompt text for interactive input.
    pub fn prompt_text(&self) -> String {
        self.interactive
            .as_ref()
            .and_then(|i| i.prompt.clone())
            .unwrap_or_else(|| format!("Enter value for {}: ", self.display_name()))
    }
}

/// Derives the negated form of a long option name.
///
/// ```
/// use argbind_core::negate_name;
///
/// assert_eq!(negate_name("--color").as_deref(), Some("--no-color"));
/// assert_eq!(negate_name("--no-color").as_deref(), Some("--color"));
/// assert_eq!(negate_name("-c"), None);
/// ```
pub fn negate_name(name: &str) -> Option<String> {
    if let Some(rest) = name.strip_prefix("--no-") {
        Some(format!("--{rest}"))
    } else {
        name.strip_prefix("--").map(|rest| format!("--no-{rest}"))
    }
}

/// Member of an argument group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMember {
    Arg(ArgId),
    Group(GroupId),
}

/// A built argument group.
#[derive(Debug, Clone)]
pub struct ArgGroupSpec {
    pub id: GroupId,
    pub name: String,
    pub command: CommandId,
    pub heading: Option<String>,
    pub exclusive: bool,
    pub multiplicity: Arity,
    pub children: Vec<GroupMember>,
    pub parent: Option<GroupId>,
}

impl ArgGroupSpec {
    /// Returns `true` when the group must occur at least once.
    pub fn is_required(&self) -> bool {
        self.multiplicity.min > 0
    }
}

/// Arena holding every command, argument and group of one definition tree.
///
/// The graph is immutable once built and can be shared freely between
/// parses; per-invocation values live in the parse result.
#[derive(Debug, Clone, Default)]
pub struct CommandGraph {
    commands: Vec<CommandSpec>,
    args: Vec<ArgSpec>,
    groups: Vec<ArgGroupSpec>,
}

impl CommandGraph {
    /// The top-level command.
    pub fn root(&self) -> CommandId {
        CommandId(0)
    }

    pub fn command(&self, id: CommandId) -> &CommandSpec {
        &self.commands[id.0]
    }

    pub fn arg(&self, id: ArgId) -> &ArgSpec {
        &self.args[id.0]
    }

    pub fn group(&self, id: GroupId) -> &ArgGroupSpec {
        &self.groups[id.0]
    }

    /// All commands in build order (parents before children).
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// All arguments in build order.
    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    /// Number of arguments, i.e. the size of a per-invocation side table.
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Own options of `cmd` in declaration order.
    pub fn options(&self, cmd: CommandId) -> impl Iterator<Item = &ArgSpec> + '_ {
        self.command(cmd).options.iter().map(|id| self.arg(*id))
    }

    /// Positionals of `cmd` in index order.
    pub fn positionals(&self, cmd: CommandId) -> impl Iterator<Item = &ArgSpec> + '_ {
        self.command(cmd).positionals.iter().map(|id| self.arg(*id))
    }

    /// All groups declared on `cmd`.
    pub fn groups(&self, cmd: CommandId) -> impl Iterator<Item = &ArgGroupSpec> + '_ {
        self.command(cmd).groups.iter().map(|id| self.group(*id))
    }

    /// Groups of `cmd` that are not nested in another group.
    pub fn root_groups(&self, cmd: CommandId) -> impl Iterator<Item = &ArgGroupSpec> + '_ {
        self.groups(cmd).filter(|g| g.parent.is_none())
    }

    /// The group directly containing `arg`.
    pub fn group_of(&self, arg: ArgId) -> Option<GroupId> {
        self.arg(arg).group
    }

    /// Direct subcommands of `cmd`.
    pub fn subcommands(&self, cmd: CommandId) -> impl Iterator<Item = &CommandSpec> + '_ {
        self.command(cmd).subcommands.iter().map(|id| self.command(*id))
    }

    /// Finds a direct subcommand by name or alias.
    pub fn find_subcommand(&self, cmd: CommandId, name: &str) -> Option<CommandId> {
        self.subcommands(cmd).find(|c| c.matches(name)).map(|c| c.id)
    }

    /// Ancestors of `cmd`, nearest first, excluding `cmd` itself.
    pub fn ancestors(&self, cmd: CommandId) -> impl Iterator<Item = CommandId> + '_ {
        std::iter::successors(self.command(cmd).parent, |id| self.command(*id).parent)
    }

    /// Command path from the root down to `cmd`.
    pub fn path(&self, cmd: CommandId) -> Vec<CommandId> {
        let mut path: Vec<_> = self.ancestors(cmd).collect();
        path.reverse();
        path.push(cmd);
        path
    }

    /// Space-separated names from the root down to `cmd` (e.g. `git remote add`).
    pub fn qualified_name(&self, cmd: CommandId) -> String {
        self.path(cmd)
            .into_iter()
            .map(|id| self.command(id).name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Options declared by ancestors with [`Scope::Inherit`].
    pub fn inherited_options(&self, cmd: CommandId) -> impl Iterator<Item = &ArgSpec> + '_ {
        self.ancestors(cmd)
            .flat_map(move |id| self.options(id))
            .filter(|a| a.scope == Scope::Inherit)
    }

    /// Own options followed by inherited ones.
    pub fn visible_options(&self, cmd: CommandId) -> Vec<&ArgSpec> {
        self.options(cmd).chain(self.inherited_options(cmd)).collect()
    }

    /// Finds an option by exact name, walking up for inherited options.
    pub fn find_option(&self, cmd: CommandId, name: &str) -> Option<&ArgSpec> {
        self.options(cmd)
            .chain(self.inherited_options(cmd))
            .find(|a| a.names().iter().any(|n| n == name))
    }

    /// Finds a negatable option by one of its negated forms.
    pub fn find_negated(&self, cmd: CommandId, name: &str) -> Option<&ArgSpec> {
        self.options(cmd)
            .chain(self.inherited_options(cmd))
            .find(|a| a.negated_names().iter().any(|n| n == name))
    }

    /// The positional covering `index`, if any.
    pub fn positional_at(&self, cmd: CommandId, index: usize) -> Option<&ArgSpec> {
        self.positionals(cmd)
            .find(|a| a.index().is_some_and(|range| range.contains(index)))
    }

    /// Compact label of a group such as `(-x | -y)`.
    pub fn group_label(&self, id: GroupId) -> String {
        let group = self.group(id);
        let separator = if group.exclusive { " | " } else { " " };
        let members = group
            .children
            .iter()
            .map(|member| match member {
                GroupMember::Arg(arg) => self.arg(*arg).shortest_name().to_string(),
                GroupMember::Group(sub) => self.group_label(*sub),
            })
            .collect::<Vec<_>>()
            .join(separator);
        format!("({members})")
    }

    fn add_command(
        &mut self,
        def: &CommandDef,
        parent: Option<CommandId>,
    ) -> Result<CommandId, BuildError> {
        let name = def.name.trim();
        if name.is_empty() {
            return Err(BuildError::EmptyCommandName);
        }

        let merged;
        let def = if def.mixins.is_empty() {
            def
        } else {
            merged = apply_mixins(def);
            &merged
        };

        let id = CommandId(self.commands.len());
        self.commands.push(CommandSpec {
            id,
            name: name.to_string(),
            aliases: def.aliases.iter().map(|a| a.trim().to_string()).collect(),
            version: def.version.clone(),
            description: def.description.clone(),
            header: def.header.clone(),
            footer: def.footer.clone(),
            options: Vec::new(),
            positionals: Vec::new(),
            groups: Vec::new(),
            subcommands: Vec::new(),
            parent,
            target: def.target.clone(),
            mixins: def.mixins.iter().map(|m| m.name.clone()).collect(),
            hidden: def.hidden,
        });

        let qualified = self.qualified_name(id);
        self.add_options(id, &def.options, &qualified)?;
        self.add_positionals(id, &def.positionals, &qualified)?;
        self.add_groups(id, &def.groups, &qualified)?;

        let mut seen: HashSet<String> = HashSet::new();
        for sub in &def.subcommands {
            for sub_name in std::iter::once(&sub.name).chain(&sub.aliases) {
                let sub_name = sub_name.trim();
                if !seen.insert(sub_name.to_string()) {
                    return Err(BuildError::DuplicateSubcommand {
                        command: qualified.clone(),
                        name: sub_name.to_string(),
                    });
                }
            }
            let child = self.add_command(sub, Some(id))?;
            self.commands[id.0].subcommands.push(child);
        }

        Ok(id)
    }

    fn add_options(
        &mut self,
        cmd: CommandId,
        options: &[OptionDef],
        qualified: &str,
    ) -> Result<(), BuildError> {
        let mut seen: HashSet<String> = self
            .inherited_options(cmd)
            .flat_map(|a| a.names().iter().cloned().chain(a.negated_names()))
            .collect();

        for (declaration, opt) in options.iter().enumerate() {
            if opt.names.is_empty() {
                return Err(BuildError::MissingOptionName {
                    command: qualified.to_string(),
                });
            }
            let names: Vec<String> = opt.names.iter().map(|n| n.trim().to_string()).collect();
            if let Some(bad) = names.iter().find(|n| !is_valid_option_name(n)) {
                return Err(BuildError::InvalidOptionName {
                    command: qualified.to_string(),
                    name: bad.clone(),
                });
            }
            let display = names
                .iter()
                .max_by_key(|n| n.len())
                .cloned()
                .unwrap_or_default();

            let value_type = opt
                .value_type
                .clone()
                .unwrap_or(TypeDescriptor::Scalar(ScalarType::Bool));
            let arity = opt
                .arity
                .unwrap_or_else(|| default_option_arity(&value_type, opt.interactive.is_some()));
            if arity.is_inverted() {
                return Err(BuildError::InvertedRange {
                    command: qualified.to_string(),
                    arg: display,
                    range: arity,
                });
            }
            if !value_type.is_multi_value() && arity.max.is_none_or(|max| max > 1) {
                return Err(BuildError::ArityExceedsType {
                    command: qualified.to_string(),
                    arg: display,
                    arity,
                });
            }
            if opt.negatable
                && (!value_type.is_boolean() || !names.iter().any(|n| n.starts_with("--")))
            {
                return Err(BuildError::InvalidNegatable {
                    command: qualified.to_string(),
                    arg: display,
                });
            }

            let negated: Vec<String> = if opt.negatable {
                names.iter().filter_map(|n| negate_name(n)).collect()
            } else {
                Vec::new()
            };
            for name in names.iter().chain(&negated) {
                if !seen.insert(name.clone()) {
                    return Err(BuildError::DuplicateOption {
                        command: qualified.to_string(),
                        name: name.clone(),
                    });
                }
            }

            let split = compile_split(opt.split.as_deref(), &display)?;
            let label = opt.param_label.clone().unwrap_or_else(|| {
                format!("<{}>", display.trim_start_matches(['-', '+']))
            });

            let id = ArgId(self.args.len());
            self.args.push(ArgSpec {
                id,
                command: cmd,
                kind: ArgKind::Option {
                    names,
                    negatable: opt.negatable,
                    usage_help: opt.usage_help,
                    version_help: opt.version_help,
                },
                label,
                description: opt.description.clone(),
                arity,
                value_type,
                required: opt.required,
                default_value: opt.default_value.clone(),
                split,
                interactive: opt.interactive.clone(),
                scope: opt.scope,
                hidden: opt.hidden,
                completion_candidates: opt.completion_candidates.clone(),
                group: None,
                order: opt.order,
                declaration,
            });
            self.commands[cmd.0].options.push(id);
        }
        Ok(())
    }

    fn add_positionals(
        &mut self,
        cmd: CommandId,
        positionals: &[PositionalDef],
        qualified: &str,
    ) -> Result<(), BuildError> {
        let mut labels: HashSet<String> = HashSet::new();
        let mut cursor = 0usize;
        let mut open_label: Option<String> = None;
        let mut built: Vec<ArgId> = Vec::new();

        for (declaration, pos) in positionals.iter().enumerate() {
            let label = pos.label.trim().to_string();
            if label.is_empty() || !labels.insert(label.clone()) {
                return Err(BuildError::DuplicatePositional {
                    command: qualified.to_string(),
                    label: if label.is_empty() {
                        "<empty>".to_string()
                    } else {
                        label
                    },
                });
            }

            if let Some(range) = pos.index.into_iter().chain(pos.arity).find(Arity::is_inverted) {
                return Err(BuildError::InvertedRange {
                    command: qualified.to_string(),
                    arg: label,
                    range,
                });
            }

            let required = pos.required || pos.arity.is_some_and(|a| a.min > 0);
            let multi = pos.value_type.is_multi_value();
            let index = match pos.index {
                Some(index) => index,
                None => {
                    if let Some(open) = &open_label {
                        return Err(BuildError::UnboundedPositionalNotLast {
                            command: qualified.to_string(),
                            label: open.clone(),
                        });
                    }
                    let span = if multi {
                        pos.arity.and_then(|a| a.max)
                    } else {
                        Some(1)
                    };
                    match span {
                        Some(0) => {
                            return Err(BuildError::ArityExceedsType {
                                command: qualified.to_string(),
                                arg: label,
                                arity: pos.arity.unwrap_or(Arity::ZERO),
                            });
                        }
                        Some(span) => Arity::range(cursor, cursor + span - 1),
                        None => Arity::at_least(cursor),
                    }
                }
            };
            match index.max {
                Some(max) => cursor = cursor.max(max + 1),
                None => open_label = Some(label.clone()),
            }

            let arity = pos.arity.unwrap_or(Arity {
                min: usize::from(required),
                max: index.width(),
            });
            if !multi && (index.width() != Some(1) || arity.max.is_none_or(|max| max > 1)) {
                return Err(BuildError::ArityExceedsType {
                    command: qualified.to_string(),
                    arg: label,
                    arity: index,
                });
            }

            let split = compile_split(pos.split.as_deref(), &label)?;
            let id = ArgId(self.args.len());
            self.args.push(ArgSpec {
                id,
                command: cmd,
                kind: ArgKind::Positional { index },
                label,
                description: pos.description.clone(),
                arity,
                value_type: pos.value_type.clone(),
                required,
                default_value: pos.default_value.clone(),
                split,
                interactive: pos.interactive.clone(),
                scope: Scope::Local,
                hidden: pos.hidden,
                completion_candidates: pos.completion_candidates.clone(),
                group: None,
                order: None,
                declaration,
            });
            built.push(id);
        }

        built.sort_by_key(|id| self.arg(*id).index().map(|range| range.min));
        let mut expected = 0usize;
        let mut previous: Option<&ArgSpec> = None;
        for id in &built {
            let arg = self.arg(*id);
            let Some(range) = arg.index() else {
                continue;
            };
            if let Some(prev) = previous {
                if prev.index().is_some_and(|r| r.is_unbounded()) {
                    return Err(BuildError::UnboundedPositionalNotLast {
                        command: qualified.to_string(),
                        label: prev.label.clone(),
                    });
                }
                if range.min < expected {
                    return Err(BuildError::PositionalIndexConflict {
                        command: qualified.to_string(),
                        first: prev.label.clone(),
                        second: arg.label.clone(),
                    });
                }
            }
            if range.min > expected {
                return Err(BuildError::PositionalIndexGap {
                    command: qualified.to_string(),
                    index: expected,
                });
            }
            expected = range.max.map_or(usize::MAX, |max| max + 1);
            previous = Some(arg);
        }

        self.commands[cmd.0].positionals = built;
        Ok(())
    }

    fn add_groups(
        &mut self,
        cmd: CommandId,
        groups: &[GroupDef],
        qualified: &str,
    ) -> Result<(), BuildError> {
        let base = self.groups.len();
        let mut by_name: HashMap<&str, GroupId> = HashMap::new();
        for (offset, def) in groups.iter().enumerate() {
            let id = GroupId(base + offset);
            if by_name.insert(def.name.as_str(), id).is_some() {
                return Err(BuildError::DuplicateGroup {
                    command: qualified.to_string(),
                    group: def.name.clone(),
                });
            }
            if def.args.is_empty() && def.groups.is_empty() {
                return Err(BuildError::EmptyGroup {
                    command: qualified.to_string(),
                    group: def.name.clone(),
                });
            }
            if def.multiplicity.max == Some(0) || def.multiplicity.is_inverted() {
                return Err(BuildError::InvalidMultiplicity {
                    group: def.name.clone(),
                    multiplicity: def.multiplicity,
                });
            }
            self.groups.push(ArgGroupSpec {
                id,
                name: def.name.clone(),
                command: cmd,
                heading: def.heading.clone(),
                exclusive: def.exclusive,
                multiplicity: def.multiplicity,
                children: Vec::new(),
                parent: None,
            });
            self.commands[cmd.0].groups.push(id);
        }

        for (offset, def) in groups.iter().enumerate() {
            let id = GroupId(base + offset);
            for member in &def.args {
                let arg = self
                    .resolve_member(cmd, member)
                    .ok_or_else(|| BuildError::UnknownGroupMember {
                        group: def.name.clone(),
                        member: member.clone(),
                    })?;
                if self.args[arg.0].group.is_some() {
                    return Err(BuildError::MemberInMultipleGroups {
                        member: member.clone(),
                    });
                }
                self.args[arg.0].group = Some(id);
                self.groups[id.0].children.push(GroupMember::Arg(arg));
            }
            for member in &def.groups {
                let sub = *by_name
                    .get(member.as_str())
                    .ok_or_else(|| BuildError::UnknownGroup {
                        group: def.name.clone(),
                        member: member.clone(),
                    })?;
                if self.groups[sub.0].parent.is_some() {
                    return Err(BuildError::MemberInMultipleGroups {
                        member: format!("group '{member}'"),
                    });
                }
                self.groups[sub.0].parent = Some(id);
                self.groups[id.0].children.push(GroupMember::Group(sub));
            }
        }

        let mut visiting = HashSet::new();
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        for offset in 0..groups.len() {
            self.visit_group(
                GroupId(base + offset),
                &mut visiting,
                &mut visited,
                &mut path,
            )?;
        }
        Ok(())
    }

    fn resolve_member(&self, cmd: CommandId, member: &str) -> Option<ArgId> {
        let member = member.trim();
        self.options(cmd)
            .find(|a| a.names().iter().any(|n| n == member))
            .or_else(|| self.positionals(cmd).find(|a| a.label == member))
            .map(|a| a.id)
    }

    fn visit_group(
        &self,
        id: GroupId,
        visiting: &mut HashSet<GroupId>,
        visited: &mut HashSet<GroupId>,
        path: &mut Vec<GroupId>,
    ) -> Result<(), BuildError> {
        if visited.contains(&id) {
            return Ok(());
        }
        path.push(id);
        if !visiting.insert(id) {
            let cycle = path
                .iter()
                .map(|g| self.group(*g).name.as_str())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(BuildError::GroupCycle(cycle));
        }

        for member in &self.group(id).children {
            if let GroupMember::Group(sub) = member {
                self.visit_group(*sub, visiting, visited, path)?;
            }
        }

        path.pop();
        visiting.remove(&id);
        visited.insert(id);
        Ok(())
    }
}

pub(crate) fn build(def: &CommandDef) -> Result<CommandGraph, BuildError> {
    let mut graph = CommandGraph::default();
    graph.add_command(def, None)?;
    Ok(graph)
}

fn is_valid_option_name(name: &str) -> bool {
    let shaped = if name.starts_with("--") {
        name.len() >= 3
    } else {
        name.starts_with('-') && name.len() >= 2
    };
    shaped && !name.contains('=') && !name.chars().any(char::is_whitespace)
}

fn default_option_arity(value_type: &TypeDescriptor, interactive: bool) -> Arity {
    if value_type.is_boolean() {
        Arity::ZERO
    } else if interactive {
        Arity::range(0, 1)
    } else {
        Arity::exactly(1)
    }
}

fn compile_split(pattern: Option<&str>, arg: &str) -> Result<Option<Regex>, BuildError> {
    pattern
        .map(|p| {
            Regex::new(p).map_err(|e| BuildError::InvalidSplitPattern {
                arg: arg.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string() -> TypeDescriptor {
        TypeDescriptor::Scalar(ScalarType::String)
    }

    #[test]
    fn test_graph_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CommandGraph>();
    }

    #[test]
    fn test_build_rejects_duplicate_option_names() {
        let def = CommandDef::new("tool")
            .with_option(OptionDef::flag(&["-v", "--verbose"]))
            .with_option(OptionDef::flag(&["-v", "--version"]));

        assert_eq!(
            def.build().unwrap_err(),
            BuildError::DuplicateOption {
                command: "tool".into(),
                name: "-v".into()
            }
        );
    }

    #[test]
    fn test_build_rejects_collision_with_inherited_option() {
        let def = CommandDef::new("git")
            .with_option(OptionDef::flag(&["-q", "--quiet"]).inherited())
            .with_subcommand(CommandDef::new("push").with_option(OptionDef::flag(&["-q"])));

        assert_eq!(
            def.build().unwrap_err(),
            BuildError::DuplicateOption {
                command: "git push".into(),
                name: "-q".into()
            }
        );
    }

    #[test]
    fn test_local_option_names_may_repeat_in_subcommands() {
        let def = CommandDef::new("git")
            .with_option(OptionDef::flag(&["-q"]))
            .with_subcommand(CommandDef::new("push").with_option(OptionDef::flag(&["-q"])));
        assert!(def.build().is_ok());
    }

    #[test]
    fn test_build_rejects_negated_name_collision() {
        let def = CommandDef::new("tool")
            .with_option(OptionDef::flag(&["--color"]).negatable())
            .with_option(OptionDef::flag(&["--no-color"]));
        assert!(matches!(
            def.build(),
            Err(BuildError::DuplicateOption { name, .. }) if name == "--no-color"
        ));
    }

    #[test]
    fn test_build_rejects_bad_option_names() {
        for bad in ["v", "--", "--a=b", "-a b"] {
            let def = CommandDef::new("tool").with_option(OptionDef::flag(&[bad]));
            assert!(
                matches!(def.build(), Err(BuildError::InvalidOptionName { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_build_rejects_scalar_with_multi_arity() {
        let def = CommandDef::new("tool")
            .with_option(OptionDef::with_value(&["-n"], string()).with_arity(Arity::exactly(2)));
        assert!(matches!(def.build(), Err(BuildError::ArityExceedsType { .. })));
    }

    #[test]
    fn test_build_rejects_non_boolean_negatable() {
        let def = CommandDef::new("tool")
            .with_option(OptionDef::with_value(&["--level"], string()).negatable());
        assert!(matches!(def.build(), Err(BuildError::InvalidNegatable { .. })));
    }

    #[test]
    fn test_build_rejects_inverted_ranges() {
        let def = CommandDef::new("tool").with_option(
            OptionDef::with_value(&["--pair"], TypeDescriptor::Collection(ScalarType::Integer))
                .with_arity(Arity::range(3, 1)),
        );
        assert!(matches!(
            def.build(),
            Err(BuildError::InvertedRange { ref arg, .. }) if arg == "--pair"
        ));

        let def = CommandDef::new("tool").with_positional(
            PositionalDef::optional("<src>", string()).at_index(Arity::range(2, 0)),
        );
        assert!(matches!(
            def.build(),
            Err(BuildError::InvertedRange { ref arg, .. }) if arg == "<src>"
        ));

        let def = CommandDef::new("tool")
            .with_option(OptionDef::flag(&["-x"]))
            .with_group(GroupDef::exclusive("mode").with_arg("-x").with_multiplicity(Arity::range(2, 1)));
        assert!(matches!(def.build(), Err(BuildError::InvalidMultiplicity { .. })));
    }

    #[test]
    fn test_build_rejects_bad_split_pattern() {
        let def = CommandDef::new("tool").with_option(
            OptionDef::with_value(&["-n"], TypeDescriptor::Collection(ScalarType::Integer))
                .with_split("("),
        );
        assert!(matches!(
            def.build(),
            Err(BuildError::InvalidSplitPattern { .. })
        ));
    }

    #[test]
    fn test_positionals_get_sequential_indices() {
        let def = CommandDef::new("cp")
            .with_positional(PositionalDef::required("<src>", string()))
            .with_positional(PositionalDef::optional(
                "<rest>",
                TypeDescriptor::Collection(ScalarType::Path),
            ));
        let graph = def.build().unwrap();
        let positionals: Vec<_> = graph.positionals(graph.root()).collect();

        assert_eq!(positionals[0].index(), Some(Arity::exactly(0)));
        assert_eq!(positionals[0].arity, Arity::exactly(1));
        assert_eq!(positionals[1].index(), Some(Arity::at_least(1)));
        assert_eq!(positionals[1].arity, Arity::at_least(0));
        assert_eq!(graph.positional_at(graph.root(), 7).unwrap().label, "<rest>");
    }

    #[test]
    fn test_build_rejects_overlapping_indices() {
        let def = CommandDef::new("cp")
            .with_positional(PositionalDef::required("<a>", string()).at_index(Arity::exactly(0)))
            .with_positional(PositionalDef::required("<b>", string()).at_index(Arity::exactly(0)));
        assert!(matches!(
            def.build(),
            Err(BuildError::PositionalIndexConflict { .. })
        ));
    }

    #[test]
    fn test_build_rejects_index_gap() {
        let def = CommandDef::new("cp")
            .with_positional(PositionalDef::required("<a>", string()).at_index(Arity::exactly(1)));
        assert_eq!(
            def.build().unwrap_err(),
            BuildError::PositionalIndexGap {
                command: "cp".into(),
                index: 0
            }
        );
    }

    #[test]
    fn test_build_rejects_positional_after_unbounded() {
        let def = CommandDef::new("cp")
            .with_positional(PositionalDef::optional(
                "<files>",
                TypeDescriptor::Collection(ScalarType::Path),
            ))
            .with_positional(PositionalDef::required("<dest>", string()));
        assert!(matches!(
            def.build(),
            Err(BuildError::UnboundedPositionalNotLast { label, .. }) if label == "<files>"
        ));
    }

    #[test]
    fn test_build_resolves_group_members() {
        let def = CommandDef::new("tool")
            .with_option(OptionDef::flag(&["-x"]))
            .with_option(OptionDef::flag(&["-y"]))
            .with_group(GroupDef::exclusive("mode").with_arg("-x").with_arg("-y"));
        let graph = def.build().unwrap();
        let group = graph.groups(graph.root()).next().unwrap();

        assert_eq!(group.children.len(), 2);
        assert_eq!(graph.group_label(group.id), "(-x | -y)");
        assert_eq!(graph.find_option(graph.root(), "-x").unwrap().group, Some(group.id));
    }

    #[test]
    fn test_build_rejects_unknown_group_member() {
        let def = CommandDef::new("tool")
            .with_option(OptionDef::flag(&["-x"]))
            .with_group(GroupDef::exclusive("mode").with_arg("-x").with_arg("-z"));
        assert_eq!(
            def.build().unwrap_err(),
            BuildError::UnknownGroupMember {
                group: "mode".into(),
                member: "-z".into()
            }
        );
    }

    #[test]
    fn test_build_rejects_member_in_two_groups() {
        let def = CommandDef::new("tool")
            .with_option(OptionDef::flag(&["-x"]))
            .with_group(GroupDef::exclusive("a").with_arg("-x"))
            .with_group(GroupDef::exclusive("b").with_arg("-x"));
        assert!(matches!(
            def.build(),
            Err(BuildError::MemberInMultipleGroups { .. })
        ));
    }

    #[test]
    fn test_build_rejects_group_cycle() {
        let def = CommandDef::new("tool")
            .with_option(OptionDef::flag(&["-x"]))
            .with_group(GroupDef::exclusive("a").with_arg("-x").with_group("b"))
            .with_group(GroupDef::co_occurring("b").with_group("a"));
        assert_eq!(
            def.build().unwrap_err(),
            BuildError::GroupCycle("a -> b -> a".into())
        );
    }

    #[test]
    fn test_build_rejects_duplicate_subcommand_alias() {
        let def = CommandDef::new("git")
            .with_subcommand(CommandDef::new("checkout").with_alias("co"))
            .with_subcommand(CommandDef::new("co"));
        assert!(matches!(
            def.build(),
            Err(BuildError::DuplicateSubcommand { name, .. }) if name == "co"
        ));
    }

    #[test]
    fn test_qualified_name_and_ancestors() {
        let def = CommandDef::new("git").with_subcommand(
            CommandDef::new("remote").with_subcommand(CommandDef::new("add")),
        );
        let graph = def.build().unwrap();
        let remote = graph.find_subcommand(graph.root(), "remote").unwrap();
        let add = graph.find_subcommand(remote, "add").unwrap();

        assert_eq!(graph.qualified_name(add), "git remote add");
        assert_eq!(graph.ancestors(add).collect::<Vec<_>>(), vec![remote, graph.root()]);
    }
}
