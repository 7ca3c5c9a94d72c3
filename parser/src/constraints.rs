//! Group and required-argument validation.
//!
//! Runs once all tokens are consumed and collects every violation of every
//! command in the matched chain into one [`ConstraintError`].
//!
//! For a group `G`:
//!
//! - a child is *present* when it is a matched argument, or a subgroup with
//!   at least one present child;
//! - `kinds(G)` counts distinct present children. Repeating an argument
//!   never adds a kind. A co-occurring group's members together form one
//!   kind, so a present co-occurring group counts 1.
//!
//! An exclusive group with more than one present child yields a single
//! `MutuallyExclusive` violation. Otherwise a present group must have all
//! its required children (co-occurring groups only) and its kinds within
//! its multiplicity. An absent top-level group is only a violation
//! when its multiplicity requires it.

use argbind_core::{
    ArgGroupSpec, ArgSpec, CommandGraph, CommandId, ConstraintError, GroupMember, Violation,
};
use tracing::debug;

use crate::result::{ParseResult, ValueOrigin};

/// Validates `result` against the groups and required arguments of every
/// command in its chain.
///
/// # Errors
///
/// Returns every violation found, aggregated.
pub fn validate(graph: &CommandGraph, result: &ParseResult) -> Result<(), ConstraintError> {
    let mut violations = Vec::new();
    for cmd in result.commands() {
        Validator {
            graph,
            result,
            violations: &mut violations,
        }
        .command(*cmd);
    }

    if violations.is_empty() {
        Ok(())
    } else {
        debug!(count = violations.len(), "Constraint violations found");
        Err(ConstraintError { violations })
    }
}

struct Validator<'a> {
    graph: &'a CommandGraph,
    result: &'a ParseResult,
    violations: &'a mut Vec<Violation>,
}

impl Validator<'_> {
    fn command(&mut self, cmd: CommandId) {
        let graph = self.graph;
        for group in graph.root_groups(cmd) {
            self.group(group);
        }
        for arg in graph.options(cmd).chain(graph.positionals(cmd)) {
            if arg.group.is_none() && self.missing(arg) {
                self.violations.push(Violation::MissingRequired {
                    command: cmd,
                    arg: arg.id,
                    name: arg.display_name().to_string(),
                });
            }
        }
    }

    fn missing(&self, arg: &ArgSpec) -> bool {
        let given = self.result.raw_values(arg.id).len();
        if arg.is_positional() && given > 0 {
            return given < arg.arity.min;
        }
        if !arg.required || self.result.is_matched(arg.id) {
            return false;
        }
        !matches!(
            self.result.origin(arg.id),
            Some(ValueOrigin::Default | ValueOrigin::Prompt)
        )
    }

    fn group(&mut self, group: &ArgGroupSpec) {
        let graph = self.graph;
        let present: Vec<GroupMember> = group
            .children
            .iter()
            .copied()
            .filter(|m| self.present(*m))
            .collect();

        if present.is_empty() {
            if group.parent.is_none() && group.is_required() {
                self.violations.push(Violation::MissingGroup {
                    group: group.id,
                    label: graph.group_label(group.id),
                });
            }
            return;
        }

        if group.exclusive && present.len() > 1 {
            self.violations.push(Violation::MutuallyExclusive {
                group: group.id,
                members: present.iter().map(|m| self.label(*m)).collect(),
            });
        } else {
            if !group.exclusive {
                let missing: Vec<String> = group
                    .children
                    .iter()
                    .copied()
                    .filter(|m| !present.contains(m) && self.is_required(*m))
                    .map(|m| self.label(m))
                    .collect();
                if !missing.is_empty() {
                    self.violations.push(Violation::MissingInGroup {
                        group: group.id,
                        missing,
                    });
                }
            }
            let occurrences = kinds(group, present.len());
            if !group.multiplicity.contains(occurrences) {
                self.violations.push(Violation::GroupMultiplicity {
                    group: group.id,
                    label: graph.group_label(group.id),
                    occurrences,
                    multiplicity: group.multiplicity,
                });
            }
        }

        for member in present {
            if let GroupMember::Group(sub) = member {
                self.group(graph.group(sub));
            }
        }
    }

    fn present(&self, member: GroupMember) -> bool {
        match member {
            GroupMember::Arg(arg) => self.result.is_matched(arg),
            GroupMember::Group(sub) => self
                .graph
                .group(sub)
                .children
                .iter()
                .any(|m| self.present(*m)),
        }
    }

    fn is_required(&self, member: GroupMember) -> bool {
        match member {
            GroupMember::Arg(arg) => self.graph.arg(arg).required,
            GroupMember::Group(sub) => self.graph.group(sub).is_required(),
        }
    }

    fn label(&self, member: GroupMember) -> String {
        match member {
            GroupMember::Arg(arg) => self.graph.arg(arg).display_name().to_string(),
            GroupMember::Group(sub) => self.graph.group_label(sub),
        }
    }
}

/// Distinct kinds a present group contributes, given its present children.
fn kinds(group: &ArgGroupSpec, present: usize) -> usize {
    if group.exclusive {
        present
    } else {
        usize::from(present > 0)
    }
}
