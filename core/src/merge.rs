//! Mixin merging.
//!
//! A mixin is a reusable [`CommandDef`] whose options, positionals, groups
//! and subcommands are appended to every command that lists it. Metadata from
//! a mixin only fills fields the command leaves empty. Members are not
//! deduplicated: a mixin option reusing a name the command already declares
//! is rejected by the build like any other duplicate.
//!
//! # Example
//!
//! ```
//! use argbind_core::*;
//!
//! let logging = CommandDef::new("logging")
//!     .with_option(OptionDef::flag(&["-v", "--verbose"]))
//!     .with_description("shared logging flags");
//!
//! let def = CommandDef::new("tool")
//!     .with_option(OptionDef::flag(&["-f", "--force"]))
//!     .with_mixin(logging);
//!
//! let merged = apply_mixins(&def);
//! assert_eq!(merged.options.len(), 2);
//! assert_eq!(merged.description.as_deref(), Some("shared logging flags"));
//! ```

use crate::types::CommandDef;

/// Returns a copy of `def` with all of its mixins (recursively) merged in.
///
/// The returned definition keeps the `mixins` list so the built command can
/// report which mixins it carries; the members have already been copied.
pub fn apply_mixins(def: &CommandDef) -> CommandDef {
    let mut merged = def.clone();
    for mixin in &def.mixins {
        let mixin = apply_mixins(mixin);
        merge_into(&mut merged, &mixin);
    }
    merged
}

fn merge_into(base: &mut CommandDef, mixin: &CommandDef) {
    if base.description.is_none() {
        base.description = mixin.description.clone();
    }
    if base.header.is_none() {
        base.header = mixin.header.clone();
    }
    if base.footer.is_none() {
        base.footer = mixin.footer.clone();
    }
    if base.version.is_empty() {
        base.version = mixin.version.clone();
    }

    base.options.extend(mixin.options.iter().cloned());
    base.positionals.extend(mixin.positionals.iter().cloned());
    base.groups.extend(mixin.groups.iter().cloned());
    base.subcommands.extend(mixin.subcommands.iter().cloned());
}
