//! Declarative command definitions.
//!
//! These types are the builder input of the command model. They are
//! plain data designed for serialization with [`serde`], so a command line
//! can be described in YAML or JSON as easily as in code. Calling
//! [`CommandDef::build`] validates the definition tree and produces an
//! immutable [`CommandGraph`](crate::CommandGraph).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Range of values an argument may consume per match.
///
/// Written as `"1"`, `"0..1"`, `"2..*"` or `"*"` (shorthand for `0..*`).
///
/// # Examples
///
/// ```
/// use argbind_core::Arity;
///
/// let arity: Arity = "1..*".parse().unwrap();
/// assert_eq!(arity.min, 1);
/// assert!(arity.is_unbounded());
/// assert_eq!(arity.to_string(), "1..*");
/// assert_eq!(Arity::exactly(1).to_string(), "1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Arity {
    /// Minimum number of values.
    pub min: usize,
    /// Maximum number of values, `None` when unbounded.
    pub max: Option<usize>,
}

/// Positional index ranges use the same notation as arities.
pub type IndexRange = Arity;

impl Arity {
    /// No values at all (boolean flags).
    pub const ZERO: Arity = Arity {
        min: 0,
        max: Some(0),
    };

    /// Exactly `n` values.
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    /// Between `min` and `max` values.
    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// At least `min` values, no upper bound.
    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    /// Returns `true` when there is no upper bound.
    pub fn is_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// Returns `true` when `n` lies within the range.
    pub fn contains(&self, n: usize) -> bool {
        n >= self.min && self.max.is_none_or(|max| n <= max)
    }

    /// Returns `true` when this range and `other` share at least one value.
    pub fn overlaps(&self, other: &Arity) -> bool {
        let self_max = self.max.unwrap_or(usize::MAX);
        let other_max = other.max.unwrap_or(usize::MAX);
        self.min <= other_max && other.min <= self_max
    }

    /// Returns `true` when the upper bound is below the lower one.
    pub fn is_inverted(&self) -> bool {
        self.max.is_some_and(|max| max < self.min)
    }

    /// Number of values covered by the range, `None` when unbounded.
    /// An inverted range covers nothing.
    pub fn width(&self) -> Option<usize> {
        self.max.map(|max| max.saturating_add(1).saturating_sub(self.min))
    }
}

impl FromStr for Arity {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BuildError::InvalidArity(s.to_string());
        let trimmed = s.trim();
        if trimmed == "*" {
            return Ok(Self::at_least(0));
        }

        let (min, max) = match trimmed.split_once("..") {
            Some((min, max)) => {
                let min = min.trim().parse::<usize>().map_err(|_| invalid())?;
                let max = match max.trim() {
                    "*" => None,
                    other => Some(other.parse::<usize>().map_err(|_| invalid())?),
                };
                (min, max)
            }
            None => {
                let n = trimmed.parse::<usize>().map_err(|_| invalid())?;
                (n, Some(n))
            }
        };

        let arity = Self { min, max };
        if arity.is_inverted() {
            return Err(invalid());
        }
        Ok(arity)
    }
}

impl TryFrom<String> for Arity {
    type Error = BuildError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Arity> for String {
    fn from(arity: Arity) -> Self {
        arity.to_string()
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{}..{max}", self.min),
            None => write!(f, "{}..*", self.min),
        }
    }
}

/// Element type of a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    /// `true` / `false`.
    Bool,
    /// Any string, unchanged.
    String,
    /// Signed 64-bit integer (decimal or `0x` hex).
    Integer,
    /// 64-bit float.
    Float,
    /// A single character.
    Char,
    /// Filesystem path.
    Path,
    /// Calendar date (`YYYY-MM-DD`).
    Date,
    /// Local date and time (`YYYY-MM-DDTHH:MM:SS`).
    DateTime,
    /// Duration such as `500ms`, `30s`, `5m`, `2h`.
    Duration,
    /// One of a fixed set of variants.
    Enum(Vec<String>),
    /// A user-registered type, resolved through the converter registry.
    Custom(String),
}

impl ScalarType {
    /// Type name with generic parameters and variant lists removed.
    ///
    /// ```
    /// use argbind_core::ScalarType;
    ///
    /// assert_eq!(ScalarType::Custom("pair<int, int>".into()).erased_name(), "pair");
    /// assert_eq!(ScalarType::Enum(vec!["a".into()]).erased_name(), "enum");
    /// assert_eq!(ScalarType::Integer.erased_name(), "integer");
    /// ```
    pub fn erased_name(&self) -> &str {
        match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Char => "char",
            Self::Path => "path",
            Self::Date => "date",
            Self::DateTime => "date_time",
            Self::Duration => "duration",
            Self::Enum(_) => "enum",
            Self::Custom(name) => name.split('<').next().unwrap_or(name).trim(),
        }
    }

    /// Variants of an enumeration type.
    pub fn variants(&self) -> &[String] {
        match self {
            Self::Enum(variants) => variants,
            _ => &[],
        }
    }
}

/// Shape and element type(s) of an argument's value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeDescriptor {
    /// A single value; repeated matches overwrite it.
    Scalar(ScalarType),
    /// An ordered list; every match appends.
    Collection(ScalarType),
    /// Ordered `key=value` entries.
    Map(ScalarType, ScalarType),
}

impl TypeDescriptor {
    /// Returns `true` for collections and maps.
    pub fn is_multi_value(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }

    /// Returns `true` for a scalar boolean.
    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Scalar(ScalarType::Bool))
    }

    /// The element type (the value type for maps).
    pub fn element(&self) -> &ScalarType {
        match self {
            Self::Scalar(t) | Self::Collection(t) | Self::Map(_, t) => t,
        }
    }
}

impl Default for TypeDescriptor {
    fn default() -> Self {
        Self::Scalar(ScalarType::String)
    }
}

/// Where an argument's value comes from when it is not matched.
///
/// The string form doubles as the serialized form: `${env:NAME}`,
/// `${env:NAME:-fallback}`, `${sys:NAME}`, `${sys:NAME:-fallback}` and
/// `${provider:NAME}` are deferred sources; any other string is a literal.
///
/// # Examples
///
/// ```
/// use argbind_core::DefaultSource;
///
/// assert_eq!(
///     DefaultSource::from("${env:HOME:-/tmp}"),
///     DefaultSource::Env { name: "HOME".into(), fallback: Some("/tmp".into()) },
/// );
/// assert_eq!(DefaultSource::from("42"), DefaultSource::Literal("42".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DefaultSource {
    /// A fixed string, converted like a command-line value.
    Literal(String),
    /// An environment variable read at parse time.
    Env {
        name: String,
        fallback: Option<String>,
    },
    /// A property from the caller-supplied property map.
    Property {
        name: String,
        fallback: Option<String>,
    },
    /// A named provider registered with the parser.
    Provider(String),
}

static DEFAULT_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{(env|sys|provider):([^:}]+)(?::-(.*))?\}$")
        .expect("static regex must compile")
});

impl From<&str> for DefaultSource {
    fn from(s: &str) -> Self {
        let Some(caps) = DEFAULT_EXPR.captures(s) else {
            return Self::Literal(s.to_string());
        };
        let name = caps[2].to_string();
        let fallback = caps.get(3).map(|m| m.as_str().to_string());
        match &caps[1] {
            "env" => Self::Env { name, fallback },
            "sys" => Self::Property { name, fallback },
            _ => Self::Provider(name),
        }
    }
}

impl From<String> for DefaultSource {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<DefaultSource> for String {
    fn from(source: DefaultSource) -> Self {
        source.to_string()
    }
}

impl fmt::Display for DefaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.write_str(value),
            Self::Env { name, fallback } => match fallback {
                Some(fallback) => write!(f, "${{env:{name}:-{fallback}}}"),
                None => write!(f, "${{env:{name}}}"),
            },
            Self::Property { name, fallback } => match fallback {
                Some(fallback) => write!(f, "${{sys:{name}:-{fallback}}}"),
                None => write!(f, "${{sys:{name}}}"),
            },
            Self::Provider(name) => write!(f, "${{provider:{name}}}"),
        }
    }
}

/// Visibility of an argument to descendant subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Matchable only in the declaring command.
    #[default]
    Local,
    /// Matchable in the declaring command and all its descendants.
    Inherit,
}

/// Interactive prompting for an argument's value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveDef {
    /// Prompt text; a default is derived from the argument name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Whether typed characters are echoed.
    #[serde(default)]
    pub echo: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Definition of a named option.
///
/// Use [`flag`](OptionDef::flag) for boolean switches and
/// [`with_value`](OptionDef::with_value) for options taking parameters, then
/// chain the builder methods.
///
/// # Examples
///
/// ```
/// use argbind_core::{OptionDef, ScalarType, TypeDescriptor};
///
/// let verbose = OptionDef::flag(&["-v", "--verbose"]).with_description("Be chatty");
/// assert!(verbose.matches("-v"));
///
/// let files = OptionDef::with_value(&["-f", "--file"], TypeDescriptor::Collection(ScalarType::Path))
///     .with_label("<file>")
///     .with_split(",");
/// assert_eq!(files.split.as_deref(), Some(","));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionDef {
    /// Option names including their prefix (e.g. `-v`, `--verbose`).
    pub names: Vec<String>,
    /// Label for the parameter in help text (e.g. `<file>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_label: Option<String>,
    /// Description shown in the option list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Values consumed per match; derived from the type when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arity: Option<Arity>,
    /// Value type; a boolean flag when absent.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<TypeDescriptor>,
    /// Whether the option must be given (relative to its group, if any).
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// Value used when the option is not matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultSource>,
    /// Regex splitting one raw value into several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
    /// Prompt for the value when matched without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive: Option<InteractiveDef>,
    /// Derive a `--no-` form.
    #[serde(default, skip_serializing_if = "is_false")]
    pub negatable: bool,
    /// Visibility to subcommands.
    #[serde(default)]
    pub scope: Scope,
    /// Omit from help and completion.
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    /// Values offered by completion.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub completion_candidates: Vec<String>,
    /// Explicit position in declaration-ordered help.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i32>,
    /// Requests usage help; constraint validation is skipped when matched.
    #[serde(default, skip_serializing_if = "is_false")]
    pub usage_help: bool,
    /// Requests version help; constraint validation is skipped when matched.
    #[serde(default, skip_serializing_if = "is_false")]
    pub version_help: bool,
}

impl OptionDef {
    /// Creates a boolean flag.
    pub fn flag(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Creates an option that takes a value of `value_type`.
    pub fn with_value(names: &[&str], value_type: TypeDescriptor) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            value_type: Some(value_type),
            ..Default::default()
        }
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Sets the parameter label.
    pub fn with_label(mut self, label: &str) -> Self {
        self.param_label = Some(label.to_string());
        self
    }

    /// Sets an explicit arity.
    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Marks the option as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default value source.
    pub fn with_default(mut self, source: impl Into<DefaultSource>) -> Self {
        self.default_value = Some(source.into());
        self
    }

    /// Sets the split regex.
    pub fn with_split(mut self, pattern: &str) -> Self {
        self.split = Some(pattern.to_string());
        self
    }

    /// Prompts for the value when it is matched without one.
    pub fn interactive(mut self, prompt: Option<&str>, echo: bool) -> Self {
        self.interactive = Some(InteractiveDef {
            prompt: prompt.map(String::from),
            echo,
        });
        self
    }

    /// Derives a negated `--no-` form.
    pub fn negatable(mut self) -> Self {
        self.negatable = true;
        self
    }

    /// Makes the option matchable in all descendant subcommands.
    pub fn inherited(mut self) -> Self {
        self.scope = Scope::Inherit;
        self
    }

    /// Hides the option from help and completion.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Sets completion candidates.
    pub fn with_candidates(mut self, candidates: &[&str]) -> Self {
        self.completion_candidates = candidates.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Sets the explicit help order.
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Marks the option as a usage-help request.
    pub fn usage_help(mut self) -> Self {
        self.usage_help = true;
        self
    }

    /// Marks the option as a version-help request.
    pub fn version_help(mut self) -> Self {
        self.version_help = true;
        self
    }

    /// Checks whether `name` is one of this option's names.
    pub fn matches(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// Definition of a positional parameter.
///
/// # Examples
///
/// ```
/// use argbind_core::{PositionalDef, ScalarType, TypeDescriptor};
///
/// let src = PositionalDef::required("<source>", TypeDescriptor::Scalar(ScalarType::Path));
/// assert!(src.required);
///
/// let rest = PositionalDef::optional("<file>", TypeDescriptor::Collection(ScalarType::Path));
/// assert!(!rest.required);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionalDef {
    /// Label used in help text and in group member references.
    pub label: String,
    /// Positions consumed; assigned sequentially when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexRange>,
    /// Values required/allowed; derived from the type when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arity: Option<Arity>,
    /// Value type.
    #[serde(rename = "type", default)]
    pub value_type: TypeDescriptor,
    /// Whether at least one value must be given.
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// Description shown in the parameter list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Value used when no token is matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DefaultSource>,
    /// Regex splitting one raw value into several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
    /// Prompt for the value when no token is matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive: Option<InteractiveDef>,
    /// Omit from help.
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
    /// Values offered by completion.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub completion_candidates: Vec<String>,
}

impl PositionalDef {
    /// Creates a required positional parameter.
    pub fn required(label: &str, value_type: TypeDescriptor) -> Self {
        Self {
            label: label.to_string(),
            value_type,
            required: true,
            ..Default::default()
        }
    }

    /// Creates an optional positional parameter.
    pub fn optional(label: &str, value_type: TypeDescriptor) -> Self {
        Self {
            label: label.to_string(),
            value_type,
            ..Default::default()
        }
    }

    /// Sets the index range.
    pub fn at_index(mut self, index: IndexRange) -> Self {
        self.index = Some(index);
        self
    }

    /// Sets an explicit arity.
    pub fn with_arity(mut self, arity: Arity) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Sets the default value source.
    pub fn with_default(mut self, source: impl Into<DefaultSource>) -> Self {
        self.default_value = Some(source.into());
        self
    }

    /// Sets the split regex.
    pub fn with_split(mut self, pattern: &str) -> Self {
        self.split = Some(pattern.to_string());
        self
    }

    /// Prompts for the value when no token is matched.
    pub fn interactive(mut self, prompt: Option<&str>, echo: bool) -> Self {
        self.interactive = Some(InteractiveDef {
            prompt: prompt.map(String::from),
            echo,
        });
        self
    }

    /// Sets completion candidates.
    pub fn with_candidates(mut self, candidates: &[&str]) -> Self {
        self.completion_candidates = candidates.iter().map(|c| c.to_string()).collect();
        self
    }
}

fn default_exclusive() -> bool {
    true
}

fn default_multiplicity() -> Arity {
    Arity::range(0, 1)
}

/// Definition of an argument group.
///
/// Members reference options by any of their names and positionals by their
/// label. Nested groups are referenced by group name and must be declared on
/// the same command.
///
/// # Examples
///
/// ```
/// use argbind_core::{Arity, GroupDef};
///
/// let mode = GroupDef::exclusive("mode").with_arg("-x").with_arg("-y");
/// assert!(mode.exclusive);
/// assert_eq!(mode.multiplicity, Arity::range(0, 1));
///
/// let creds = GroupDef::co_occurring("credentials").with_arg("--user").required();
/// assert_eq!(creds.multiplicity.min, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDef {
    /// Group name, unique within the command.
    pub name: String,
    /// Heading for the group's section in the help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    /// At most one member may be given.
    #[serde(default = "default_exclusive")]
    pub exclusive: bool,
    /// Range for the number of distinct members given. Repeating a member
    /// does not count again, and a present co-occurring group counts once.
    #[serde(default = "default_multiplicity")]
    pub multiplicity: Arity,
    /// Member arguments (option names or positional labels).
    #[serde(default)]
    pub args: Vec<String>,
    /// Nested groups by name.
    #[serde(default)]
    pub groups: Vec<String>,
}

impl GroupDef {
    /// Creates a mutually exclusive group with multiplicity `0..1`.
    pub fn exclusive(name: &str) -> Self {
        Self {
            name: name.to_string(),
            heading: None,
            exclusive: true,
            multiplicity: default_multiplicity(),
            args: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Creates a co-occurring (dependent) group with multiplicity `0..1`.
    pub fn co_occurring(name: &str) -> Self {
        Self {
            exclusive: false,
            ..Self::exclusive(name)
        }
    }

    /// Adds a member argument reference.
    pub fn with_arg(mut self, member: &str) -> Self {
        self.args.push(member.to_string());
        self
    }

    /// Adds a nested group reference.
    pub fn with_group(mut self, group: &str) -> Self {
        self.groups.push(group.to_string());
        self
    }

    /// Sets the multiplicity.
    pub fn with_multiplicity(mut self, multiplicity: Arity) -> Self {
        self.multiplicity = multiplicity;
        self
    }

    /// Sets the help heading.
    pub fn with_heading(mut self, heading: &str) -> Self {
        self.heading = Some(heading.to_string());
        self
    }

    /// Requires at least one occurrence.
    pub fn required(mut self) -> Self {
        self.multiplicity.min = self.multiplicity.min.max(1);
        if self.multiplicity.max.is_some_and(|max| max < 1) {
            self.multiplicity.max = Some(1);
        }
        self
    }
}

/// Definition of a command and, recursively, its subcommands.
///
/// # Examples
///
/// ```
/// use argbind_core::*;
///
/// let def = CommandDef::new("git")
///     .with_option(OptionDef::flag(&["-v", "--verbose"]).inherited())
///     .with_subcommand(
///         CommandDef::new("commit")
///             .with_option(OptionDef::with_value(&["-m", "--message"], TypeDescriptor::default())),
///     );
///
/// let graph = def.build().unwrap();
/// let commit = graph.find_subcommand(graph.root(), "commit").unwrap();
/// assert!(graph.find_option(commit, "--verbose").is_some());
/// assert!(graph.find_option(graph.root(), "--message").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandDef {
    /// Command name as typed on the command line.
    pub name: String,
    /// Alternative names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Version lines printed by version help.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub version: Vec<String>,
    /// Description shown under the synopsis and in parent command lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Text shown above the synopsis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// Text shown at the end of the help.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    /// Named options.
    #[serde(default)]
    pub options: Vec<OptionDef>,
    /// Positional parameters.
    #[serde(default)]
    pub positionals: Vec<PositionalDef>,
    /// Argument groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupDef>,
    /// Nested subcommands.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<CommandDef>,
    /// Definitions whose members are merged into this command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mixins: Vec<CommandDef>,
    /// Handle of the target that receives bound values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Omit from parent command lists.
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

impl CommandDef {
    /// Creates an empty command definition.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Adds an option.
    pub fn with_option(mut self, option: OptionDef) -> Self {
        self.options.push(option);
        self
    }

    /// Adds a positional parameter.
    pub fn with_positional(mut self, positional: PositionalDef) -> Self {
        self.positionals.push(positional);
        self
    }

    /// Adds an argument group.
    pub fn with_group(mut self, group: GroupDef) -> Self {
        self.groups.push(group);
        self
    }

    /// Adds a nested subcommand.
    pub fn with_subcommand(mut self, sub: CommandDef) -> Self {
        self.subcommands.push(sub);
        self
    }

    /// Adds a mixin.
    pub fn with_mixin(mut self, mixin: CommandDef) -> Self {
        self.mixins.push(mixin);
        self
    }

    /// Adds an alias.
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Adds a version line.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version.push(version.to_string());
        self
    }

    /// Sets the bound target handle.
    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// Validates the definition tree and builds the command graph.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] for the first structural problem found.
    pub fn build(&self) -> Result<crate::CommandGraph, BuildError> {
        crate::graph::build(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_parsing() {
        assert_eq!("0".parse::<Arity>().unwrap(), Arity::ZERO);
        assert_eq!("0..1".parse::<Arity>().unwrap(), Arity::range(0, 1));
        assert_eq!("2..*".parse::<Arity>().unwrap(), Arity::at_least(2));
        assert_eq!("*".parse::<Arity>().unwrap(), Arity::at_least(0));
        assert!("3..1".parse::<Arity>().is_err());
        assert!("x".parse::<Arity>().is_err());
    }

    #[test]
    fn test_arity_overlap_and_width() {
        assert!(Arity::range(0, 2).overlaps(&Arity::exactly(2)));
        assert!(!Arity::range(0, 1).overlaps(&Arity::at_least(2)));
        assert_eq!(Arity::range(1, 3).width(), Some(3));
        assert_eq!(Arity::at_least(1).width(), None);
        assert!(Arity::range(2, 0).is_inverted());
        assert_eq!(Arity::range(2, 0).width(), Some(0));
    }

    #[test]
    fn test_default_source_round_trip() {
        for text in ["plain", "${env:X}", "${env:X:-y}", "${sys:p}", "${provider:git}"] {
            assert_eq!(DefaultSource::from(text).to_string(), text);
        }
        assert_eq!(
            DefaultSource::from("${sys:user.name:-nobody}"),
            DefaultSource::Property {
                name: "user.name".into(),
                fallback: Some("nobody".into())
            }
        );
    }

    #[test]
    fn test_command_def_from_yaml() {
        let yaml = r#"
name: tool
options:
  - names: ["-n", "--count"]
    type: { scalar: integer }
    default_value: "${env:TOOL_COUNT:-3}"
  - names: ["--tag"]
    type: { collection: string }
    split: ","
positionals:
  - label: "<file>"
    type: { collection: path }
groups:
  - name: mode
    args: ["-n", "--tag"]
"#;
        let def: CommandDef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.options.len(), 2);
        assert_eq!(
            def.options[0].value_type,
            Some(TypeDescriptor::Scalar(ScalarType::Integer))
        );
        assert!(matches!(
            def.options[0].default_value,
            Some(DefaultSource::Env { .. })
        ));
        assert!(def.groups[0].exclusive);
        assert_eq!(def.groups[0].multiplicity, Arity::range(0, 1));
    }
}
