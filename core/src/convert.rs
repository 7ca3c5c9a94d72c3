//! Value conversion registry.
//!
//! Every argument's element type is resolved to a [`Converter`] once, when a
//! parser is constructed. Lookup order:
//!
//! 1. a converter registered under the exact type name (`pair<int, int>`),
//! 2. a converter registered under the erased name (`pair`),
//! 3. the built-in converter for the type.
//!
//! Types with none of these fail with [`BuildError::NoConverter`], so a
//! missing converter surfaces before any token is parsed.
//!
//! # Examples
//!
//! ```
//! use argbind_core::*;
//!
//! let mut registry = ConverterRegistry::new();
//! registry.register_erased("upper", |raw: &str| Ok(Value::Str(raw.to_uppercase())));
//!
//! let graph = CommandDef::new("tool")
//!     .with_option(OptionDef::with_value(
//!         &["--name"],
//!         TypeDescriptor::Scalar(ScalarType::Custom("upper<ascii>".into())),
//!     ))
//!     .build()
//!     .unwrap();
//! let arg = graph.find_option(graph.root(), "--name").unwrap();
//!
//! let converter = registry.resolve(arg, true).unwrap();
//! assert_eq!(converter.convert("abc").unwrap(), Value::Str("ABC".into()));
//! ```

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

use crate::error::{BuildError, ConversionError};
use crate::graph::ArgSpec;
use crate::types::{ScalarType, TypeDescriptor};
use crate::value::Value;

/// Converts one raw string into a typed [`Value`].
pub trait Converter: Send + Sync {
    fn convert(&self, raw: &str) -> Result<Value, ConversionError>;
}

impl<F> Converter for F
where
    F: Fn(&str) -> Result<Value, ConversionError> + Send + Sync,
{
    fn convert(&self, raw: &str) -> Result<Value, ConversionError> {
        self(raw)
    }
}

/// Remaining command-line tokens, front first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgStack {
    tokens: VecDeque<String>,
}

impl ArgStack {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }

    pub fn peek(&self) -> Option<&str> {
        self.tokens.front().map(String::as_str)
    }

    pub fn pop(&mut self) -> Option<String> {
        self.tokens.pop_front()
    }

    /// Returns a token to the front of the stack.
    pub fn push(&mut self, token: String) {
        self.tokens.push_front(token);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.tokens.into()
    }
}

/// Custom token consumption for arguments of one type.
///
/// A consumer replaces arity-driven value collection: it pops whatever it
/// needs from the stack and returns the raw values, which are then split
/// and converted as usual.
pub trait TokenConsumer: Send + Sync {
    fn consume(&self, arg: &ArgSpec, stack: &mut ArgStack) -> Result<Vec<String>, ConversionError>;
}

impl<F> TokenConsumer for F
where
    F: Fn(&ArgSpec, &mut ArgStack) -> Result<Vec<String>, ConversionError> + Send + Sync,
{
    fn consume(&self, arg: &ArgSpec, stack: &mut ArgStack) -> Result<Vec<String>, ConversionError> {
        self(arg, stack)
    }
}

/// Failure of a built-in converter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("expected {0}")]
    Expected(String),
    #[error("expected one of: {}", .0.join(", "))]
    NotAVariant(Vec<String>),
    #[error("expected key=value")]
    MissingSeparator,
}

/// Converters resolved for one argument.
#[derive(Clone)]
pub struct ArgConverter {
    key: Option<Arc<dyn Converter>>,
    value: Arc<dyn Converter>,
}

impl fmt::Debug for ArgConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgConverter")
            .field("map", &self.key.is_some())
            .finish_non_exhaustive()
    }
}

impl ArgConverter {
    /// Converts one raw element (a map entry for map types).
    pub fn convert(&self, raw: &str) -> Result<Value, ConversionError> {
        match &self.key {
            Some(key) => {
                let (k, v) = raw.split_once('=').ok_or(ValueError::MissingSeparator)?;
                Ok(Value::Map(vec![(key.convert(k)?, self.value.convert(v)?)]))
            }
            None => self.value.convert(raw),
        }
    }

    /// Whether elements are `key=value` map entries.
    pub fn is_map(&self) -> bool {
        self.key.is_some()
    }
}

/// Registry of user converters and token consumers.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    exact: HashMap<String, Arc<dyn Converter>>,
    erased: HashMap<String, Arc<dyn Converter>>,
    consumers: HashMap<String, Arc<dyn TokenConsumer>>,
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("exact", &self.exact.keys().collect::<Vec<_>>())
            .field("erased", &self.erased.keys().collect::<Vec<_>>())
            .field("consumers", &self.consumers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a converter for the exact type name, generics included.
    pub fn register<F>(&mut self, type_name: &str, converter: F) -> &mut Self
    where
        F: Fn(&str) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        self.exact
            .insert(type_name.trim().to_string(), Arc::new(converter));
        self
    }

    /// Registers a converter for every type with the given erased name.
    pub fn register_erased<F>(&mut self, type_name: &str, converter: F) -> &mut Self
    where
        F: Fn(&str) -> Result<Value, ConversionError> + Send + Sync + 'static,
    {
        self.erased
            .insert(type_name.trim().to_string(), Arc::new(converter));
        self
    }

    /// Registers a token consumer for arguments whose element type has the
    /// given exact or erased name.
    pub fn register_consumer<F>(&mut self, type_name: &str, consumer: F) -> &mut Self
    where
        F: Fn(&ArgSpec, &mut ArgStack) -> Result<Vec<String>, ConversionError>
            + Send
            + Sync
            + 'static,
    {
        self.consumers
            .insert(type_name.trim().to_string(), Arc::new(consumer));
        self
    }

    /// The token consumer registered for `arg`, if any.
    pub fn consumer(&self, arg: &ArgSpec) -> Option<Arc<dyn TokenConsumer>> {
        let element = arg.value_type.element();
        self.consumers
            .get(type_name(element))
            .or_else(|| self.consumers.get(element.erased_name()))
            .cloned()
    }

    /// Resolves the converter(s) for `arg`'s type.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::NoConverter`] when neither a registered nor a
    /// built-in converter exists.
    pub fn resolve(
        &self,
        arg: &ArgSpec,
        case_insensitive_enums: bool,
    ) -> Result<ArgConverter, BuildError> {
        let lookup = |t: &ScalarType| {
            self.lookup(t, case_insensitive_enums)
                .ok_or_else(|| BuildError::NoConverter {
                    arg: arg.display_name().to_string(),
                    type_name: type_name(t).to_string(),
                })
        };
        match &arg.value_type {
            TypeDescriptor::Scalar(t) | TypeDescriptor::Collection(t) => Ok(ArgConverter {
                key: None,
                value: lookup(t)?,
            }),
            TypeDescriptor::Map(k, v) => Ok(ArgConverter {
                key: Some(lookup(k)?),
                value: lookup(v)?,
            }),
        }
    }

    fn lookup(&self, t: &ScalarType, case_insensitive_enums: bool) -> Option<Arc<dyn Converter>> {
        self.exact
            .get(type_name(t))
            .or_else(|| self.erased.get(t.erased_name()))
            .cloned()
            .or_else(|| builtin(t, case_insensitive_enums))
    }
}

fn type_name(t: &ScalarType) -> &str {
    match t {
        ScalarType::Custom(name) => name.trim(),
        other => other.erased_name(),
    }
}

fn builtin(t: &ScalarType, case_insensitive_enums: bool) -> Option<Arc<dyn Converter>> {
    let converter: Arc<dyn Converter> = match t {
        ScalarType::Bool => Arc::new(convert_bool),
        ScalarType::String => Arc::new(convert_string),
        ScalarType::Integer => Arc::new(convert_integer),
        ScalarType::Float => Arc::new(convert_float),
        ScalarType::Char => Arc::new(convert_char),
        ScalarType::Path => Arc::new(convert_path),
        ScalarType::Date => Arc::new(convert_date),
        ScalarType::DateTime => Arc::new(convert_date_time),
        ScalarType::Duration => Arc::new(convert_duration),
        ScalarType::Enum(variants) => {
            let variants = variants.clone();
            Arc::new(move |raw: &str| convert_enum(raw, &variants, case_insensitive_enums))
        }
        ScalarType::Custom(_) => return None,
    };
    Some(converter)
}

fn convert_bool(raw: &str) -> Result<Value, ConversionError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => Err(ValueError::Expected("'true' or 'false'".into()).into()),
    }
}

fn convert_string(raw: &str) -> Result<Value, ConversionError> {
    Ok(Value::Str(raw.to_string()))
}

fn convert_path(raw: &str) -> Result<Value, ConversionError> {
    Ok(Value::Path(PathBuf::from(raw)))
}

fn convert_float(raw: &str) -> Result<Value, ConversionError> {
    raw.trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| ValueError::Expected("a number".into()).into())
}

fn convert_date(raw: &str) -> Result<Value, ConversionError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map(Value::Date)
        .map_err(|_| ValueError::Expected("a date (YYYY-MM-DD)".into()).into())
}

fn convert_integer(raw: &str) -> Result<Value, ConversionError> {
    let invalid = || -> ConversionError { ValueError::Expected("an integer".into()).into() };
    let trimmed = raw.trim();
    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (radix, digits) = match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Some(hex) => (16, hex),
        None => (10, unsigned),
    };
    // one sign only, and never between the radix prefix and the digits
    if digits.starts_with(['+', '-']) {
        return Err(invalid());
    }
    i64::from_str_radix(&format!("{sign}{digits}"), radix)
        .map(Value::Int)
        .map_err(|_| invalid())
}

fn convert_char(raw: &str) -> Result<Value, ConversionError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Char(c)),
        _ => Err(ValueError::Expected("a single character".into()).into()),
    }
}

fn convert_date_time(raw: &str) -> Result<Value, ConversionError> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S"))
        .map(Value::DateTime)
        .map_err(|_| ValueError::Expected("a date-time (YYYY-MM-DDTHH:MM:SS)".into()).into())
}

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(ms|s|m|h|d)$").expect("static regex must compile")
});

fn convert_duration(raw: &str) -> Result<Value, ConversionError> {
    let invalid = || ValueError::Expected("a duration such as 500ms, 30s, 5m, 2h or 1d".into());
    let caps = DURATION.captures(raw.trim()).ok_or_else(invalid)?;
    let amount: u64 = caps[1].parse().map_err(|_| invalid())?;
    let seconds = |factor: u64| amount.checked_mul(factor).map(Duration::from_secs);
    let duration = match &caps[2] {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => seconds(1),
        "m" => seconds(60),
        "h" => seconds(3600),
        _ => seconds(86_400),
    };
    duration.map(Value::Duration).ok_or_else(|| invalid().into())
}

fn convert_enum(
    raw: &str,
    variants: &[String],
    case_insensitive: bool,
) -> Result<Value, ConversionError> {
    variants
        .iter()
        .find(|v| v.as_str() == raw)
        .or_else(|| {
            case_insensitive
                .then(|| variants.iter().find(|v| v.eq_ignore_ascii_case(raw)))
                .flatten()
        })
        .map(|v| Value::Str(v.clone()))
        .ok_or_else(|| ValueError::NotAVariant(variants.to_vec()).into())
}
