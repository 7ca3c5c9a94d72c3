//! Typed values produced by conversion.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

/// A converted argument value.
///
/// Scalars convert to one of the leaf variants; collections collect into
/// [`Value::List`] and maps into [`Value::Map`] with entries in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    Path(PathBuf),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Duration(#[serde(serialize_with = "serialize_duration")] Duration),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
}

fn serialize_duration<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_duration(d))
}

/// Formats a duration in the largest unit that divides it exactly.
///
/// ```
/// use std::time::Duration;
/// use argbind_core::format_duration;
///
/// assert_eq!(format_duration(&Duration::from_secs(120)), "2m");
/// assert_eq!(format_duration(&Duration::from_millis(1500)), "1500ms");
/// ```
pub fn format_duration(d: &Duration) -> String {
    let ms = d.as_millis();
    const UNITS: [(u128, &str); 4] = [(86_400_000, "d"), (3_600_000, "h"), (60_000, "m"), (1000, "s")];
    for (size, unit) in UNITS {
        if ms > 0 && ms % size == 0 {
            return format!("{}{unit}", ms / size);
        }
    }
    format!("{ms}ms")
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Looks up a map entry by its string key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.to_string() == key)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Char(c) => write!(f, "{c}"),
            Self::Str(s) => f.write_str(s),
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Self::Duration(d) => f.write_str(&format_duration(d)),
            Self::List(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Self::Map(entries) => {
                let entries: Vec<String> = entries.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", entries.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_of_containers() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(list.to_string(), "[1, 2]");

        let map = Value::Map(vec![(Value::Str("a".into()), Value::Int(1))]);
        assert_eq!(map.to_string(), "{a=1}");
        assert_eq!(map.get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_serializes_untagged() {
        let value = Value::List(vec![
            Value::Bool(true),
            Value::Str("x".into()),
            Value::Duration(Duration::from_secs(30)),
        ]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[true,"x","30s"]"#);
    }
}
