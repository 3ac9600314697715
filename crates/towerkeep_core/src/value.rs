//! Custom property values attached to maps, layers, tilesets and objects

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// String-keyed custom properties, as authored in the map editor
pub type Properties = HashMap<String, Value>;

/// Generic property value (typed, as declared by the `type` attribute)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Nested class property
    Object(HashMap<String, Value>),
}

impl Value {
    /// Get value as string reference
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get value as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Numeric reading that also accepts numeric strings ("12", "3.5")
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::String(s) => s.trim().parse().ok(),
            other => other.as_float(),
        }
    }

    /// Whether the value counts as "set".
    ///
    /// Untyped properties arrive as strings, so `"false"` and `"0"` are
    /// treated as false rather than as non-empty text.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => {
                let s = s.trim();
                !s.is_empty() && !s.eq_ignore_ascii_case("false") && s != "0"
            }
            Value::Object(o) => !o.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Object(o) => {
                let mut keys: Vec<_> = o.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {}", o[key])?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Convenience conversions
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
