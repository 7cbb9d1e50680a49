//! Opaque scalar values carried by records.
//!
//! The engine never interprets values beyond the narrow surface here:
//! numeric-vs-string identity, equality, copying, and string rendering.
//! Join keys and group-by keys are built from the rendered text.

use serde::{Serialize, Serializer};
use std::fmt;

/// One field value.
///
/// Numbers are only inferred when they render back to exactly the input text,
/// so `0x1F`, `1.50`, or `+3` stay strings and round-trip unchanged.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Empty,
    String(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
}

impl Value {
    /// Classify raw input text.
    #[must_use]
    pub fn infer(text: &str) -> Self {
        if text.is_empty() {
            return Self::Empty;
        }
        if let Ok(i) = text.parse::<i64>()
            && i.to_string() == text
        {
            return Self::Int(i);
        }
        if let Ok(f) = text.parse::<f64>()
            && f.is_finite()
            && f.to_string() == text
        {
            return Self::Float(f);
        }
        Self::String(text.to_string())
    }

    /// Wrap text without inference.
    #[must_use]
    pub fn from_string(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::Empty
        } else {
            Self::String(text)
        }
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Numeric view, if any.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::String(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::infer(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::infer(&s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<serde_json::Value> for Value {
    /// Scalars map directly; nested arrays/objects are kept as compact JSON text.
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Empty,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::infer(&n.to_string())
                }
            }
            serde_json::Value::String(s) => Self::from_string(s),
            other => Self::String(other.to_string()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_str(""),
            Self::String(s) => serializer.serialize_str(s),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Boolean(b) => serializer.serialize_bool(*b),
        }
    }
}
