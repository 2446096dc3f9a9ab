//! Values exchanged with the downstream engine.
//!
//! Helper functions receive already-evaluated arguments as [`Value`]s and
//! return one. The enum serializes as `{"type": ..., "value": ...}` so an
//! engine binding can marshal it without knowing Rust types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// List separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Separator {
    #[default]
    Space,
    Comma,
}

/// An evaluated stylesheet value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Null,
    Bool(bool),
    Number { value: f64, unit: String },
    String { text: String, quoted: bool },
    List { items: Vec<Value>, separator: Separator },
    /// Ordered key/value pairs.
    Map(Vec<(Value, Value)>),
    /// Hard failure; the engine aborts with this message.
    Error(String),
    /// Soft problem; the engine reports it and continues.
    Warning(String),
}

impl Value {
    pub fn number(value: f64, unit: impl Into<String>) -> Self {
        Value::Number {
            value,
            unit: unit.into(),
        }
    }

    /// Pixel length.
    pub fn px(value: i64) -> Self {
        Value::number(value as f64, "px")
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Value::String {
            text: text.into(),
            quoted: true,
        }
    }

    pub fn unquoted(text: impl Into<String>) -> Self {
        Value::String {
            text: text.into(),
            quoted: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(message.into())
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Value::Warning(message.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// A string, or a unitless number written as one (`139` for `"139"`).
    pub fn as_name(&self) -> Option<String> {
        match self {
            Value::String { text, .. } => Some(text.clone()),
            Value::Number { value, unit } if unit.is_empty() => Some(format_number(*value)),
            _ => None,
        }
    }

    /// Look up `key` in a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_name().as_deref() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number { value, unit } => write!(f, "{}{}", format_number(*value), unit),
            Value::String { text, quoted: true } => write!(f, "\"{}\"", text),
            Value::String { text, quoted: false } => f.write_str(text),
            Value::List { items, separator } => {
                let sep = match separator {
                    Separator::Space => " ",
                    Separator::Comma => ", ",
                };
                let parts: Vec<String> = items.iter().map(Value::to_string).collect();
                f.write_str(&parts.join(sep))
            }
            Value::Map(entries) => {
                let parts: Vec<String> = entries.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "({})", parts.join(", "))
            }
            Value::Error(message) | Value::Warning(message) => f.write_str(message),
        }
    }
}

/// Whole numbers print without a fraction.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
