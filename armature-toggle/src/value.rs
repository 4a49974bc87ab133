//! Feature Values
//!
//! A feature resolves to a [`Variation`]. Whether the feature counts as
//! active is decided by the variation's truthiness, so a feature can be
//! active while carrying a non-boolean payload.

use serde::{Deserialize, Serialize};

/// Resolved feature payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Variation {
    #[default]
    Null,
    Boolean(bool),
    String(String),
    Number(f64),
    Json(serde_json::Value),
}

impl Variation {
    pub fn boolean(value: bool) -> Self {
        Self::Boolean(value)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn number(value: f64) -> Self {
        Self::Number(value)
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::Json(value)
    }

    /// Whether this payload makes a feature active.
    ///
    /// Only `null` and `false` are inactive; zero, empty strings and empty
    /// objects are all active.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null | Self::Boolean(false) => false,
            Self::Json(serde_json::Value::Null) | Self::Json(serde_json::Value::Bool(false)) => {
                false
            }
            _ => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            Self::Json(serde_json::Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Json(serde_json::Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Json(serde_json::Value::Null))
    }
}

impl From<bool> for Variation {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Variation {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Variation {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Variation {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Variation {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<serde_json::Value> for Variation {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::String(s) => Self::String(s),
            other => Self::Json(other),
        }
    }
}

impl<T: Into<Variation>> From<Option<T>> for Variation {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}
