//! Schemaless property values for nodes and edges.
//!
//! Properties are stored as a [`BTreeMap`] so that the serialized form of a
//! property bag is deterministic. This matters for two consumers: lexical
//! relevance scoring, which searches the serialized text, and the query cache,
//! whose keys are derived from serialized queries that may embed properties.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered key/value property bag attached to nodes, edges and patterns.
pub type Properties = BTreeMap<String, PropertyValue>;

/// A single property value.
///
/// Serialized untagged, so arbitrary JSON round-trips losslessly:
/// integers stay integers and floats stay floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// JSON `null`.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integral number.
    Integer(i64),
    /// Floating point number (also used for integers beyond `i64`).
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered list of values.
    List(Vec<PropertyValue>),
    /// Nested property map.
    Map(Properties),
}

impl PropertyValue {
    /// Returns the string slice if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric value for integers and floats.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns `true` for `null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Literal equality used by structured pattern matching.
    ///
    /// Integers and floats compare numerically (`1 == 1.0`). Lists and maps
    /// never match, even when structurally equal. Every other combination
    /// requires the same variant and an equal payload. Strings are never
    /// interpreted as patterns.
    #[must_use]
    pub fn literal_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(_) | Self::Float(_), Self::Integer(_) | Self::Float(_)) => {
                self.as_f64() == other.as_f64()
            },
            (Self::List(_) | Self::Map(_), _) | (_, Self::List(_) | Self::Map(_)) => false,
            _ => self == other,
        }
    }
}

impl fmt::Display for PropertyValue {
    /// Renders the value as plain text: strings without quotes, `null` as an
    /// empty string, lists and maps as compact JSON.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::List(_) | Self::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            },
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<Self>> for PropertyValue {
    fn from(value: Vec<Self>) -> Self {
        Self::List(value)
    }
}

impl From<Properties> for PropertyValue {
    fn from(value: Properties) -> Self {
        Self::Map(value)
    }
}
