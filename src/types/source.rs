use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::query_result::scalar_text;

/// The rank the backend assigned to a retrieved source.
///
/// Backends disagree on the JSON type of `rank`, so integers, floats and
/// strings are all accepted.  Anything else is kept verbatim and treated as
/// unknown when rendered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Rank {
    /// An integral rank such as `1`.
    Integer(i64),
    /// A fractional rank such as `0.87`.
    Float(f64),
    /// A rank sent as text.
    Text(String),
    /// Any other JSON value.
    Other(serde_json::Value),
}

impl Rank {
    /// Reads a rank from any JSON value.  `null` is no rank.
    pub fn from_value(value: Value) -> Option<Rank> {
        match value {
            Value::Null => None,
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Some(Rank::Integer(i)),
                (None, Some(f)) => Some(Rank::Float(f)),
                (None, None) => Some(Rank::Other(Value::Number(n))),
            },
            Value::String(s) => Some(Rank::Text(s)),
            other => Some(Rank::Other(other)),
        }
    }

    /// Returns the display label for this rank, or `None` when it carries no
    /// usable value.
    ///
    /// Zero counts as no rank; the backend numbers sources from 1.
    pub fn label(&self) -> Option<String> {
        match self {
            Rank::Integer(0) => None,
            Rank::Integer(n) => Some(n.to_string()),
            Rank::Float(f) if f.is_finite() && *f != 0.0 => Some(f.to_string()),
            Rank::Float(_) => None,
            Rank::Text(s) if s.trim().is_empty() => None,
            Rank::Text(s) => Some(s.clone()),
            Rank::Other(_) => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => write!(f, "{label}"),
            None => write!(f, "?"),
        }
    }
}

/// A retrieved document excerpt supporting an answer, as sent by the backend.
///
/// Every field is optional on the wire.  A source that is not an object,
/// or a filename or excerpt that is not a scalar, reads as missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "Value")]
pub struct Source {
    /// Position of this source in the backend's ranking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<Rank>,

    /// Name of the document the excerpt was taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// The supporting passage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

impl From<Value> for Source {
    fn from(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Source::default();
        };
        Source {
            rank: fields.remove("rank").and_then(Rank::from_value),
            filename: fields.get("filename").and_then(scalar_text),
            excerpt: fields.get("excerpt").and_then(scalar_text),
        }
    }
}

impl Source {
    /// Creates a fully populated source.
    pub fn new(rank: i64, filename: impl Into<String>, excerpt: impl Into<String>) -> Self {
        Self {
            rank: Some(Rank::Integer(rank)),
            filename: Some(filename.into()),
            excerpt: Some(excerpt.into()),
        }
    }
}
