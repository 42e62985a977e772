//! Field values carried by rows.
//!
//! Raw log tokens start life as `Str`; commands that compute (stats,
//! timechart, functions) produce `Int`/`Float`. Timestamps are `Int` epoch
//! milliseconds.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value. Strings are parsed, so `"42"` from a raw
    /// record aggregates the same way as `Int(42)`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(_) | Value::Null => None,
        }
    }

    /// Integer view of the value, used for timestamps and limits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.is_finite() => Some(*f as i64),
            Value::Str(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a query literal: quoted text stays a string, otherwise try
    /// bool, integer, float, then fall back to a bare string.
    pub fn parse_literal(lit: &str) -> Value {
        let lit = lit.trim();
        if lit.len() >= 2 && lit.starts_with('"') && lit.ends_with('"') {
            return Value::Str(lit[1..lit.len() - 1].to_string());
        }
        if lit.eq_ignore_ascii_case("null") {
            return Value::Null;
        }
        if let Ok(b) = lit.parse::<bool>() {
            return Value::Bool(b);
        }
        if let Ok(i) = lit.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = lit.parse::<f64>() {
            return Value::Float(f);
        }
        Value::Str(lit.to_string())
    }

    /// Total order used by sort and comparisons.
    ///
    /// Nulls first; numbers (including numeric strings) compare numerically;
    /// everything else falls back to type rank, then natural order.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        use Value::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Null, _) => Ordering::Less,
            (_, Null) => Ordering::Greater,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Str(a), Str(b)) => match (a.parse::<f64>(), b.parse::<f64>()) {
                (Ok(x), Ok(y)) => float_cmp(x, y),
                _ => a.cmp(b),
            },
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(x), Some(y)) => float_cmp(x, y),
                _ => type_rank(self).cmp(&type_rank(other)),
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Str(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Rough in-memory footprint, used for buffer budgeting.
    pub fn approx_bytes(&self) -> usize {
        match self {
            Value::Str(s) => 24 + s.len(),
            _ => 16,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
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

fn float_cmp(x: f64, y: f64) -> Ordering {
    if x.is_nan() && y.is_nan() {
        Ordering::Equal
    } else if x.is_nan() {
        Ordering::Greater
    } else if y.is_nan() {
        Ordering::Less
    } else {
        x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 2,
        Value::Str(_) => 3,
    }
}
