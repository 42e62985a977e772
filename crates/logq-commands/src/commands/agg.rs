//! Aggregate functions shared by `stats` and `timechart`.

use std::cmp::Ordering;
use std::fmt;

use logq_core::value::Value;

use crate::error::{CommandError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunc {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "count" | "c" => AggFunc::Count,
            "sum" => AggFunc::Sum,
            "avg" | "mean" => AggFunc::Avg,
            "min" => AggFunc::Min,
            "max" => AggFunc::Max,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggFunc::Count => "count",
            AggFunc::Sum => "sum",
            AggFunc::Avg => "avg",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }
}

/// One aggregate column: `func(field) as alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggSpec {
    pub func: AggFunc,
    pub field: Option<String>,
    pub alias: String,
}

impl AggSpec {
    /// Only `count` may omit its field. Without an alias the column is named
    /// after the call, e.g. `sum(bytes)`.
    pub fn new(func: AggFunc, field: Option<String>, alias: Option<String>) -> Result<Self> {
        if field.is_none() && func != AggFunc::Count {
            return Err(CommandError::Exec(format!("{} needs a field", func.as_str())));
        }
        let alias = alias.unwrap_or_else(|| match &field {
            Some(f) => format!("{}({f})", func.as_str()),
            None => func.as_str().to_string(),
        });
        Ok(Self { func, field, alias })
    }

    pub fn count() -> Self {
        Self {
            func: AggFunc::Count,
            field: None,
            alias: "count".into(),
        }
    }

    pub(crate) fn accumulator(&self) -> Acc {
        match (self.func, &self.field) {
            (AggFunc::Count, None) => Acc::CountAll(0),
            (AggFunc::Count, Some(_)) => Acc::Count(0),
            (AggFunc::Sum, _) => Acc::Sum(NumSum::default()),
            (AggFunc::Avg, _) => Acc::Avg { sum: 0.0, n: 0 },
            (AggFunc::Min, _) => Acc::Extreme { keep: Ordering::Less, cur: None },
            (AggFunc::Max, _) => Acc::Extreme { keep: Ordering::Greater, cur: None },
        }
    }
}

impl fmt::Display for AggSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let call = match &self.field {
            Some(field) => format!("{}({field})", self.func.as_str()),
            None => self.func.as_str().to_string(),
        };
        if call == self.alias {
            f.write_str(&call)
        } else {
            write!(f, "{call} as {}", self.alias)
        }
    }
}

/// Running sum that stays integral until a fractional value (or an
/// overflow) shows up.
#[derive(Debug, Clone, Default)]
pub(crate) struct NumSum {
    int: i64,
    float: f64,
    fractional: bool,
    seen: bool,
}

impl NumSum {
    fn add(&mut self, v: &Value) {
        let (i, f) = match v {
            Value::Int(i) => (Some(*i), *i as f64),
            Value::Float(f) => (None, *f),
            Value::Str(s) => match s.trim().parse::<i64>() {
                Ok(i) => (Some(i), i as f64),
                Err(_) => match s.trim().parse::<f64>() {
                    Ok(f) => (None, f),
                    Err(_) => return,
                },
            },
            Value::Bool(_) | Value::Null => return,
        };
        self.seen = true;
        self.float += f;
        match i.and_then(|i| self.int.checked_add(i)) {
            Some(sum) if !self.fractional => self.int = sum,
            _ => self.fractional = true,
        }
    }

    fn finish(&self) -> Value {
        if !self.seen {
            Value::Null
        } else if self.fractional {
            Value::Float(self.float)
        } else {
            Value::Int(self.int)
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Acc {
    CountAll(u64),
    Count(u64),
    Sum(NumSum),
    Avg { sum: f64, n: u64 },
    /// `keep` is the ordering a new value must have against the current one
    /// to replace it.
    Extreme { keep: Ordering, cur: Option<Value> },
}

impl Acc {
    /// Feed one row's value of the aggregated field (`None` when absent).
    pub(crate) fn update(&mut self, v: Option<&Value>) {
        let v = v.filter(|v| !v.is_null());
        match self {
            Acc::CountAll(n) => *n += 1,
            Acc::Count(n) => {
                if v.is_some() {
                    *n += 1;
                }
            }
            Acc::Sum(sum) => {
                if let Some(v) = v {
                    sum.add(v);
                }
            }
            Acc::Avg { sum, n } => {
                if let Some(x) = v.and_then(Value::as_f64) {
                    *sum += x;
                    *n += 1;
                }
            }
            Acc::Extreme { keep, cur } => {
                if let Some(v) = v {
                    let replace = match cur.as_ref() {
                        None => true,
                        Some(c) => v.total_cmp(c) == *keep,
                    };
                    if replace {
                        *cur = Some(v.clone());
                    }
                }
            }
        }
    }

    pub(crate) fn finish(&self) -> Value {
        match self {
            Acc::CountAll(n) | Acc::Count(n) => Value::Int(*n as i64),
            Acc::Sum(sum) => sum.finish(),
            Acc::Avg { n: 0, .. } => Value::Null,
            Acc::Avg { sum, n } => Value::Float(*sum / *n as f64),
            Acc::Extreme { cur, .. } => cur.clone().unwrap_or(Value::Null),
        }
    }
}
