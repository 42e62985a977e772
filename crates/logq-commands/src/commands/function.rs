//! `function <fn>(<field>[, <arg>]...) as <alias>`: scalar functions.
//!
//! | fn | result |
//! |---|---|
//! | `lower(f)` / `upper(f)` / `trim(f)` | string |
//! | `length(f)` | character count |
//! | `abs(f)` | absolute value (int stays int) |
//! | `substr(f, start[, len])` | characters from 0-based `start` |
//! | `concat(f, x, ...)` | text of every argument joined |
//!
//! An absent input, or one of the wrong type, yields `null`.

use std::fmt;

use logq_core::row::Row;
use logq_core::value::Value;

use crate::command::{Command, CommandCore};
use crate::error::{CommandError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFn {
    Lower,
    Upper,
    Length,
    Trim,
    Abs,
    Substr,
    Concat,
}

impl ScalarFn {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "lower" => ScalarFn::Lower,
            "upper" => ScalarFn::Upper,
            "length" | "len" => ScalarFn::Length,
            "trim" => ScalarFn::Trim,
            "abs" => ScalarFn::Abs,
            "substr" => ScalarFn::Substr,
            "concat" => ScalarFn::Concat,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScalarFn::Lower => "lower",
            ScalarFn::Upper => "upper",
            ScalarFn::Length => "length",
            ScalarFn::Trim => "trim",
            ScalarFn::Abs => "abs",
            ScalarFn::Substr => "substr",
            ScalarFn::Concat => "concat",
        }
    }

    /// Allowed count of extra arguments after the field.
    pub fn arity(self) -> (usize, usize) {
        match self {
            ScalarFn::Substr => (1, 2),
            ScalarFn::Concat => (0, usize::MAX),
            _ => (0, 0),
        }
    }
}

impl fmt::Display for ScalarFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra function argument: a literal, or a reference to another field.
#[derive(Debug, Clone, PartialEq)]
pub enum FnArg {
    Literal(Value),
    Field(String),
}

pub struct Function {
    core: CommandCore,
    func: ScalarFn,
    field: String,
    args: Vec<FnArg>,
    alias: String,
}

impl Function {
    pub fn new(
        func: ScalarFn,
        field: impl Into<String>,
        args: Vec<FnArg>,
        alias: impl Into<String>,
    ) -> Result<Self> {
        let (min, max) = func.arity();
        if args.len() < min || args.len() > max {
            return Err(CommandError::Exec(format!(
                "{func} takes {min}..={max} extra arguments, got {}",
                args.len()
            )));
        }
        Ok(Self {
            core: CommandCore::new(),
            func,
            field: field.into(),
            args,
            alias: alias.into(),
        })
    }

    pub fn func(&self) -> ScalarFn {
        self.func
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    fn arg(&self, row: &mut Row, i: usize) -> Option<Value> {
        match self.args.get(i)? {
            FnArg::Literal(v) => Some(v.clone()),
            FnArg::Field(f) => self.core.resolve(row, f),
        }
    }

    fn eval(&self, row: &mut Row) -> Value {
        let input = self.core.resolve(row, &self.field);
        let out = match self.func {
            ScalarFn::Lower => text(input).map(|s| Value::Str(s.to_lowercase())),
            ScalarFn::Upper => text(input).map(|s| Value::Str(s.to_uppercase())),
            ScalarFn::Trim => text(input).map(|s| Value::str(s.trim())),
            ScalarFn::Length => text(input).map(|s| Value::Int(s.chars().count() as i64)),
            ScalarFn::Abs => input.and_then(|v| match v {
                Value::Int(i) => Some(Value::Int(i.saturating_abs())),
                other => other.as_f64().map(|f| Value::Float(f.abs())),
            }),
            ScalarFn::Substr => {
                let start = self.arg(row, 0).and_then(|v| v.as_i64()).unwrap_or(0).max(0) as usize;
                let len = self.arg(row, 1).and_then(|v| v.as_i64());
                text(input).map(|s| {
                    let chars = s.chars().skip(start);
                    let out: String = match len {
                        Some(n) => chars.take(n.max(0) as usize).collect(),
                        None => chars.collect(),
                    };
                    Value::Str(out)
                })
            }
            ScalarFn::Concat => {
                let mut out = match input {
                    Some(v) if !v.is_null() => v.to_string(),
                    _ => String::new(),
                };
                for i in 0..self.args.len() {
                    if let Some(v) = self.arg(row, i).filter(|v| !v.is_null()) {
                        out.push_str(&v.to_string());
                    }
                }
                Some(Value::Str(out))
            }
        };
        out.unwrap_or(Value::Null)
    }
}

fn text(v: Option<Value>) -> Option<String> {
    match v? {
        Value::Null => None,
        Value::Str(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl Command for Function {
    fn name(&self) -> &'static str {
        "function"
    }

    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CommandCore {
        &mut self.core
    }

    fn push(&mut self, mut row: Row) -> Result<()> {
        let v = self.eval(&mut row);
        row.insert(self.alias.clone(), v);
        self.core.write(row)
    }

    fn describe(&self) -> String {
        let mut args = vec![self.field.clone()];
        args.extend(self.args.iter().map(|a| match a {
            FnArg::Literal(Value::Str(s)) => format!("\"{s}\""),
            FnArg::Literal(v) => v.to_string(),
            FnArg::Field(f) => f.clone(),
        }));
        format!("function {}({}) as {}", self.func, args.join(", "), self.alias)
    }
}
