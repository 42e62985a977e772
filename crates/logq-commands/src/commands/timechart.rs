//! `timechart span=<N><s|m|h|d> agg[, agg]... [by f]` (reducer).
//!
//! Rows are bucketed on the inherited date column (epoch milliseconds,
//! floored to the span). One row per bucket is emitted in ascending time
//! order, with one column per aggregate, or per `by` value when grouping:
//! the column is the `by` value itself for a single aggregate and
//! `alias:value` for several. Buckets that never saw a `by` value get the
//! aggregate's empty result (`0` for counts, `null` otherwise).

use std::collections::{BTreeMap, HashMap};

use logq_core::row::Row;
use logq_core::value::Value;

use crate::command::{Command, CommandCore};
use crate::commands::agg::{Acc, AggSpec};
use crate::error::{CommandError, Result};

pub const DEFAULT_TIME_COLUMN: &str = "_time";

/// Parse `30s`, `5m`, `1h`, `1d` into milliseconds.
pub fn parse_span(text: &str) -> Result<i64> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    let n: i64 = digits
        .parse()
        .map_err(|_| CommandError::Exec(format!("invalid span '{text}'")))?;
    let unit_ms = match unit {
        "s" | "" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        _ => return Err(CommandError::Exec(format!("invalid span unit in '{text}'"))),
    };
    match n.checked_mul(unit_ms) {
        Some(ms) if ms > 0 => Ok(ms),
        _ => Err(CommandError::Exec(format!("span '{text}' must be positive"))),
    }
}

pub struct Timechart {
    core: CommandCore,
    span: String,
    span_ms: i64,
    aggs: Vec<AggSpec>,
    by: Option<String>,
    buckets: BTreeMap<i64, HashMap<String, Vec<Acc>>>,
    by_order: Vec<String>,
    skipped: u64,
}

impl Timechart {
    pub fn new(span: &str, aggs: Vec<AggSpec>, by: Option<String>) -> Result<Self> {
        let span_ms = parse_span(span)?;
        Ok(Self {
            core: CommandCore::new(),
            span: span.trim().to_string(),
            span_ms,
            aggs,
            by,
            buckets: BTreeMap::new(),
            by_order: Vec::new(),
            skipped: 0,
        })
    }

    pub fn span_ms(&self) -> i64 {
        self.span_ms
    }

    /// Rows dropped for lacking a usable timestamp.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn time_column(&self) -> String {
        self.core
            .date_column()
            .unwrap_or(DEFAULT_TIME_COLUMN)
            .to_string()
    }

    fn column_name(&self, spec: &AggSpec, by_value: &str) -> String {
        match (&self.by, self.aggs.len()) {
            (None, _) => spec.alias.clone(),
            (Some(_), 1) => by_value.to_string(),
            (Some(_), _) => format!("{}:{by_value}", spec.alias),
        }
    }
}

impl Command for Timechart {
    fn name(&self) -> &'static str {
        "timechart"
    }

    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CommandCore {
        &mut self.core
    }

    fn is_reducer(&self) -> bool {
        true
    }

    fn push(&mut self, mut row: Row) -> Result<()> {
        let ts = self
            .core
            .date_column()
            .and_then(|col| self.core.resolve(&mut row, col))
            .and_then(|v| v.as_i64());
        let Some(bucket) = ts.and_then(|ts| ts.checked_sub(ts.rem_euclid(self.span_ms))) else {
            self.skipped += 1;
            return Ok(());
        };

        let by_value = match &self.by {
            Some(f) => self
                .core
                .resolve(&mut row, f)
                .unwrap_or(Value::Null)
                .to_string(),
            None => String::new(),
        };
        if self.by.is_some() && !self.by_order.contains(&by_value) {
            self.by_order.push(by_value.clone());
        }

        let values: Vec<Option<Value>> = self
            .aggs
            .iter()
            .map(|a| a.field.as_ref().and_then(|f| self.core.resolve(&mut row, f)))
            .collect();
        let aggs = &self.aggs;
        let accs = self
            .buckets
            .entry(bucket)
            .or_default()
            .entry(by_value)
            .or_insert_with(|| aggs.iter().map(AggSpec::accumulator).collect());
        for (acc, v) in accs.iter_mut().zip(values.iter()) {
            acc.update(v.as_ref());
        }
        Ok(())
    }

    fn on_eof(&mut self) -> Result<()> {
        let time_col = self.time_column();
        let buckets = std::mem::take(&mut self.buckets);
        let by_values: Vec<String> = if self.by.is_some() {
            self.by_order.clone()
        } else {
            vec![String::new()]
        };
        tracing::debug!(buckets = buckets.len(), skipped = self.skipped, "timechart emit");

        for (bucket, cells) in buckets {
            if self.core.next_ended() {
                break;
            }
            let mut out = Row::new();
            out.insert(time_col.clone(), Value::Int(bucket));
            for by_value in &by_values {
                let accs = cells.get(by_value);
                for (i, spec) in self.aggs.iter().enumerate() {
                    let value = match accs {
                        Some(accs) => accs[i].finish(),
                        None => spec.accumulator().finish(),
                    };
                    out.insert(self.column_name(spec, by_value), value);
                }
            }
            self.core.write(out)?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let aggs: Vec<String> = self.aggs.iter().map(|a| a.to_string()).collect();
        let mut s = format!("timechart span={} {}", self.span, aggs.join(", "));
        if let Some(by) = &self.by {
            s.push_str(" by ");
            s.push_str(by);
        }
        s
    }
}
