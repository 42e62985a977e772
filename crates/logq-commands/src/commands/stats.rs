//! `stats agg[, agg]... [by f1, f2]`: grouped aggregation (reducer).
//!
//! Groups are keyed by the text of their `by` values and emitted in the
//! order they were first seen. Without `by`, exactly one row is emitted,
//! even for empty input.

use std::collections::HashMap;

use logq_core::row::Row;
use logq_core::value::Value;
use logq_mem::Reservation;

use crate::command::{Command, CommandCore};
use crate::commands::agg::{Acc, AggSpec};
use crate::error::{CommandError, Result};

type GroupKey = Vec<Option<String>>;

struct Group {
    by_values: Vec<Option<Value>>,
    accs: Vec<Acc>,
}

pub struct Stats {
    core: CommandCore,
    aggs: Vec<AggSpec>,
    by: Vec<String>,
    index: HashMap<GroupKey, usize>,
    groups: Vec<Group>,
    reservation: Option<Reservation>,
}

impl Stats {
    pub fn new(aggs: Vec<AggSpec>, by: Vec<String>) -> Self {
        Self {
            core: CommandCore::new(),
            aggs,
            by,
            index: HashMap::new(),
            groups: Vec::new(),
            reservation: None,
        }
    }

    pub fn aggs(&self) -> &[AggSpec] {
        &self.aggs
    }

    pub fn by(&self) -> &[String] {
        &self.by
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn new_group(&mut self, by_values: Vec<Option<Value>>) -> Group {
        Group {
            by_values,
            accs: self.aggs.iter().map(AggSpec::accumulator).collect(),
        }
    }

    /// Account a new group against the query budget.
    fn reserve(&mut self, key: &GroupKey) -> Result<()> {
        let bytes = 64
            + 48 * self.aggs.len()
            + key.iter().map(|k| 24 + k.as_ref().map_or(0, String::len)).sum::<usize>();
        let budget = self.core.buffer_env().budget;
        let reservation = self
            .reservation
            .get_or_insert_with(|| budget.empty_reservation("stats"));
        if reservation.try_grow(bytes) {
            Ok(())
        } else {
            Err(CommandError::Spill(logq_mem::error::Error::BudgetExceeded {
                tag: "stats",
                requested: bytes,
                capacity: budget.capacity(),
                used: budget.used(),
            }))
        }
    }
}

impl Command for Stats {
    fn name(&self) -> &'static str {
        "stats"
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
        let by_values: Vec<Option<Value>> =
            self.by.iter().map(|f| self.core.resolve(&mut row, f)).collect();
        let key: GroupKey = by_values
            .iter()
            .map(|v| v.as_ref().filter(|v| !v.is_null()).map(Value::to_string))
            .collect();

        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.reserve(&key)?;
                let group = self.new_group(by_values);
                self.groups.push(group);
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };

        let values: Vec<Option<Value>> = self
            .aggs
            .iter()
            .map(|a| a.field.as_ref().and_then(|f| self.core.resolve(&mut row, f)))
            .collect();
        let group = &mut self.groups[slot];
        for (acc, v) in group.accs.iter_mut().zip(values.iter()) {
            acc.update(v.as_ref());
        }
        Ok(())
    }

    fn on_eof(&mut self) -> Result<()> {
        if self.by.is_empty() && self.groups.is_empty() {
            let group = self.new_group(Vec::new());
            self.groups.push(group);
        }
        tracing::debug!(groups = self.groups.len(), "stats emit");

        let groups = std::mem::take(&mut self.groups);
        self.index.clear();
        for group in groups {
            if self.core.next_ended() {
                break;
            }
            let mut out = Row::new();
            for (name, value) in self.by.iter().zip(group.by_values) {
                if let Some(v) = value {
                    out.insert(name.clone(), v);
                }
            }
            for (spec, acc) in self.aggs.iter().zip(group.accs.iter()) {
                out.insert(spec.alias.clone(), acc.finish());
            }
            self.core.write(out)?;
        }
        self.reservation = None;
        Ok(())
    }

    fn describe(&self) -> String {
        let aggs: Vec<String> = self.aggs.iter().map(|a| a.to_string()).collect();
        if self.by.is_empty() {
            format!("stats {}", aggs.join(", "))
        } else {
            format!("stats {} by {}", aggs.join(", "), self.by.join(", "))
        }
    }
}
