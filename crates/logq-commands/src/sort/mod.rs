//! `sort [limit=N] [-]f1, [-]f2, ...`: stable external sort (reducer).
//!
//! Small inputs sort in memory. Larger ones are cut into sorted runs of
//! `EngineConfig::sort_run_rows` rows (or fewer, when the query budget
//! refuses), spilled, and k-way merged on `eof`. Ascending order puts nulls
//! and absent fields first; `-` reverses a key.

mod merge;
mod run;

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use logq_core::row::Row;
use logq_core::value::Value;
use logq_mem::RowBuffer;

use crate::command::{Command, CommandCore};
use crate::error::{CommandError, Result};

pub use merge::RunMerger;
pub use run::{Finished, Keyed, RunGenerator, RunMeta, RUN_SEGMENT_ROWS};

/// Run length used when the command is not bound to a query.
pub const DEFAULT_RUN_ROWS: usize = 50_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// `-field` is descending, `+field` or `field` ascending.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match token.strip_prefix('-') {
            Some(f) => Self::desc(f.trim()),
            None => Self::asc(token.strip_prefix('+').unwrap_or(token).trim()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field)
        } else {
            f.write_str(&self.field)
        }
    }
}

/// Compare two key tuples under `keys`.
pub fn compare_keys(keys: &[SortKey], a: &[Value], b: &[Value]) -> Ordering {
    for ((key, x), y) in keys.iter().zip(a).zip(b) {
        let ord = x.total_cmp(y);
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

pub struct Sort {
    core: CommandCore,
    keys: Arc<[SortKey]>,
    limit: Option<u64>,
    runs: Option<RunGenerator>,
    received: u64,
}

impl Sort {
    pub fn new(keys: Vec<SortKey>, limit: Option<u64>) -> Self {
        Self {
            core: CommandCore::new(),
            keys: keys.into(),
            limit,
            runs: None,
            received: 0,
        }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Sorted runs spilled so far.
    pub fn spilled_runs(&self) -> usize {
        self.runs.as_ref().map_or(0, |r| r.runs().len())
    }

    fn generator(&mut self) -> &mut RunGenerator {
        let core = &self.core;
        let keys = &self.keys;
        self.runs.get_or_insert_with(|| {
            let run_rows = core
                .context()
                .map(|c| c.config().sort_run_rows)
                .unwrap_or(DEFAULT_RUN_ROWS);
            RunGenerator::new(Arc::clone(keys), core.buffer_env(), run_rows)
        })
    }

    /// Write one sorted row; `false` once nothing more should be emitted.
    fn emit(core: &mut CommandCore, limit: Option<u64>, emitted: &mut u64, row: Row) -> Result<bool> {
        if core.next_ended() || limit.is_some_and(|l| *emitted >= l) {
            return Ok(false);
        }
        core.write(row)?;
        *emitted += 1;
        Ok(!core.next_ended() && !limit.is_some_and(|l| *emitted >= l))
    }
}

impl Command for Sort {
    fn name(&self) -> &'static str {
        "sort"
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
        let keys: Vec<Value> = self
            .keys
            .iter()
            .map(|k| self.core.resolve(&mut row, &k.field).unwrap_or(Value::Null))
            .collect();
        self.received += 1;
        self.generator().add(Keyed { keys, row })
    }

    /// Absorb the whole batch; a sort never ends mid-input.
    fn push_batch(&mut self, batch: RowBuffer) -> Result<()> {
        for row in batch.into_rows() {
            self.push(row?)?;
        }
        Ok(())
    }

    fn on_eof(&mut self) -> Result<()> {
        let Some(runs) = self.runs.take() else {
            return Ok(());
        };
        let limit = self.limit;
        let mut emitted = 0u64;
        let spill = self.core.buffer_env().spill;

        match runs.finish()? {
            Finished::InMemory(rows) => {
                tracing::debug!(rows = rows.len(), "sort in memory");
                for keyed in rows {
                    if !Self::emit(&mut self.core, limit, &mut emitted, keyed.row)? {
                        break;
                    }
                }
            }
            Finished::Runs(runs) => {
                tracing::debug!(rows = self.received, runs = runs.len(), "sort merge");
                let Some(spill) = spill else {
                    return Err(CommandError::Exec(
                        "sort runs spilled without a spill manager".into(),
                    ));
                };
                let header = self.core.header().cloned();
                let core = &mut self.core;
                RunMerger::new(spill, Arc::clone(&self.keys), header, runs)
                    .merge(&mut |row| Self::emit(core, limit, &mut emitted, row))?;
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let keys: Vec<String> = self.keys.iter().map(|k| k.to_string()).collect();
        match self.limit {
            Some(limit) => format!("sort limit={limit} {}", keys.join(", ")),
            None => format!("sort {}", keys.join(", ")),
        }
    }
}
