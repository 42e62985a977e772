//! Run generation for the sort reducer.
//!
//! Rows accumulate in memory (charged to the query budget) until the run
//! reaches `max_rows` or the budget refuses; the run is then sorted and
//! written to spill as a sequence of segments. Without a spill backend the
//! generator simply keeps everything in memory.

use std::sync::{Arc, Mutex, MutexGuard};

use logq_core::id::SpillId;
use logq_core::row::Row;
use logq_core::value::Value;
use logq_mem::spill::SegmentMeta;
use logq_mem::{BufferEnv, Reservation, SpillManager};

use crate::error::{CommandError, Result};

use super::{compare_keys, SortKey};

/// Rows per spill segment inside one run; the merge reads a run one
/// segment at a time.
pub const RUN_SEGMENT_ROWS: usize = 1024;

/// A row with its sort key values resolved.
#[derive(Debug, Clone)]
pub struct Keyed {
    pub keys: Vec<Value>,
    pub row: Row,
}

/// A sorted run on spill storage.
#[derive(Debug, Clone)]
pub struct RunMeta {
    pub rows: u64,
    pub segments: Vec<SegmentMeta>,
}

pub(crate) fn lock_spill(spill: &Arc<Mutex<SpillManager>>) -> Result<MutexGuard<'_, SpillManager>> {
    spill.lock().map_err(|_| {
        CommandError::Spill(logq_mem::error::Error::Storage(
            "spill manager lock poisoned".into(),
        ))
    })
}

pub struct RunGenerator {
    keys: Arc<[SortKey]>,
    env: BufferEnv,
    spill_id: Option<SpillId>,
    next_seq: u32,
    pending: Vec<Keyed>,
    max_rows: usize,
    reservation: Reservation,
    runs: Vec<RunMeta>,
}

impl RunGenerator {
    pub fn new(keys: Arc<[SortKey]>, env: BufferEnv, max_rows: usize) -> Self {
        let reservation = env.budget.empty_reservation("sort");
        Self {
            keys,
            env,
            spill_id: None,
            next_seq: 0,
            pending: Vec::new(),
            max_rows: max_rows.max(1),
            reservation,
            runs: Vec::new(),
        }
    }

    pub fn runs(&self) -> &[RunMeta] {
        &self.runs
    }

    pub fn pending_rows(&self) -> usize {
        self.pending.len()
    }

    /// Add one row; may spill the current run.
    pub fn add(&mut self, keyed: Keyed) -> Result<()> {
        let bytes = keyed.row.approx_bytes()
            + keyed.keys.iter().map(Value::approx_bytes).sum::<usize>();
        if !self.reservation.try_grow(bytes) {
            if self.env.can_spill() && !self.pending.is_empty() {
                self.flush_run()?;
            }
            if !self.reservation.try_grow(bytes) {
                let budget = &self.env.budget;
                return Err(CommandError::Spill(logq_mem::error::Error::BudgetExceeded {
                    tag: "sort",
                    requested: bytes,
                    capacity: budget.capacity(),
                    used: budget.used(),
                }));
            }
        }
        self.pending.push(keyed);
        if self.pending.len() >= self.max_rows && self.env.can_spill() {
            self.flush_run()?;
        }
        Ok(())
    }

    /// Sort the pending rows in place (stable).
    fn sort_pending(&mut self) {
        let keys = Arc::clone(&self.keys);
        self.pending
            .sort_by(|a, b| compare_keys(&keys, &a.keys, &b.keys));
    }

    fn flush_run(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let Some(spill) = self.env.spill.clone() else {
            return Ok(());
        };
        self.sort_pending();
        let rows: Vec<Row> = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|k| k.row)
            .collect();

        let mut mgr = lock_spill(&spill)?;
        let spill_id = *self.spill_id.get_or_insert_with(|| mgr.next_spill_id());
        let mut segments = Vec::with_capacity(rows.len().div_ceil(RUN_SEGMENT_ROWS));
        for chunk in rows.chunks(RUN_SEGMENT_ROWS) {
            match mgr.write_rows(chunk, spill_id, self.next_seq) {
                Ok(meta) => segments.push(meta),
                Err(e) => {
                    for meta in &segments {
                        let _ = mgr.delete_segment(&meta.name);
                    }
                    return Err(e.into());
                }
            }
            self.next_seq += 1;
        }
        drop(mgr);

        tracing::debug!(
            run = self.runs.len(),
            rows = rows.len(),
            segments = segments.len(),
            "sort run spilled"
        );
        self.runs.push(RunMeta {
            rows: rows.len() as u64,
            segments,
        });
        self.reservation.clear();
        Ok(())
    }

    /// Finish the input. Returns the in-memory rows already sorted when
    /// nothing was spilled; otherwise spills the last run and returns the
    /// runs to merge.
    pub fn finish(mut self) -> Result<Finished> {
        if self.runs.is_empty() {
            self.sort_pending();
            let rows = std::mem::take(&mut self.pending);
            return Ok(Finished::InMemory(rows));
        }
        self.flush_run()?;
        Ok(Finished::Runs(std::mem::take(&mut self.runs)))
    }

    /// Delete every spilled segment (used when the sort is abandoned).
    pub fn discard(mut self) -> Result<()> {
        self.delete_runs()
    }

    fn delete_runs(&mut self) -> Result<()> {
        let runs = std::mem::take(&mut self.runs);
        if let Some(spill) = self.env.spill.as_ref() {
            let mut mgr = lock_spill(spill)?;
            for meta in runs.iter().flat_map(|r| r.segments.iter()) {
                mgr.delete_segment(&meta.name)?;
            }
        }
        Ok(())
    }
}

impl Drop for RunGenerator {
    fn drop(&mut self) {
        if let Err(e) = self.delete_runs() {
            tracing::warn!(error = %e, "failed to delete sort runs");
        }
    }
}

pub enum Finished {
    InMemory(Vec<Keyed>),
    Runs(Vec<RunMeta>),
}
