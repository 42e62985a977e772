//! K-way merge of spilled sort runs.
//!
//! Each run is read one segment at a time; a min-heap holds the current
//! head row of every run. Ties go to the lower run index, and runs are
//! numbered in input order, so the merge is stable. Every segment is
//! deleted once read, and whatever is left is deleted when the merge stops
//! early or fails.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::{Arc, Mutex};

use logq_core::row::{Header, Row};
use logq_core::value::Value;
use logq_mem::spill::SegmentMeta;
use logq_mem::SpillManager;

use crate::error::Result;

use super::run::{lock_spill, RunMeta};
use super::{compare_keys, SortKey};

struct RunCursor {
    buffered: VecDeque<Row>,
    remaining: VecDeque<SegmentMeta>,
}

struct MergeEntry {
    keys: Vec<Value>,
    run: usize,
    row: Row,
    order: Arc<[SortKey]>,
}

impl PartialEq for MergeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeEntry {}

impl PartialOrd for MergeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        compare_keys(&self.order, &other.keys, &self.keys).then(other.run.cmp(&self.run))
    }
}

pub struct RunMerger {
    spill: Arc<Mutex<SpillManager>>,
    keys: Arc<[SortKey]>,
    header: Option<Header>,
    cursors: Vec<RunCursor>,
    heap: BinaryHeap<MergeEntry>,
}

impl RunMerger {
    pub fn new(
        spill: Arc<Mutex<SpillManager>>,
        keys: Arc<[SortKey]>,
        header: Option<Header>,
        runs: Vec<RunMeta>,
    ) -> Self {
        let cursors = runs
            .into_iter()
            .map(|r| RunCursor {
                buffered: VecDeque::new(),
                remaining: r.segments.into(),
            })
            .collect();
        Self {
            spill,
            keys,
            header,
            cursors,
            heap: BinaryHeap::new(),
        }
    }

    /// Feed merged rows to `emit` until the runs are exhausted or `emit`
    /// returns `false`. All segments are gone when this returns.
    pub fn merge(mut self, emit: &mut dyn FnMut(Row) -> Result<bool>) -> Result<()> {
        let merged = self.merge_inner(emit);
        let cleaned = self.cleanup();
        merged.and(cleaned)
    }

    fn merge_inner(&mut self, emit: &mut dyn FnMut(Row) -> Result<bool>) -> Result<()> {
        for run in 0..self.cursors.len() {
            self.advance(run)?;
        }
        tracing::debug!(runs = self.cursors.len(), "merging sort runs");
        while let Some(entry) = self.heap.pop() {
            if !emit(entry.row)? {
                break;
            }
            self.advance(entry.run)?;
        }
        Ok(())
    }

    /// Push the next row of `run` onto the heap, loading its next segment
    /// when the buffered rows are used up.
    fn advance(&mut self, run: usize) -> Result<()> {
        let cursor = &mut self.cursors[run];
        if cursor.buffered.is_empty() {
            if let Some(meta) = cursor.remaining.pop_front() {
                let mut mgr = lock_spill(&self.spill)?;
                let rows = mgr.read_rows(&meta)?;
                mgr.delete_segment(&meta.name)?;
                cursor.buffered = rows.into();
            }
        }
        if let Some(mut row) = cursor.buffered.pop_front() {
            let header = self.header.as_deref();
            let keys = self
                .keys
                .iter()
                .map(|k| row.resolve_cloned(header, &k.field).unwrap_or(Value::Null))
                .collect();
            self.heap.push(MergeEntry {
                keys,
                run,
                row,
                order: Arc::clone(&self.keys),
            });
        }
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        let mut mgr = lock_spill(&self.spill)?;
        for cursor in &mut self.cursors {
            for meta in cursor.remaining.drain(..) {
                mgr.delete_segment(&meta.name)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logq_io::MemoryStorage;
    use logq_mem::Codec;

    fn write_run(mgr: &mut SpillManager, id: u64, values: &[i64], per_segment: usize) -> RunMeta {
        let spill_id = logq_core::id::SpillId::new(id);
        let rows: Vec<Row> = values.iter().map(|v| Row::new().with("v", *v)).collect();
        let segments = rows
            .chunks(per_segment)
            .enumerate()
            .map(|(seq, chunk)| mgr.write_rows(chunk, spill_id, seq as u32).unwrap())
            .collect();
        RunMeta {
            rows: rows.len() as u64,
            segments,
        }
    }

    fn setup() -> (Arc<Mutex<SpillManager>>, Vec<RunMeta>) {
        let mut mgr = SpillManager::new(Box::new(MemoryStorage::new()), Codec::None, "memory://m");
        let runs = vec![
            write_run(&mut mgr, 1, &[1, 4, 7, 10], 2),
            write_run(&mut mgr, 2, &[2, 5, 8], 1),
            write_run(&mut mgr, 3, &[3, 6, 9], 3),
        ];
        (Arc::new(Mutex::new(mgr)), runs)
    }

    #[test]
    fn merges_in_order_and_deletes_segments() {
        let (spill, runs) = setup();
        let keys: Arc<[SortKey]> = vec![SortKey::asc("v")].into();
        let mut out = Vec::new();
        RunMerger::new(Arc::clone(&spill), keys, None, runs)
            .merge(&mut |row| {
                out.push(row.get("v").cloned().unwrap());
                Ok(true)
            })
            .unwrap();
        let expected: Vec<Value> = (1..=10).map(Value::Int).collect();
        assert_eq!(out, expected);
        assert_eq!(spill.lock().unwrap().live_segments(), 0);
    }

    #[test]
    fn early_stop_still_deletes_everything() {
        let (spill, runs) = setup();
        let keys: Arc<[SortKey]> = vec![SortKey::asc("v")].into();
        let mut seen = 0;
        RunMerger::new(Arc::clone(&spill), keys, None, runs)
            .merge(&mut |_| {
                seen += 1;
                Ok(seen < 2)
            })
            .unwrap();
        assert_eq!(seen, 2);
        assert_eq!(spill.lock().unwrap().live_segments(), 0);
    }
}
