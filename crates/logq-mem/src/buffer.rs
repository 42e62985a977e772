//! `RowBuffer`: an ordered batch of rows handed between commands in one call.
//!
//! Rows are kept in memory until the buffer passes its spill threshold (or
//! the query budget refuses a reservation); from then on the in-memory tail
//! is written out as spill segments. Disposal (segment deletion + reservation
//! release) happens exactly once: `close` consumes the buffer, `Drop` covers
//! every path that never called it, and `into_rows` disposes when its
//! iterator is dropped.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use logq_core::id::SpillId;
use logq_core::row::Row;

use crate::budget::{MemoryBudget, Reservation};
use crate::error::{Error, Result};
use crate::spill::{SegmentMeta, SpillManager};

/// Where buffers of one query take memory from and spill to.
#[derive(Clone)]
pub struct BufferEnv {
    pub spill: Option<Arc<Mutex<SpillManager>>>,
    pub budget: MemoryBudget,
    pub spill_threshold_bytes: usize,
}

impl BufferEnv {
    pub fn new(spill: SpillManager, budget: MemoryBudget, spill_threshold_bytes: usize) -> Self {
        Self {
            spill: Some(Arc::new(Mutex::new(spill))),
            budget,
            spill_threshold_bytes,
        }
    }

    /// No spill backend and no cap: everything stays in memory.
    pub fn in_memory() -> Self {
        Self {
            spill: None,
            budget: MemoryBudget::unbounded(),
            spill_threshold_bytes: usize::MAX,
        }
    }

    pub fn can_spill(&self) -> bool {
        self.spill.is_some()
    }

    pub(crate) fn lock_spill(&self) -> Result<Option<MutexGuard<'_, SpillManager>>> {
        match &self.spill {
            None => Ok(None),
            Some(m) => m
                .lock()
                .map(Some)
                .map_err(|_| Error::Storage("spill manager lock poisoned".into())),
        }
    }
}

impl std::fmt::Debug for BufferEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferEnv")
            .field("can_spill", &self.can_spill())
            .field("budget", &self.budget)
            .field("spill_threshold_bytes", &self.spill_threshold_bytes)
            .finish()
    }
}

pub struct RowBuffer {
    env: BufferEnv,
    spill_id: Option<SpillId>,
    next_seq: u32,
    segments: VecDeque<SegmentMeta>,
    mem: Vec<Row>,
    mem_bytes: usize,
    reservation: Reservation,
    len: usize,
    closed: bool,
}

impl RowBuffer {
    pub fn new(env: &BufferEnv) -> Self {
        Self {
            reservation: env.budget.empty_reservation("row_buffer"),
            env: env.clone(),
            spill_id: None,
            next_seq: 0,
            segments: VecDeque::new(),
            mem: Vec::new(),
            mem_bytes: 0,
            len: 0,
            closed: false,
        }
    }

    /// Memory-only buffer holding `rows`.
    pub fn in_memory(rows: Vec<Row>) -> Self {
        let mut buf = Self::new(&BufferEnv::in_memory());
        buf.len = rows.len();
        buf.mem = rows;
        buf
    }

    pub fn from_rows(env: &BufferEnv, rows: impl IntoIterator<Item = Row>) -> Result<Self> {
        let mut buf = Self::new(env);
        for row in rows {
            buf.push(row)?;
        }
        Ok(buf)
    }

    /// Append a row, spilling the in-memory part when needed.
    pub fn push(&mut self, row: Row) -> Result<()> {
        let bytes = row.approx_bytes();
        if !self.reservation.try_grow(bytes) {
            if self.env.can_spill() && !self.mem.is_empty() {
                self.spill_memory()?;
            }
            if !self.reservation.try_grow(bytes) {
                return Err(Error::BudgetExceeded {
                    tag: self.reservation.tag(),
                    requested: bytes,
                    capacity: self.env.budget.capacity(),
                    used: self.env.budget.used(),
                });
            }
        }
        self.mem.push(row);
        self.mem_bytes += bytes;
        self.len += 1;

        if self.mem_bytes >= self.env.spill_threshold_bytes && self.env.can_spill() {
            self.spill_memory()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Segments currently on spill storage.
    pub fn spilled_segments(&self) -> usize {
        self.segments.len()
    }

    /// Release memory and delete spill segments.
    pub fn close(mut self) -> Result<()> {
        self.dispose()
    }

    /// Consume the buffer into its rows, in insertion order.
    pub fn into_rows(mut self) -> RowBufferIter {
        let tail = std::mem::take(&mut self.mem);
        RowBufferIter {
            current: VecDeque::new(),
            tail: Some(tail),
            buf: self,
        }
    }

    fn spill_memory(&mut self) -> Result<()> {
        let rows = std::mem::take(&mut self.mem);
        let Some(mut mgr) = self.env.lock_spill()? else {
            self.mem = rows;
            return Ok(());
        };
        let id = *self.spill_id.get_or_insert_with(|| mgr.next_spill_id());
        let meta = mgr.write_rows(&rows, id, self.next_seq)?;
        drop(mgr);

        self.next_seq += 1;
        self.segments.push_back(meta);
        self.mem_bytes = 0;
        self.reservation.clear();
        Ok(())
    }

    fn dispose(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.mem.clear();
        self.mem_bytes = 0;
        self.reservation.clear();

        let segments: Vec<_> = self.segments.drain(..).collect();
        if segments.is_empty() {
            return Ok(());
        }
        let Some(mut mgr) = self.env.lock_spill()? else {
            return Ok(());
        };
        let mut first_err = None;
        for meta in segments {
            if let Err(e) = mgr.delete_segment(&meta.name) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for RowBuffer {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            tracing::warn!(error = %e, "failed to dispose row buffer");
        }
    }
}

impl std::fmt::Debug for RowBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowBuffer")
            .field("len", &self.len)
            .field("in_memory", &self.mem.len())
            .field("segments", &self.segments.len())
            .finish()
    }
}

/// Owning iterator over a buffer's rows. Each spill segment is deleted once
/// it has been read; dropping the iterator disposes whatever is left.
pub struct RowBufferIter {
    buf: RowBuffer,
    current: VecDeque<Row>,
    tail: Option<Vec<Row>>,
}

impl RowBufferIter {
    fn load_next_segment(&mut self) -> Result<bool> {
        let Some(meta) = self.buf.segments.pop_front() else {
            return Ok(false);
        };
        let Some(mut mgr) = self.buf.env.lock_spill()? else {
            return Ok(false);
        };
        let rows = mgr.read_rows(&meta)?;
        mgr.delete_segment(&meta.name)?;
        self.current.extend(rows);
        Ok(true)
    }
}

impl Iterator for RowBufferIter {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.current.pop_front() {
                return Some(Ok(row));
            }
            match self.load_next_segment() {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => return Some(Err(e)),
            }
            let tail = self.tail.take()?;
            if tail.is_empty() {
                return None;
            }
            self.current.extend(tail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spill::test_storage::MapStorage;
    use crate::spill::Codec;
    use logq_core::value::Value;

    fn spilling_env(threshold: usize) -> BufferEnv {
        let mgr = SpillManager::new(Box::new(MapStorage::default()), Codec::None, "/spill");
        BufferEnv::new(mgr, MemoryBudget::new(1 << 20), threshold)
    }

    fn live(env: &BufferEnv) -> usize {
        env.spill.as_ref().unwrap().lock().unwrap().live_segments()
    }

    fn numbered(n: i64) -> Vec<Row> {
        (0..n).map(|i| Row::new().with("i", i)).collect()
    }

    #[test]
    fn memory_only_keeps_order() {
        let buf = RowBuffer::in_memory(numbered(4));
        assert_eq!(buf.len(), 4);
        let got: Vec<_> = buf.into_rows().map(|r| r.unwrap()).collect();
        assert_eq!(got.len(), 4);
        assert_eq!(got[2].get("i"), Some(&Value::Int(2)));
    }

    #[test]
    fn spills_and_reads_back_in_order() {
        let env = spilling_env(200);
        let buf = RowBuffer::from_rows(&env, numbered(20)).unwrap();
        assert_eq!(buf.len(), 20);
        assert!(buf.spilled_segments() > 1);

        let got: Vec<i64> = buf
            .into_rows()
            .map(|r| r.unwrap().get("i").and_then(Value::as_i64).unwrap())
            .collect();
        assert_eq!(got, (0..20).collect::<Vec<_>>());
        assert_eq!(live(&env), 0);
        assert_eq!(env.budget.used(), 0);
    }

    #[test]
    fn close_and_drop_remove_segments() {
        let env = spilling_env(1);
        let buf = RowBuffer::from_rows(&env, numbered(3)).unwrap();
        assert_eq!(live(&env), 3);
        buf.close().unwrap();
        assert_eq!(live(&env), 0);

        let buf = RowBuffer::from_rows(&env, numbered(3)).unwrap();
        assert_eq!(live(&env), 3);
        drop(buf);
        assert_eq!(live(&env), 0);
    }

    #[test]
    fn partially_consumed_iterator_cleans_up() {
        let env = spilling_env(1);
        let buf = RowBuffer::from_rows(&env, numbered(5)).unwrap();
        let mut it = buf.into_rows();
        assert!(it.next().unwrap().is_ok());
        drop(it);
        assert_eq!(live(&env), 0);
    }

    #[test]
    fn budget_refusal_without_spill_is_an_error() {
        let env = BufferEnv {
            spill: None,
            budget: MemoryBudget::new(64),
            spill_threshold_bytes: usize::MAX,
        };
        let mut buf = RowBuffer::new(&env);
        let err = buf.push(Row::from_raw("x".repeat(200))).unwrap_err();
        assert!(matches!(err, Error::BudgetExceeded { .. }));
    }

    #[test]
    fn budget_refusal_with_spill_spills() {
        let mgr = SpillManager::new(Box::new(MapStorage::default()), Codec::None, "/spill");
        let env = BufferEnv::new(mgr, MemoryBudget::new(300), usize::MAX);
        let buf = RowBuffer::from_rows(&env, numbered(10)).unwrap();
        assert!(buf.spilled_segments() >= 1);
        assert_eq!(buf.into_rows().count(), 10);
    }
}
