//! Per-query memory budget with RAII reservations.
//!
//! Buffers and reducers reserve bytes before holding rows. Dropping a
//! `Reservation` gives its bytes back. The budget also keeps the peak usage
//! so a finished query can report it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct BudgetInner {
    capacity: usize,
    used: AtomicUsize,
    peak: AtomicUsize,
}

impl BudgetInner {
    fn try_take(&self, bytes: usize) -> bool {
        let mut cur = self.used.load(Ordering::Relaxed);
        loop {
            let next = cur.saturating_add(bytes);
            if next > self.capacity {
                return false;
            }
            match self
                .used
                .compare_exchange(cur, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => {
                    self.peak.fetch_max(next, Ordering::AcqRel);
                    return true;
                }
                Err(observed) => cur = observed,
            }
        }
    }

    fn give_back(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Shared handle to one query's memory cap. Cloning shares the same account.
#[derive(Clone)]
pub struct MemoryBudget {
    inner: Arc<BudgetInner>,
}

impl MemoryBudget {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            inner: Arc::new(BudgetInner {
                capacity: capacity_bytes,
                used: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// A budget that never refuses (tests, in-memory only buffers).
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Reserve `bytes`, or `None` if that would pass the cap.
    pub fn try_reserve(&self, bytes: usize, tag: &'static str) -> Option<Reservation> {
        if bytes > 0 && !self.inner.try_take(bytes) {
            return None;
        }
        Some(Reservation {
            inner: Arc::clone(&self.inner),
            bytes,
            tag,
        })
    }

    /// An empty reservation that can be grown later.
    pub fn empty_reservation(&self, tag: &'static str) -> Reservation {
        Reservation {
            inner: Arc::clone(&self.inner),
            bytes: 0,
            tag,
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Current usage (advisory).
    pub fn used(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for MemoryBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBudget")
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .finish()
    }
}

/// Bytes held against a `MemoryBudget`; released on drop.
pub struct Reservation {
    inner: Arc<BudgetInner>,
    bytes: usize,
    tag: &'static str,
}

impl Reservation {
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Grow by `extra` bytes. Returns false (and changes nothing) if the cap
    /// would be exceeded.
    pub fn try_grow(&mut self, extra: usize) -> bool {
        if extra == 0 {
            return true;
        }
        if self.inner.try_take(extra) {
            self.bytes += extra;
            true
        } else {
            false
        }
    }

    /// Give everything back but keep the reservation usable.
    pub fn clear(&mut self) {
        if self.bytes > 0 {
            self.inner.give_back(self.bytes);
            self.bytes = 0;
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.clear();
    }
}
