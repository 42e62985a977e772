//! Per-query state shared by every command of one chain.
//!
//! Holds the timeline observers, the head's status, the head-stop request
//! flag used by the backward half of `eof`, and the buffer/spill environment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::OnceCell;

use logq_core::config::EngineConfig;
use logq_core::id::QueryId;
use logq_mem::BufferEnv;

use crate::status::StatusCell;

/// Observer of event times flowing through a query.
///
/// `put` is called once per row written by the command that carries the
/// timeline flag; `callback` is called exactly once when that command ends.
pub trait TimelineCallback: Send + Sync {
    fn put(&self, ts: i64);

    fn callback(&self);
}

pub struct QueryContext {
    id: QueryId,
    config: EngineConfig,
    buffer_env: BufferEnv,
    observers: Mutex<Vec<Arc<dyn TimelineCallback>>>,
    head: OnceCell<Arc<StatusCell>>,
    stop_requested: AtomicBool,
}

impl QueryContext {
    pub fn new(config: EngineConfig, buffer_env: BufferEnv) -> Self {
        Self {
            id: QueryId::random(),
            config,
            buffer_env,
            observers: Mutex::new(Vec::new()),
            head: OnceCell::new(),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Same context under a caller-chosen id (e.g. one already used to name
    /// the spill directory).
    pub fn with_id(mut self, id: QueryId) -> Self {
        self.id = id;
        self
    }

    /// Context with default config and memory-only buffers.
    pub fn in_memory() -> Self {
        Self::new(EngineConfig::default(), BufferEnv::in_memory())
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn buffer_env(&self) -> &BufferEnv {
        &self.buffer_env
    }

    fn observers(&self) -> MutexGuard<'_, Vec<Arc<dyn TimelineCallback>>> {
        // Observers stay usable even if one of them panicked mid-call.
        self.observers.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_timeline_callback(&self, cb: Arc<dyn TimelineCallback>) {
        self.observers().push(cb);
    }

    pub fn timeline_callbacks(&self) -> Vec<Arc<dyn TimelineCallback>> {
        self.observers().clone()
    }

    pub fn timeline_put(&self, ts: i64) {
        for cb in self.observers().iter() {
            cb.put(ts);
        }
    }

    /// Deliver the final `callback` to every observer and forget them.
    /// A second call finds no observers left.
    pub fn flush_timeline(&self) {
        let taken = std::mem::take(&mut *self.observers());
        for cb in taken {
            cb.callback();
        }
    }

    /// Remember the head's status. Only the first call has an effect.
    pub fn set_head(&self, status: Arc<StatusCell>) {
        let _ = self.head.set(status);
    }

    pub fn head_ended(&self) -> bool {
        self.head.get().map(|s| s.is_end()).unwrap_or(true)
    }

    /// Ask the head to run its own `eof()` at its next poll.
    pub fn request_head_eof(&self) {
        if !self.stop_requested.swap(true, Ordering::AcqRel) {
            tracing::debug!(query = %self.id, "head eof requested");
        }
    }

    pub fn head_eof_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryContext")
            .field("id", &self.id)
            .field("stop_requested", &self.head_eof_requested())
            .finish()
    }
}
