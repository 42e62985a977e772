//! Command status, readable from any thread.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Status {
    Waiting = 0,
    Running = 1,
    End = 2,
}

impl Status {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Status::Waiting,
            1 => Status::Running,
            _ => Status::End,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Waiting => "waiting",
            Status::Running => "running",
            Status::End => "end",
        };
        f.write_str(s)
    }
}

/// Atomic status slot. Transitions only move forward; `End` is terminal.
#[derive(Debug, Default)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(&self) -> Status {
        Status::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Advance to `status`. Returns false when the cell was already at or
    /// past it.
    pub fn advance(&self, status: Status) -> bool {
        self.0.fetch_max(status as u8, Ordering::AcqRel) < status as u8
    }

    pub fn is_end(&self) -> bool {
        self.get() == Status::End
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_monotonic() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), Status::Waiting);
        assert!(cell.advance(Status::Running));
        assert!(!cell.advance(Status::Running));
        assert!(cell.advance(Status::End));
        assert!(!cell.advance(Status::Running));
        assert_eq!(cell.get(), Status::End);
    }
}
