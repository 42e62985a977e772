//! `drop`: swallow every row.

use logq_core::row::Row;

use crate::command::{Command, CommandCore};
use crate::error::Result;

#[derive(Default)]
pub struct DropCmd {
    core: CommandCore,
    dropped: u64,
}

impl DropCmd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Command for DropCmd {
    fn name(&self) -> &'static str {
        "drop"
    }

    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CommandCore {
        &mut self.core
    }

    fn push(&mut self, _row: Row) -> Result<()> {
        self.dropped += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::Collect;

    #[test]
    fn nothing_reaches_downstream() {
        let (collect, rows, _) = Collect::new();
        let mut drop = DropCmd::new();
        drop.set_next(Box::new(collect));
        for _ in 0..3 {
            drop.push(Row::from_raw("x")).unwrap();
        }
        drop.eof().unwrap();
        assert_eq!(drop.dropped(), 3);
        assert_eq!(drop.core().push_count(), 0);
        assert!(rows.lock().unwrap().is_empty());
    }
}
