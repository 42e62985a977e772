//! `table [offset=N] [limit=N] <name>`: the source of a chain.
//!
//! `start()` scans the bound `LogStorage` and pushes rows (or batches of
//! `batch_size` rows) downstream. Between records it polls its own status,
//! the downstream status and the query's head-stop request; when any says
//! stop, it leaves the loop and runs its own `eof()`.

use std::sync::Arc;

use logq_core::catalog::LogStorage;
use logq_core::id::TableId;
use logq_core::row::Row;
use logq_mem::RowBuffer;

use crate::command::{Command, CommandCore};
use crate::error::{CommandError, Result};
use crate::status::Status;

pub struct Table {
    core: CommandCore,
    table_name: String,
    offset: u64,
    limit: Option<u64>,
    batch_size: usize,
    table_id: Option<TableId>,
    storage: Option<Arc<dyn LogStorage>>,
    scanned: u64,
}

impl Table {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            core: CommandCore::new(),
            table_name: table_name.into(),
            offset: 0,
            limit: None,
            batch_size: 0,
            table_id: None,
            storage: None,
            scanned: 0,
        }
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn table_id(&self) -> Option<TableId> {
        self.table_id
    }

    pub fn set_table_id(&mut self, id: TableId) {
        self.table_id = Some(id);
    }

    pub fn set_storage(&mut self, storage: Arc<dyn LogStorage>) {
        self.storage = Some(storage);
    }

    /// Rows per pushed batch; `0` or `1` pushes rows one at a time.
    pub fn set_batch_size(&mut self, rows: usize) {
        self.batch_size = rows;
    }

    /// Records read from storage so far (including skipped ones).
    pub fn scanned(&self) -> u64 {
        self.scanned
    }

    fn should_stop(&self) -> bool {
        self.core.status() == Status::End
            || self.core.next_ended()
            || self
                .core
                .context()
                .map(|c| c.head_eof_requested())
                .unwrap_or(false)
    }

    fn scan(&mut self, storage: &dyn LogStorage) -> Result<()> {
        let mut cursor = storage.open(&self.table_name)?;
        let batching = self.batch_size > 1;
        let env = self.core.buffer_env();
        let mut batch = RowBuffer::new(&env);
        let mut skipped = 0u64;
        let mut emitted = 0u64;

        while !self.should_stop() {
            if self.limit.is_some_and(|limit| emitted >= limit) {
                break;
            }
            let Some(row) = cursor.next() else {
                break;
            };
            let row: Row = row?;
            self.scanned += 1;
            if skipped < self.offset {
                skipped += 1;
                continue;
            }
            emitted += 1;

            if batching {
                batch.push(row)?;
                if batch.len() >= self.batch_size {
                    let full = std::mem::replace(&mut batch, RowBuffer::new(&env));
                    self.core.write_batch(full)?;
                }
            } else {
                self.core.write(row)?;
            }
        }

        if batch.is_empty() {
            batch.close()?;
        } else {
            self.core.write_batch(batch)?;
        }
        tracing::debug!(table = %self.table_name, scanned = self.scanned, emitted, "table scan done");
        Ok(())
    }
}

impl Command for Table {
    fn name(&self) -> &'static str {
        "table"
    }

    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CommandCore {
        &mut self.core
    }

    /// Rows pushed into a table (it is normally the head) pass through.
    fn push(&mut self, row: Row) -> Result<()> {
        self.core.write(row)
    }

    fn start(&mut self) -> Result<()> {
        let storage = self.storage.clone().ok_or_else(|| {
            CommandError::Exec(format!("table '{}' has no storage bound", self.table_name))
        })?;
        self.core.set_status(Status::Running);
        let scanned = self.scan(storage.as_ref());
        let ended = self.eof();
        scanned.and(ended)
    }

    fn describe(&self) -> String {
        let mut s = String::from("table");
        if self.offset > 0 {
            s.push_str(&format!(" offset={}", self.offset));
        }
        if let Some(limit) = self.limit {
            s.push_str(&format!(" limit={limit}"));
        }
        s.push(' ');
        s.push_str(&self.table_name);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::Collect;
    use logq_core::value::Value;
    use logq_io::MemoryLogStorage;

    fn storage(n: usize) -> Arc<dyn LogStorage> {
        let records: Vec<String> = (0..n).map(|i| format!("{i} user{i}")).collect();
        Arc::new(MemoryLogStorage::new().with_table("events", records))
    }

    #[test]
    fn scans_with_offset_and_limit() {
        let (collect, rows, eofs) = Collect::new();
        let mut table = Table::new("events").with_offset(2).with_limit(Some(3));
        table.set_storage(storage(10));
        table.set_next(Box::new(collect));

        table.start().unwrap();
        let rows = rows.lock().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].raw(), Some("2 user2"));
        assert_eq!(table.core().push_count(), 3);
        assert_eq!(table.status(), Status::End);
        assert_eq!(eofs.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn batches_rows() {
        let (collect, rows, _) = Collect::new();
        let mut table = Table::new("events");
        table.set_storage(storage(7));
        table.set_batch_size(3);
        table.set_next(Box::new(collect));
        table.set_header(Some(logq_core::row::header_from_logformat("n user")));

        table.start().unwrap();
        let mut rows = rows.lock().unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(table.core().push_count(), 7);
        let header = table.core().header().cloned();
        assert_eq!(
            rows[6].resolve(header.as_deref(), "user"),
            Some(&Value::str("user6"))
        );
    }

    #[test]
    fn unbound_or_unknown_table_fails() {
        let mut table = Table::new("events");
        assert!(matches!(table.start(), Err(CommandError::Exec(_))));

        let mut table = Table::new("missing");
        table.set_storage(storage(1));
        assert!(matches!(table.start(), Err(CommandError::Storage(_))));
        assert_eq!(table.status(), Status::End);
    }
}
