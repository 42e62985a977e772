//! Terminal command of every bound chain.
//!
//! `ResultSink` materializes the header fields of each row it receives and
//! hands the row to a `RowConsumer`. The raw record is kept only when there
//! is no header to extract fields from.

use std::io::Write;
use std::sync::{Arc, Mutex};

use logq_commands::{Command, CommandCore, CommandError, Result};
use logq_core::row::Row;
use logq_io::JsonlWriter;

/// Where result rows go.
pub trait RowConsumer: Send {
    fn consume(&mut self, row: Row) -> Result<()>;

    /// Called once, when the sink ends.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct ResultSink {
    core: CommandCore,
    consumer: Box<dyn RowConsumer>,
    rows: u64,
}

impl ResultSink {
    pub fn new(consumer: Box<dyn RowConsumer>) -> Self {
        Self {
            core: CommandCore::new(),
            consumer,
            rows: 0,
        }
    }

    /// Rows handed to the consumer.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl Command for ResultSink {
    fn name(&self) -> &'static str {
        "sink"
    }

    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CommandCore {
        &mut self.core
    }

    fn push(&mut self, mut row: Row) -> Result<()> {
        if let Some(header) = self.core.header().cloned() {
            for field in header.iter() {
                row.resolve(Some(&header[..]), field);
            }
            row.set_raw(None);
        }
        self.rows += 1;
        self.consumer.consume(row)
    }

    fn on_eof(&mut self) -> Result<()> {
        tracing::debug!(rows = self.rows, "result sink finished");
        self.consumer.finish()
    }
}

/// Keeps every row in memory. Clones share the same rows.
#[derive(Clone, Default)]
pub struct CollectRows {
    rows: Arc<Mutex<Vec<Row>>>,
}

impl CollectRows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the rows collected so far.
    pub fn rows(&self) -> Vec<Row> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RowConsumer for CollectRows {
    fn consume(&mut self, row: Row) -> Result<()> {
        self.rows
            .lock()
            .map_err(|_| CommandError::Exec("result rows lock poisoned".into()))?
            .push(row);
        Ok(())
    }
}

/// Streams rows as JSON lines.
pub struct JsonlRows<W: Write + Send> {
    writer: JsonlWriter<W>,
}

impl<W: Write + Send> JsonlRows<W> {
    pub fn new(writer: JsonlWriter<W>) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send> RowConsumer for JsonlRows<W> {
    fn consume(&mut self, row: Row) -> Result<()> {
        self.writer
            .write_row(&row)
            .map_err(|e| CommandError::Storage(e.into()))
    }

    fn finish(&mut self) -> Result<()> {
        tracing::debug!(rows = self.writer.rows_written(), "jsonl output flushed");
        self.writer
            .flush()
            .map_err(|e| CommandError::Storage(e.into()))
    }
}
