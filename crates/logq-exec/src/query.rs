//! A bound query and its cross-thread handle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use logq_commands::command::chain;
use logq_commands::status::StatusCell;
use logq_commands::{Command, QueryContext, Status, TimelineCallback};
use logq_core::id::QueryId;

use crate::error::ExecError;

/// Owns the chain head (and through it every command), the shared context,
/// and the query text. Executed once.
pub struct Query {
    text: Arc<str>,
    ctx: Arc<QueryContext>,
    head: Box<dyn Command>,
}

impl Query {
    pub fn new(text: impl Into<Arc<str>>, ctx: Arc<QueryContext>, head: Box<dyn Command>) -> Self {
        Self {
            text: text.into(),
            ctx,
            head,
        }
    }

    pub fn id(&self) -> QueryId {
        self.ctx.id()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn context(&self) -> &Arc<QueryContext> {
        &self.ctx
    }

    /// The chain, head first.
    pub fn commands(&self) -> Vec<&dyn Command> {
        chain(self.head.as_ref())
    }

    pub fn add_timeline_callback(&self, cb: Arc<dyn TimelineCallback>) {
        self.ctx.add_timeline_callback(cb);
    }

    pub fn timeline_callbacks(&self) -> Vec<Arc<dyn TimelineCallback>> {
        self.ctx.timeline_callbacks()
    }

    pub fn handle(&self) -> QueryHandle {
        QueryHandle {
            id: self.id(),
            text: Arc::clone(&self.text),
            ctx: Arc::clone(&self.ctx),
            commands: self
                .commands()
                .iter()
                .map(|c| Tracked {
                    name: c.name(),
                    reducer: c.is_reducer(),
                    status: c.core().status_handle(),
                })
                .collect(),
        }
    }

    /// One line per command: arguments, reducer flag, date column, header.
    pub fn explain(&self) -> Vec<String> {
        self.commands()
            .iter()
            .map(|c| {
                let mut line = c.describe();
                if c.is_reducer() {
                    line.push_str("  [reducer]");
                }
                if let Some(col) = c.date_column_name() {
                    line.push_str(&format!("  date={col}"));
                }
                if let Some(h) = c.core().header() {
                    line.push_str(&format!("  header={}", h.join(",")));
                }
                if c.core().callback_timeline() {
                    line.push_str("  [timeline]");
                }
                line
            })
            .collect()
    }

    /// Drive the chain to completion on the calling thread.
    pub fn run(mut self) -> Result<QueryReport, ExecError> {
        let started = Instant::now();
        tracing::info!(query = %self.id(), text = %self.text, "query started");

        let result = self.head.start();
        if self.head.status() != Status::End {
            // `start` failed before the source could end the chain itself.
            if let Err(e) = self.head.eof() {
                tracing::warn!(query = %self.id(), error = %e, "eof after failed start");
            }
        }

        let report = QueryReport {
            id: self.id().to_string(),
            commands: self
                .commands()
                .iter()
                .map(|c| CommandReport {
                    name: c.name(),
                    pushed: c.core().push_count(),
                })
                .collect(),
            elapsed: started.elapsed(),
        };
        match result {
            Ok(()) => {
                tracing::info!(
                    query = %report.id,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "query finished"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(query = %report.id, error = %e, "query failed");
                Err(ExecError::Command(e))
            }
        }
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("id", &self.id())
            .field("text", &self.text)
            .field("commands", &self.commands().len())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub name: &'static str,
    /// Rows (and batch rows) the command wrote downstream.
    pub pushed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub id: String,
    pub commands: Vec<CommandReport>,
    #[serde(with = "millis")]
    pub elapsed: Duration,
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[derive(Debug, Clone)]
struct Tracked {
    name: &'static str,
    reducer: bool,
    status: Arc<StatusCell>,
}

/// Snapshot of one command, as seen from another thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandState {
    pub name: &'static str,
    pub reducer: bool,
    #[serde(serialize_with = "status_name")]
    pub status: Status,
}

fn status_name<S: serde::Serializer>(status: &Status, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(status)
}

/// Thread-safe view of a query: statuses and cancellation.
#[derive(Debug, Clone)]
pub struct QueryHandle {
    id: QueryId,
    text: Arc<str>,
    ctx: Arc<QueryContext>,
    commands: Vec<Tracked>,
}

impl QueryHandle {
    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn commands(&self) -> Vec<CommandState> {
        self.commands
            .iter()
            .map(|t| CommandState {
                name: t.name,
                reducer: t.reducer,
                status: t.status.get(),
            })
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.commands.iter().all(|t| t.status.is_end())
    }

    /// Ask the head to stop; it ends the whole chain at its next poll.
    pub fn cancel(&self) {
        tracing::info!(query = %self.id, "query cancelled");
        self.ctx.request_head_eof();
    }

    pub fn is_cancelled(&self) -> bool {
        self.ctx.head_eof_requested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logq_commands::CommandError;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use logq_core::catalog::{TableMetadata, LOGFORMAT_KEY};
    use logq_io::{LookupTables, MemoryLogStorage, TableCatalog};

    use crate::bind::create_command;
    use crate::sink::{CollectRows, ResultSink};

    fn prepare(text: &str, rows: &CollectRows) -> Query {
        let storage = MemoryLogStorage::new().with_table("events", ["1000 a", "2000 b", "3000 c"]);
        let catalog = TableCatalog::new()
            .with_table("events", TableMetadata::new().with(LOGFORMAT_KEY, "_time user"));
        let ctx = Arc::new(QueryContext::in_memory());
        let head = create_command(
            Arc::clone(&ctx),
            text,
            Arc::new(storage),
            &catalog,
            &LookupTables::new(),
            ResultSink::new(Box::new(rows.clone())),
        )
        .unwrap();
        Query::new(text, ctx, head)
    }

    #[derive(Default)]
    struct Timeline {
        last: AtomicU64,
        puts: AtomicUsize,
        flushes: AtomicUsize,
    }

    impl TimelineCallback for Timeline {
        fn put(&self, ts: i64) {
            self.last.store(ts as u64, Ordering::SeqCst);
            self.puts.fetch_add(1, Ordering::SeqCst);
        }

        fn callback(&self) {
            self.flushes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn runs_and_reports() {
        let rows = CollectRows::new();
        let query = prepare("table events | search user != b", &rows);
        let handle = query.handle();
        assert!(!handle.is_finished());
        let report = query.run().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(handle.is_finished());
        let pushed: Vec<_> = report.commands.iter().map(|c| (c.name, c.pushed)).collect();
        assert_eq!(pushed, vec![("table", 3), ("search", 2), ("sink", 0)]);
    }

    #[test]
    fn timeline_observers_see_every_row_once() {
        let rows = CollectRows::new();
        let query = prepare("table events", &rows);
        let timeline = Arc::new(Timeline::default());
        query.add_timeline_callback(timeline.clone());
        assert_eq!(query.timeline_callbacks().len(), 1);
        query.run().unwrap();
        assert_eq!(timeline.puts.load(Ordering::SeqCst), 3);
        assert_eq!(timeline.last.load(Ordering::SeqCst), 3000);
        assert_eq!(timeline.flushes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancel_before_start_ends_everything() {
        let rows = CollectRows::new();
        let query = prepare("table events | sort -user", &rows);
        let handle = query.handle();
        handle.cancel();
        assert!(handle.is_cancelled());
        query.run().unwrap();
        assert!(handle.is_finished());
        assert!(rows.is_empty());
    }

    #[test]
    fn explain_lists_the_chain() {
        let rows = CollectRows::new();
        let query = prepare("table events | stats count by user", &rows);
        let lines = query.explain();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "table events  date=_time  header=_time,user  [timeline]");
        assert_eq!(lines[1], "stats count by user  [reducer]  header=_time,user");
        assert_eq!(lines[2], "sink  header=_time,user");
    }

    #[test]
    fn headless_chain_fails_to_start() {
        let rows = CollectRows::new();
        let ctx = Arc::new(QueryContext::in_memory());
        let head = create_command(
            Arc::clone(&ctx),
            "fields a",
            Arc::new(MemoryLogStorage::new()),
            &TableCatalog::new(),
            &LookupTables::new(),
            ResultSink::new(Box::new(rows.clone())),
        )
        .unwrap();
        let query = Query::new("fields a", ctx, head);
        let handle = query.handle();
        match query.run() {
            Err(ExecError::Command(e)) => {
                assert!(matches!(e, CommandError::NotSupported { operation: "start", .. }))
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(handle.is_finished());
    }
}
