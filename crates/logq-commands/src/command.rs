//! The `Command` trait and the state every command carries (`CommandCore`).
//!
//! Invariants:
//! - The chain is a forward list: each command exclusively owns its `next`.
//! - Header and date column are pushed down the chain when a link is made
//!   and whenever they change on an upstream command.
//! - Status only moves forward (`Waiting -> Running -> End`).
//! - `push_count` counts every row handed to `write` (and every row of every
//!   batch handed to `write_batch`), whether or not downstream took it.

use std::any::Any;
use std::sync::Arc;

use logq_core::row::{Header, Row};
use logq_core::value::Value;
use logq_mem::{BufferEnv, RowBuffer};

use crate::context::QueryContext;
use crate::error::{CommandError, Result};
use crate::status::{Status, StatusCell};

/// Upcast helper so bound commands can be found again by concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub trait Command: AsAny + Send {
    /// Keyword this command was parsed from (stable, used in logs).
    fn name(&self) -> &'static str;

    fn core(&self) -> &CommandCore;

    fn core_mut(&mut self) -> &mut CommandCore;

    /// Reducers consume their whole input before emitting anything.
    fn is_reducer(&self) -> bool {
        false
    }

    /// Consume one row.
    fn push(&mut self, row: Row) -> Result<()>;

    /// Consume a batch. The default unwraps it into `push`; the buffer is
    /// disposed when the row iterator is dropped, on every path.
    fn push_batch(&mut self, batch: RowBuffer) -> Result<()> {
        for row in batch.into_rows() {
            if self.status() == Status::End {
                break;
            }
            self.push(row?)?;
        }
        Ok(())
    }

    /// Begin producing rows. Only sources implement this.
    fn start(&mut self) -> Result<()> {
        Err(CommandError::NotSupported {
            command: self.name(),
            operation: "start",
        })
    }

    /// Flush hook run by `eof` before the status becomes `End`; reducers
    /// emit their results here while downstream is still alive.
    fn on_eof(&mut self) -> Result<()> {
        Ok(())
    }

    /// Human-readable arguments, for `explain` output.
    fn describe(&self) -> String {
        self.name().to_string()
    }

    fn status(&self) -> Status {
        self.core().status()
    }

    /// Event-time field name, absent for reducers.
    fn date_column_name(&self) -> Option<&str> {
        if self.is_reducer() {
            None
        } else {
            self.core().date_column.as_deref()
        }
    }

    /// Set the header here and on every downstream command.
    fn set_header(&mut self, header: Option<Header>) {
        let core = self.core_mut();
        core.header = header.clone();
        if let Some(next) = core.next.as_mut() {
            next.set_header(header);
        }
    }

    /// Set the date column here; downstream receives what this command
    /// reports (nothing, for a reducer).
    fn set_date_column(&mut self, column: Option<String>) {
        self.core_mut().date_column = column;
        let downstream = self.date_column_name().map(str::to_string);
        if let Some(next) = self.core_mut().next.as_mut() {
            next.set_date_column(downstream);
        }
    }

    /// Link `next` after this command, handing it (and its tail) this
    /// command's header and date column.
    fn set_next(&mut self, mut next: Box<dyn Command>) {
        next.set_header(self.core().header.clone());
        next.set_date_column(self.date_column_name().map(str::to_string));
        self.core_mut().next = Some(next);
    }

    /// End this command and propagate.
    ///
    /// 1. no-op if already `End`;
    /// 2. run `on_eof`, then mark `End`;
    /// 3. end `next` if it is still alive;
    /// 4. flush the timeline observers if this command reports to them;
    /// 5. if the head is still alive, ask it to stop (it runs its own `eof`).
    fn eof(&mut self) -> Result<()> {
        if self.core().status.is_end() {
            return Ok(());
        }
        let mut result = self.on_eof();
        self.core().status.advance(Status::End);

        let core = self.core_mut();
        if let Some(next) = core.next.as_mut() {
            if next.status() != Status::End {
                let downstream = next.eof();
                if result.is_ok() {
                    result = downstream;
                }
            }
        }
        if let Some(ctx) = core.context.as_ref() {
            if core.callback_timeline {
                ctx.flush_timeline();
            }
            if !ctx.head_ended() {
                ctx.request_head_eof();
            }
        }
        tracing::trace!(command = self.name(), pushed = self.core().push_count(), "eof");
        result
    }
}

impl dyn Command {
    pub fn is<T: Command>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Command>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Command>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

impl std::fmt::Debug for dyn Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name())
            .field("status", &self.status())
            .field("push_count", &self.core().push_count())
            .finish()
    }
}

/// State shared by all commands.
#[derive(Default)]
pub struct CommandCore {
    status: Arc<StatusCell>,
    pub(crate) header: Option<Header>,
    pub(crate) date_column: Option<String>,
    pub(crate) next: Option<Box<dyn Command>>,
    push_count: u64,
    callback_timeline: bool,
    pub(crate) context: Option<Arc<QueryContext>>,
    query_text: Option<Arc<str>>,
}

impl CommandCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    /// Shared handle to the status, for observers on other threads.
    pub fn status_handle(&self) -> Arc<StatusCell> {
        Arc::clone(&self.status)
    }

    /// Move the status forward; lower states after `End` are ignored.
    pub fn set_status(&self, status: Status) {
        self.status.advance(status);
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Raw date column as inherited, regardless of reducer suppression.
    pub fn date_column(&self) -> Option<&str> {
        self.date_column.as_deref()
    }

    pub fn next(&self) -> Option<&dyn Command> {
        self.next.as_deref()
    }

    pub fn next_mut(&mut self) -> Option<&mut (dyn Command + 'static)> {
        self.next.as_deref_mut()
    }

    /// True when there is no downstream, or it has ended.
    pub fn next_ended(&self) -> bool {
        self.next
            .as_ref()
            .map(|n| n.status() == Status::End)
            .unwrap_or(true)
    }

    pub fn push_count(&self) -> u64 {
        self.push_count
    }

    pub fn callback_timeline(&self) -> bool {
        self.callback_timeline
    }

    pub fn set_callback_timeline(&mut self, enabled: bool) {
        self.callback_timeline = enabled;
    }

    pub fn context(&self) -> Option<&Arc<QueryContext>> {
        self.context.as_ref()
    }

    pub fn set_context(&mut self, ctx: Arc<QueryContext>) {
        self.context = Some(ctx);
    }

    pub fn query_text(&self) -> Option<&str> {
        self.query_text.as_deref()
    }

    pub fn set_query_text(&mut self, text: Arc<str>) {
        self.query_text = Some(text);
    }

    /// Buffer environment of the query, or memory-only when unbound.
    pub fn buffer_env(&self) -> BufferEnv {
        self.context
            .as_ref()
            .map(|c| c.buffer_env().clone())
            .unwrap_or_else(BufferEnv::in_memory)
    }

    /// Resolve `field` on `row` with this command's header (see `Row::resolve`).
    pub fn resolve(&self, row: &mut Row, field: &str) -> Option<Value> {
        row.resolve_cloned(self.header.as_deref(), field)
    }

    /// Emit one row downstream. Counted even when it is dropped because
    /// downstream has ended or does not exist.
    pub fn write(&mut self, mut row: Row) -> Result<()> {
        self.push_count += 1;
        let Some(next) = self.next.as_mut() else {
            return Ok(());
        };
        if next.status() == Status::End {
            return Ok(());
        }
        if self.callback_timeline {
            if let (Some(ctx), Some(col)) = (self.context.as_ref(), self.date_column.as_deref()) {
                if let Some(ts) = row
                    .resolve(self.header.as_deref(), col)
                    .and_then(Value::as_i64)
                {
                    ctx.timeline_put(ts);
                }
            }
        }
        next.core().set_status(Status::Running);
        next.push(row)
    }

    /// Emit a batch downstream, or dispose it right away if nobody will
    /// take it.
    pub fn write_batch(&mut self, batch: RowBuffer) -> Result<()> {
        self.push_count += batch.len() as u64;
        match self.next.as_mut() {
            Some(next) if next.status() != Status::End => {
                next.core().set_status(Status::Running);
                next.push_batch(batch)
            }
            _ => Ok(batch.close()?),
        }
    }
}

/// Call `f` on every command of the chain, head first.
pub fn for_each_command(
    cmd: &mut (dyn Command + 'static),
    f: &mut dyn FnMut(&mut (dyn Command + 'static)),
) {
    f(&mut *cmd);
    if let Some(next) = cmd.core_mut().next.as_deref_mut() {
        for_each_command(next, f);
    }
}

/// The chain as a list, head first.
pub fn chain(head: &dyn Command) -> Vec<&dyn Command> {
    let mut out = Vec::new();
    let mut cur = Some(head);
    while let Some(cmd) = cur {
        out.push(cmd);
        cur = cmd.core().next.as_deref();
    }
    out
}

pub fn chain_len(head: &dyn Command) -> usize {
    chain(head).len()
}

/// Link `tail` after the last command of the chain.
pub fn append(cmd: &mut dyn Command, tail: Box<dyn Command>) {
    match cmd.core_mut().next.as_deref_mut() {
        Some(next) => append(next, tail),
        None => cmd.set_next(tail),
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::{Collect, Pass, Reduce};
    use super::*;
    use logq_core::row::header_from_logformat;

    #[test]
    fn header_and_date_column_reach_the_tail() {
        let mut head: Box<dyn Command> = Box::new(Pass::default());
        head.set_header(Some(header_from_logformat("a b c")));
        head.set_date_column(Some("_time".into()));
        let mut mid: Box<dyn Command> = Box::new(Pass::default());
        mid.set_next(Box::new(Pass::default()));
        head.set_next(mid);

        for cmd in chain(head.as_ref()) {
            assert_eq!(cmd.core().header().map(|h| h.len()), Some(3));
            assert_eq!(cmd.date_column_name(), Some("_time"));
        }

        // Changing the head later still reaches everyone.
        head.set_header(Some(header_from_logformat("x")));
        assert!(chain(head.as_ref())
            .iter()
            .all(|c| c.core().header().map(|h| h.len()) == Some(1)));
    }

    #[test]
    fn reducers_hide_the_date_column() {
        let mut head: Box<dyn Command> = Box::new(Pass::default());
        head.set_date_column(Some("_time".into()));
        let mut reduce: Box<dyn Command> = Box::new(Reduce::default());
        reduce.set_next(Box::new(Pass::default()));
        head.set_next(reduce);

        let cmds = chain(head.as_ref());
        assert_eq!(cmds[1].date_column_name(), None);
        assert_eq!(cmds[1].core().date_column(), Some("_time"));
        assert_eq!(cmds[2].date_column_name(), None);
    }

    #[test]
    fn start_is_not_supported_on_non_sources() {
        let mut pass = Pass::default();
        assert!(matches!(
            pass.start(),
            Err(CommandError::NotSupported { operation: "start", .. })
        ));
    }

    #[test]
    fn write_counts_dropped_rows() {
        let (collect, rows, _) = Collect::new();
        let mut head = Pass::default();
        head.set_next(Box::new(collect));

        head.core.write(Row::new().with("i", 1i64)).unwrap();
        head.core.next_mut().unwrap().eof().unwrap();
        head.core.write(Row::new().with("i", 2i64)).unwrap();

        assert_eq!(head.core.push_count(), 2);
        assert_eq!(rows.lock().unwrap().len(), 1);
    }

    #[test]
    fn batches_are_counted_and_disposed_when_downstream_ended() {
        let (collect, rows, _) = Collect::new();
        let mut head = Pass::default();
        head.set_next(Box::new(collect));

        let batch = RowBuffer::in_memory(vec![Row::new(), Row::new(), Row::new()]);
        head.core.write_batch(batch).unwrap();
        assert_eq!(head.core.push_count(), 3);
        assert_eq!(rows.lock().unwrap().len(), 3);

        head.core.next_mut().unwrap().eof().unwrap();
        head.core
            .write_batch(RowBuffer::in_memory(vec![Row::new(), Row::new()]))
            .unwrap();
        assert_eq!(head.core.push_count(), 5);
        assert_eq!(rows.lock().unwrap().len(), 3);
    }

    #[test]
    fn eof_is_idempotent_and_forward() {
        let (collect, _, eofs) = Collect::new();
        let mut head = Pass::default();
        head.set_next(Box::new(collect));

        head.eof().unwrap();
        head.eof().unwrap();
        assert_eq!(head.status(), Status::End);
        assert_eq!(head.core.next().unwrap().status(), Status::End);
        assert_eq!(eofs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tail_eof_requests_head_stop() {
        let ctx = Arc::new(QueryContext::in_memory());
        let (collect, _, _) = Collect::new();
        let mut head: Box<dyn Command> = Box::new(Pass::default());
        head.set_next(Box::new(collect));
        for_each_command(head.as_mut(), &mut |c| c.core_mut().set_context(Arc::clone(&ctx)));
        ctx.set_head(head.core().status_handle());

        head.core_mut().next_mut().unwrap().eof().unwrap();
        assert!(ctx.head_eof_requested());
        assert_eq!(head.status(), Status::Waiting);
    }

    #[test]
    fn append_and_downcast() {
        let mut head: Box<dyn Command> = Box::new(Pass::default());
        append(head.as_mut(), Box::new(Pass::default()));
        append(head.as_mut(), Box::new(Reduce::default()));
        assert_eq!(chain_len(head.as_ref()), 3);
        let names: Vec<_> = chain(head.as_ref()).iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["pass", "pass", "reduce"]);
        assert!(head.is::<Pass>());
        assert!(head.downcast_mut::<Reduce>().is_none());
    }
}
