//! Query service: prepares queries against one set of collaborators and
//! drives each on its own thread.

use std::sync::Arc;
use std::thread::JoinHandle;

use logq_commands::QueryContext;
use logq_core::catalog::{LogStorage, LookupService, TableRegistry};
use logq_core::config::EngineConfig;
use logq_core::id::QueryId;
use logq_io::build_spill_manager;
use logq_mem::{BufferEnv, MemoryBudget};

use crate::bind::create_command;
use crate::error::ExecError;
use crate::query::{Query, QueryHandle, QueryReport};
use crate::sink::{ResultSink, RowConsumer};

/// Owns the engine config and the storage, catalog and lookup services every
/// query is bound against.
#[derive(Clone)]
pub struct QueryService {
    config: EngineConfig,
    storage: Arc<dyn LogStorage>,
    tables: Arc<dyn TableRegistry>,
    lookups: Arc<dyn LookupService>,
}

impl QueryService {
    pub fn new(
        config: EngineConfig,
        storage: Arc<dyn LogStorage>,
        tables: Arc<dyn TableRegistry>,
        lookups: Arc<dyn LookupService>,
    ) -> Self {
        Self {
            config,
            storage,
            tables,
            lookups,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fresh per-query context: its own memory budget and spill directory.
    fn context(&self) -> Result<Arc<QueryContext>, ExecError> {
        let id = QueryId::random();
        let spill = build_spill_manager(&self.config, &id.to_string())?;
        let budget = MemoryBudget::new(self.config.mem_cap_bytes);
        let env = BufferEnv::new(spill, budget, self.config.buffer_spill_threshold_bytes);
        Ok(Arc::new(
            QueryContext::new(self.config.clone(), env).with_id(id),
        ))
    }

    /// Compile and bind `text`; results go to `consumer`.
    pub fn prepare(&self, text: &str, consumer: Box<dyn RowConsumer>) -> Result<Query, ExecError> {
        let ctx = self.context()?;
        let head = create_command(
            Arc::clone(&ctx),
            text,
            Arc::clone(&self.storage),
            self.tables.as_ref(),
            self.lookups.as_ref(),
            ResultSink::new(consumer),
        )?;
        Ok(Query::new(text, ctx, head))
    }

    /// Prepare and run on the calling thread.
    pub fn run(&self, text: &str, consumer: Box<dyn RowConsumer>) -> Result<QueryReport, ExecError> {
        self.prepare(text, consumer)?.run()
    }

    /// Run `query` on a dedicated thread.
    pub fn spawn(&self, query: Query) -> Result<RunningQuery, ExecError> {
        let handle = query.handle();
        let thread = std::thread::Builder::new()
            .name(format!("logq-query-{}", query.id()))
            .spawn(move || query.run())
            .map_err(|e| ExecError::Thread(e.to_string()))?;
        tracing::debug!(query = %handle.id(), "query thread spawned");
        Ok(RunningQuery { handle, thread })
    }
}

/// A query executing on its own thread.
pub struct RunningQuery {
    handle: QueryHandle,
    thread: JoinHandle<Result<QueryReport, ExecError>>,
}

impl RunningQuery {
    pub fn handle(&self) -> &QueryHandle {
        &self.handle
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Wait for the driving thread and return its outcome.
    pub fn join(self) -> Result<QueryReport, ExecError> {
        self.thread
            .join()
            .map_err(|_| ExecError::Thread(format!("query {} panicked", self.handle.id())))?
    }
}
