//! Post-parse binding pass.
//!
//! Takes the chain produced by the registry and makes it runnable: shared
//! context and query text on every command, storage/header/date column on
//! the source, lookup handlers on every `lookup`, the result sink at the
//! tail, and the timeline flag on exactly one streaming command.

use std::sync::Arc;

use logq_commands::command::{append, chain, AsAny};
use logq_commands::commands::{Fields, Lookup, OptionCmd, Rename, Table};
use logq_commands::{for_each_command, Command, QueryContext};
use logq_core::catalog::{LogStorage, LookupService, TableRegistry};
use logq_parser::SyntaxRegistry;

use crate::error::ExecError;
use crate::sink::ResultSink;

/// Compile `query_text` and bind the resulting chain. Any failure drops the
/// partially built chain.
pub fn create_command(
    ctx: Arc<QueryContext>,
    query_text: &str,
    storage: Arc<dyn LogStorage>,
    tables: &dyn TableRegistry,
    lookups: &dyn LookupService,
    sink: ResultSink,
) -> Result<Box<dyn Command>, ExecError> {
    let mut head = SyntaxRegistry::global().compile(query_text)?;
    let text: Arc<str> = Arc::from(query_text);

    if let Some(table) = head.downcast_mut::<Table>() {
        table.set_storage(storage);
        table.set_batch_size(ctx.config().batch_size);
        let name = table.table_name().to_string();
        let id = tables
            .table_id(&name)
            .ok_or_else(|| ExecError::UnknownTable(name.clone()))?;
        let metadata = tables
            .table_metadata(id)
            .ok_or_else(|| ExecError::Metadata(name.clone()))?;
        table.set_table_id(id);
        if let Some(header) = metadata.header() {
            tracing::debug!(table = %name, fields = header.len(), "header from logformat");
            head.set_header(Some(header));
        }
    }
    head.set_date_column(Some(ctx.config().date_column.clone()));

    let mut bound = Ok(());
    for_each_command(head.as_mut(), &mut |cmd| {
        if bound.is_err() {
            return;
        }
        if let Some(lookup) = cmd.downcast_mut::<Lookup>() {
            bound = lookup.bind(lookups);
        }
    });
    bound?;

    let timeline_enabled = chain_allows_timeline(head.as_ref());
    let reporter = timeline_index(head.as_ref(), &ctx.config().date_column);
    append(head.as_mut(), Box::new(sink));

    let mut index = 0;
    for_each_command(head.as_mut(), &mut |cmd| {
        let core = cmd.core_mut();
        core.set_context(Arc::clone(&ctx));
        core.set_query_text(Arc::clone(&text));
        if timeline_enabled && Some(index) == reporter {
            core.set_callback_timeline(true);
        }
        index += 1;
    });
    ctx.set_head(head.core().status_handle());

    tracing::debug!(
        query = %ctx.id(),
        commands = index,
        timeline = ?reporter.filter(|_| timeline_enabled),
        "query bound"
    );
    Ok(head)
}

/// False when an `option timeline=false` stage is present.
fn chain_allows_timeline(head: &dyn Command) -> bool {
    chain(head)
        .into_iter()
        .filter_map(|c| c.as_any().downcast_ref::<OptionCmd>())
        .all(OptionCmd::timeline)
}

/// Index of the command that reports event times: the last command whose
/// output still carries `date_column`, stopping before the first reducer.
/// `None` when the chain starts with a reducer.
fn timeline_index(head: &dyn Command, date_column: &str) -> Option<usize> {
    let cmds = chain(head);
    match cmds
        .iter()
        .position(|c| c.is_reducer() || drops_column(*c, date_column))
    {
        Some(0) => None,
        Some(stop) => Some(stop - 1),
        None => cmds.len().checked_sub(1),
    }
}

/// True when rows written by `cmd` no longer carry `column`.
fn drops_column(cmd: &dyn Command, column: &str) -> bool {
    let any = cmd.as_any();
    if let Some(fields) = any.downcast_ref::<Fields>() {
        let listed = fields.names().iter().any(|n| n == column);
        return if fields.is_remove() { listed } else { !listed };
    }
    any.downcast_ref::<Rename>()
        .is_some_and(|r| r.renames().iter().any(|(from, _)| from == column))
}

#[cfg(test)]
mod tests {
    use super::*;
    use logq_commands::CommandError;
    use logq_core::catalog::{TableMetadata, LOGFORMAT_KEY};
    use logq_io::{CsvLookupTable, LookupTables, MemoryLogStorage, TableCatalog};

    use crate::sink::CollectRows;

    struct Env {
        storage: Arc<dyn LogStorage>,
        catalog: TableCatalog,
        lookups: LookupTables,
    }

    fn env() -> Env {
        let users = CsvLookupTable::from_reader("uid,name\n1,alice\n".as_bytes()).unwrap();
        Env {
            storage: Arc::new(MemoryLogStorage::new().with_table("events", ["1 u1", "2 u2"])),
            catalog: TableCatalog::new()
                .with_table("events", TableMetadata::new().with(LOGFORMAT_KEY, "_time uid"))
                .with_table("bare", TableMetadata::new()),
            lookups: LookupTables::new().with("users", Arc::new(users)),
        }
    }

    fn bind(env: &Env, text: &str) -> Result<Box<dyn Command>, ExecError> {
        create_command(
            Arc::new(QueryContext::in_memory()),
            text,
            Arc::clone(&env.storage),
            &env.catalog,
            &env.lookups,
            ResultSink::new(Box::new(CollectRows::new())),
        )
    }

    fn flags(head: &dyn Command) -> Vec<(&'static str, bool)> {
        chain(head)
            .iter()
            .map(|c| (c.name(), c.core().callback_timeline()))
            .collect()
    }

    #[test]
    fn header_and_date_column_reach_the_sink() {
        let env = env();
        let head = bind(&env, "table events | search uid == u1").unwrap();
        let cmds = chain(head.as_ref());
        assert_eq!(cmds.len(), 3);
        for cmd in &cmds {
            assert_eq!(cmd.core().header().map(|h| h.len()), Some(2));
            assert_eq!(cmd.date_column_name(), Some("_time"));
            assert!(cmd.core().context().is_some());
            assert_eq!(cmd.core().query_text(), Some("table events | search uid == u1"));
        }
        assert_eq!(cmds[2].name(), "sink");
    }

    #[test]
    fn timeline_goes_before_first_reducer() {
        let env = env();
        let head = bind(&env, "table events | search uid == u1 | sort uid | fields uid").unwrap();
        assert_eq!(
            flags(head.as_ref()),
            vec![
                ("table", false),
                ("search", true),
                ("sort", false),
                ("fields", false),
                ("sink", false)
            ]
        );
        let cmds = chain(head.as_ref());
        assert_eq!(cmds[2].date_column_name(), None);
        assert_eq!(cmds[3].core().date_column(), None);
    }

    #[test]
    fn timeline_on_last_command_without_reducer() {
        let env = env();
        let head = bind(&env, "table events | fields _time, uid").unwrap();
        assert_eq!(
            flags(head.as_ref()),
            vec![("table", false), ("fields", true), ("sink", false)]
        );
        let head = bind(&env, "table events | option timeline=false | fields uid").unwrap();
        assert!(flags(head.as_ref()).iter().all(|(_, on)| !on));
    }

    #[test]
    fn timeline_stays_ahead_of_stages_dropping_the_date_column() {
        let env = env();
        let head = bind(&env, "table events | fields uid").unwrap();
        assert_eq!(
            flags(head.as_ref()),
            vec![("table", true), ("fields", false), ("sink", false)]
        );
        let head = bind(&env, "table events | search uid == u1 | fields - _time").unwrap();
        assert_eq!(
            flags(head.as_ref()),
            vec![("table", false), ("search", true), ("fields", false), ("sink", false)]
        );
        let head = bind(&env, "table events | rename _time as at | search uid == u1").unwrap();
        assert_eq!(
            flags(head.as_ref()),
            vec![("table", true), ("rename", false), ("search", false), ("sink", false)]
        );
    }

    #[test]
    fn unknown_table_and_missing_lookup() {
        let env = env();
        assert!(matches!(bind(&env, "table nope"), Err(ExecError::UnknownTable(t)) if t == "nope"));
        assert!(matches!(bind(&env, "table events |"), Err(ExecError::Syntax(_))));
        assert!(matches!(
            bind(&env, "table events | lookup teams uid output team"),
            Err(ExecError::Command(CommandError::Exec(_)))
        ));
    }

    #[test]
    fn every_lookup_is_bound() {
        let env = env();
        let head = bind(
            &env,
            "table events | lookup users uid output name | lookup users uid output name as again",
        )
        .unwrap();
        let bound: Vec<bool> = chain(head.as_ref())
            .into_iter()
            .filter_map(|c| c.as_any().downcast_ref::<Lookup>())
            .map(Lookup::is_bound)
            .collect();
        assert_eq!(bound, vec![true, true]);
    }

    #[test]
    fn table_without_logformat_has_no_header() {
        let env = env();
        let head = bind(&env, "table bare").unwrap();
        assert!(head.core().header().is_none());
    }
}
