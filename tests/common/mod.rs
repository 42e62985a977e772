//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use logq_core::catalog::LOGFORMAT_KEY;
use logq_core::prelude::*;
use logq_exec::{CollectRows, QueryReport, QueryService};
use logq_io::{CsvLookupTable, LookupTables, MemoryLogStorage, TableCatalog};

pub const EVENTS_FORMAT: &str = "_time user action bytes";

/// `n` access records, one second apart, cycling through three users.
pub fn events(n: usize) -> Vec<String> {
    let users = ["alice", "bob", "carol"];
    let actions = ["login", "read", "write", "logout"];
    (0..n)
        .map(|i| {
            format!(
                "{} {} {} {}",
                i as i64 * 1_000,
                users[i % users.len()],
                actions[i % actions.len()],
                (i % 10) * 100
            )
        })
        .collect()
}

pub fn config(spill_dir: &str) -> EngineConfig {
    EngineConfig {
        spill_dir: spill_dir.to_string(),
        ..EngineConfig::default()
    }
}

/// Service over an in-memory `events` table plus a `teams` lookup.
pub fn service(config: EngineConfig, records: Vec<String>) -> QueryService {
    let teams = CsvLookupTable::from_reader(
        "user,team,floor\nalice,infra,3\nbob,web,2\n".as_bytes(),
    )
    .expect("teams csv");
    QueryService::new(
        config,
        Arc::new(MemoryLogStorage::new().with_table("events", records)),
        Arc::new(
            TableCatalog::new()
                .with_table("events", TableMetadata::new().with(LOGFORMAT_KEY, EVENTS_FORMAT)),
        ),
        Arc::new(LookupTables::new().with("teams", Arc::new(teams))),
    )
}

pub fn run(svc: &QueryService, query: &str) -> (Vec<Row>, QueryReport) {
    let rows = CollectRows::new();
    let report = svc
        .run(query, Box::new(rows.clone()))
        .unwrap_or_else(|e| panic!("query `{query}` failed: {e}"));
    (rows.rows(), report)
}

pub fn str_field(row: &Row, field: &str) -> Option<String> {
    row.get(field).map(Value::to_string)
}

pub fn int_field(row: &Row, field: &str) -> Option<i64> {
    row.get(field).and_then(Value::as_i64)
}
