use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use logq_core::catalog::{TableMetadata, LOGFORMAT_KEY};
use logq_core::config::EngineConfig;
use logq_core::row::{header_from_logformat, Row};
use logq_exec::{CollectRows, QueryService};
use logq_io::{LookupTables, MemoryLogStorage, TableCatalog};

const FORMAT: &str = "_time host status bytes method path agent referer latency region \
                      zone pod node cluster trace span user session device build";

fn record(i: usize) -> String {
    format!(
        "{} web-{} {} {} GET /api/v1/items/{} curl - {} eu-west-1 a pod-{} node-{} prod \
         t{} s{} u{} sess{} d{} b{}",
        i * 1_000,
        i % 8,
        if i % 17 == 0 { 500 } else { 200 },
        i % 4096,
        i,
        i % 250,
        i % 32,
        i % 6,
        i,
        i,
        i % 100,
        i % 50,
        i % 3,
        i % 2
    )
}

fn bench_resolve(c: &mut Criterion) {
    let header = header_from_logformat(FORMAT);
    let raw = record(42);

    c.bench_function("resolve_last_field", |b| {
        b.iter(|| {
            let mut row = Row::from_raw(raw.clone());
            black_box(row.resolve(Some(&header[..]), "build").cloned())
        })
    });

    c.bench_function("resolve_cached_field", |b| {
        let mut row = Row::from_raw(raw.clone());
        row.resolve(Some(&header[..]), "build");
        b.iter(|| black_box(row.resolve(Some(&header[..]), "build").cloned()))
    });
}

fn bench_query(c: &mut Criterion) {
    let records: Vec<String> = (0..10_000).map(record).collect();
    let svc = QueryService::new(
        EngineConfig {
            spill_dir: "memory://bench".into(),
            ..EngineConfig::default()
        },
        Arc::new(MemoryLogStorage::new().with_table("access", records)),
        Arc::new(
            TableCatalog::new().with_table("access", TableMetadata::new().with(LOGFORMAT_KEY, FORMAT)),
        ),
        Arc::new(LookupTables::new()),
    );

    c.bench_function("search_stats_10k", |b| {
        b.iter(|| {
            let rows = CollectRows::new();
            svc.run(
                "table access | search status >= 500 | stats count, avg(latency) by host",
                Box::new(rows.clone()),
            )
            .unwrap();
            black_box(rows.len())
        })
    });
}

criterion_group!(benches, bench_resolve, bench_query);
criterion_main!(benches);
