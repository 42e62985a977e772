//! End-to-end query tests: parse, bind, run, collect.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{config, events, int_field, run, service, str_field};
use logq_commands::Status;
use logq_core::row::Row;
use logq_core::value::Value;
use logq_exec::{CollectRows, ExecError, RowConsumer};

/// Collects rows and counts how often the sink finished.
#[derive(Clone, Default)]
struct CountingRows {
    rows: CollectRows,
    finishes: Arc<AtomicUsize>,
}

impl RowConsumer for CountingRows {
    fn consume(&mut self, row: Row) -> logq_commands::Result<()> {
        self.rows.consume(row)
    }

    fn finish(&mut self) -> logq_commands::Result<()> {
        self.finishes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn project_and_rename() {
    let svc = service(config("memory://pipeline"), events(3));
    let consumer = CountingRows::default();
    let query = svc
        .prepare(
            "table events | fields _time, user | rename user as actor",
            Box::new(consumer.clone()),
        )
        .unwrap();
    let running = svc.spawn(query).unwrap();
    let handle = running.handle().clone();
    let report = running.join().unwrap();

    let rows = consumer.rows.rows();
    assert_eq!(rows.len(), 3);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.len(), 2);
        assert_eq!(int_field(row, "_time"), Some(i as i64 * 1_000));
        assert!(row.get("user").is_none());
        assert!(row.raw().is_none());
    }
    assert_eq!(str_field(&rows[1], "actor").as_deref(), Some("bob"));

    let names: Vec<&str> = report.commands.iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["table", "fields", "rename", "sink"]);
    for stage in &report.commands[..3] {
        assert_eq!(stage.pushed, 3, "{}", stage.name);
    }
    assert!(handle.commands().iter().all(|c| c.status == Status::End));
    assert!(handle.is_finished());
    assert_eq!(consumer.finishes.load(Ordering::SeqCst), 1);
}

#[test]
fn rename_without_projection_hides_the_old_name() {
    let svc = service(config("memory://pipeline"), events(3));
    let (rows, _) = run(&svc, "table events | rename user as actor");

    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert!(row.get("user").is_none());
        assert!(row.get("actor").is_some());
        assert!(row.get("action").is_some());
    }
    assert_eq!(str_field(&rows[2], "actor").as_deref(), Some("carol"));

    let (rows, _) = run(&svc, "table events | rename user as actor | search user == alice");
    assert!(rows.is_empty());
}

#[test]
fn search_conditions_are_conjunctive() {
    let svc = service(config("memory://pipeline"), events(12));
    let (rows, report) = run(&svc, "table events | search user == alice and bytes >= 300");

    let bytes: Vec<i64> = rows.iter().filter_map(|r| int_field(r, "bytes")).collect();
    assert_eq!(bytes, vec![300, 600, 900]);
    assert_eq!(report.commands[0].pushed, 12);
    assert_eq!(report.commands[1].pushed, 3);
}

#[test]
fn search_limit_stops_the_source_early() {
    let svc = service(config("memory://pipeline"), events(1_000));
    let (rows, report) = run(&svc, "table events | search limit=2 user == bob");

    assert_eq!(rows.len(), 2);
    // bob is records 1 and 4; nothing after the fifth record is read.
    assert_eq!(report.commands[0].name, "table");
    assert_eq!(report.commands[0].pushed, 5);
}

#[test]
fn table_offset_and_limit() {
    let svc = service(config("memory://pipeline"), events(10));
    let (rows, _) = run(&svc, "table offset=2 limit=3 events | fields _time");
    let times: Vec<i64> = rows.iter().filter_map(|r| int_field(r, "_time")).collect();
    assert_eq!(times, vec![2_000, 3_000, 4_000]);
}

#[test]
fn sort_with_limit_and_mixed_directions() {
    let svc = service(config("memory://pipeline"), events(20));
    let (rows, _) = run(&svc, "table events | sort limit=3 -bytes, _time | fields bytes, _time");

    let got: Vec<(i64, i64)> = rows
        .iter()
        .map(|r| (int_field(r, "bytes").unwrap(), int_field(r, "_time").unwrap()))
        .collect();
    assert_eq!(got, vec![(900, 9_000), (900, 19_000), (800, 8_000)]);
}

#[test]
fn stats_by_user() {
    let svc = service(config("memory://pipeline"), events(6));
    let (rows, _) = run(
        &svc,
        "table events | stats count, sum(bytes) as total, max(bytes) by user",
    );

    let got: Vec<(String, i64, i64, i64)> = rows
        .iter()
        .map(|r| {
            (
                str_field(r, "user").unwrap(),
                int_field(r, "count").unwrap(),
                int_field(r, "total").unwrap(),
                int_field(r, "max(bytes)").unwrap(),
            )
        })
        .collect();
    assert_eq!(
        got,
        vec![
            ("alice".to_string(), 2, 300, 300),
            ("bob".to_string(), 2, 500, 400),
            ("carol".to_string(), 2, 700, 500),
        ]
    );
}

#[test]
fn stats_over_empty_table_emits_one_row() {
    let svc = service(config("memory://pipeline"), Vec::new());
    let (rows, _) = run(&svc, "table events | stats count");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("count"), Some(&Value::Int(0)));
}

#[test]
fn timechart_buckets_by_span() {
    let svc = service(config("memory://pipeline"), events(10));
    let (rows, _) = run(&svc, "table events | timechart span=5s count by user");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("_time"), Some(&Value::Int(0)));
    assert_eq!(rows[1].get("_time"), Some(&Value::Int(5_000)));
    let counts = |i: usize| {
        ["alice", "bob", "carol"]
            .iter()
            .map(|u| int_field(&rows[i], u).unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(counts(0), vec![2, 2, 1]);
    assert_eq!(counts(1), vec![2, 1, 2]);
}

#[test]
fn lookup_enriches_known_keys() {
    let svc = service(config("memory://pipeline"), events(3));
    let (rows, _) = run(
        &svc,
        "table events | lookup teams user output team, floor as level | fields user, team, level",
    );

    assert_eq!(str_field(&rows[0], "team").as_deref(), Some("infra"));
    assert_eq!(str_field(&rows[0], "level").as_deref(), Some("3"));
    assert_eq!(str_field(&rows[1], "team").as_deref(), Some("web"));
    // carol has no entry: only her own field survives
    assert_eq!(rows[2].len(), 1);
}

#[test]
fn scalar_functions() {
    let svc = service(config("memory://pipeline"), events(1));
    let (rows, _) = run(
        &svc,
        "table events | function upper(user) as who | function substr(action, 0, 3) as act | fields who, act",
    );
    assert_eq!(str_field(&rows[0], "who").as_deref(), Some("ALICE"));
    assert_eq!(str_field(&rows[0], "act").as_deref(), Some("log"));
}

#[test]
fn drop_discards_everything() {
    let svc = service(config("memory://pipeline"), events(50));
    let (rows, report) = run(&svc, "table events | drop");
    assert!(rows.is_empty());
    assert_eq!(report.commands[0].pushed, 50);
}

#[test]
fn results_do_not_depend_on_batching() {
    let query = "table events | search action != read | fields _time, user";
    let mut batched = config("memory://pipeline");
    batched.batch_size = 16;
    let (plain, _) = run(&service(config("memory://pipeline"), events(100)), query);
    let (chunked, _) = run(&service(batched, events(100)), query);
    assert_eq!(plain.len(), 75);
    assert_eq!(plain, chunked);
}

#[test]
fn syntax_errors_point_at_the_stage() {
    let svc = service(config("memory://pipeline"), events(1));
    let err = svc
        .run("table events | sort", Box::new(logq_exec::CollectRows::new()))
        .unwrap_err();
    match err {
        ExecError::Syntax(e) => {
            assert!(e.position >= 15, "position {}", e.position);
            assert!(e.pointer().starts_with("table events | sort\n"));
        }
        other => panic!("unexpected {other:?}"),
    }
}
