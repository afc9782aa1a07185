mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{FakeSource, Rng};
use pgcompare::{FetchError, FetchJoin, FetchKind, Progress, TableInfo};

fn source() -> FakeSource {
    FakeSource::new("prod")
        .table("users", &["id", "email"])
        .table("orders", &["id", "user_id", "total"])
        .routine("calc_total", "RETURNS int AS $$ SELECT 1 $$")
}

fn destination() -> FakeSource {
    FakeSource::new("staging")
        .table("orders", &["id", "user_id"])
        .table("products", &["id"])
        .routine("calc_tax", "RETURNS int AS $$ SELECT 2 $$")
}

fn table_names(tables: &[TableInfo]) -> Vec<&str> {
    tables.iter().map(|t| t.table_name.as_str()).collect()
}

#[tokio::test]
async fn aggregates_all_four_results() {
    let left = source().into_instance();
    let right = destination().into_instance();

    let fetched = FetchJoin::default().run(&left, &right).await.unwrap();

    let (prod, staging) = (&fetched.source, &fetched.destination);
    assert_eq!(table_names(&prod.tables), vec!["users", "orders"]);
    assert_eq!(table_names(&staging.tables), vec!["orders", "products"]);
    assert_eq!(prod.tables[1].columns.len(), 3);
    assert_eq!(staging.tables[0].columns.len(), 2);
    assert_eq!(
        prod.routines[0].full_name.as_deref(),
        Some("calc_total(int")
    );
    assert_eq!(
        staging.routines[0].full_name.as_deref(),
        Some("calc_tax(int")
    );
}

#[tokio::test]
async fn emits_progress_for_every_phase() {
    let (progress, mut rx) = Progress::channel();
    let left = source().into_instance();
    let right = destination().into_instance();
    let join = FetchJoin::new(progress);
    join.run(&left, &right).await.unwrap();
    drop(join);

    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    for expected in [
        "loading schema: prod",
        "loading schema: staging",
        "loading routines: prod",
        "loading routines: staging",
        "getting ddl for: calc_total",
        "getting ddl for: calc_tax",
    ] {
        assert!(
            messages.iter().any(|m| m == expected),
            "missing {expected:?} in {messages:?}"
        );
    }
}

#[tokio::test]
async fn first_failure_is_returned_and_late_results_are_ignored() {
    let finished = Arc::new(AtomicUsize::new(0));

    let mut failing = destination();
    failing.fail_routines = true;
    failing.finished = finished.clone();
    let mut slow = source();
    slow.table_delay = Duration::from_millis(150);
    slow.routine_delay = Duration::from_millis(150);
    slow.finished = finished.clone();

    let failure = FetchJoin::default()
        .run(&slow.into_instance(), &failing.into_instance())
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FetchKind::DestinationRoutines);
    assert_eq!(failure.instance, "staging");
    assert!(matches!(failure.source, FetchError::Query { .. }));
    // The slow source fetches were still running when the join gave up.
    assert!(finished.load(Ordering::SeqCst) < 4);

    // Let them complete; nothing is listening any more.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn connection_failures_keep_their_kind() {
    let mut unreachable = source();
    unreachable.fail_tables = true;
    unreachable.fail_connect = true;

    let failure = FetchJoin::default()
        .run(&unreachable.into_instance(), &destination().into_instance())
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FetchKind::SourceTables);
    assert!(failure.source.is_connection());
    assert!(failure.to_string().contains("prod"));
}

#[tokio::test]
async fn slow_fetch_times_out() {
    let mut slow = destination();
    slow.table_delay = Duration::from_secs(5);

    let failure = FetchJoin::default()
        .with_timeout(Duration::from_millis(50))
        .run(&source().into_instance(), &slow.into_instance())
        .await
        .unwrap_err();

    assert_eq!(failure.kind, FetchKind::DestinationTables);
    assert!(matches!(failure.source, FetchError::Timeout { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_failure_in_random_order_completes_once() {
    let completions = Arc::new(AtomicUsize::new(0));

    for trial in 0..100u64 {
        let mut rng = Rng::new(trial);
        let mut left = source();
        let mut right = destination();
        left.table_delay = rng.delay(5);
        left.routine_delay = rng.delay(5);
        right.table_delay = rng.delay(5);
        right.routine_delay = rng.delay(5);

        let failing = FetchKind::ALL[rng.below(4)];
        match failing {
            FetchKind::SourceTables => left.fail_tables = true,
            FetchKind::SourceRoutines => left.fail_routines = true,
            FetchKind::DestinationTables => right.fail_tables = true,
            FetchKind::DestinationRoutines => right.fail_routines = true,
        }

        let result = FetchJoin::default()
            .run(&left.into_instance(), &right.into_instance())
            .await;
        completions.fetch_add(1, Ordering::SeqCst);

        let failure = result.expect_err("one fetch was set up to fail");
        assert_eq!(failure.kind, failing, "trial {trial}");
    }

    assert_eq!(completions.load(Ordering::SeqCst), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_never_lose_or_duplicate_results() {
    let mut handles = Vec::new();

    for trial in 0..200u64 {
        handles.push(tokio::spawn(async move {
            let mut rng = Rng::new(trial);
            let left_name = format!("left{trial}");
            let right_name = format!("right{trial}");

            let mut left = FakeSource::new(&left_name)
                .table(&format!("t{trial}_a"), &["id"])
                .routine(&format!("r{trial}"), "RETURNS int");
            let mut right = FakeSource::new(&right_name)
                .table(&format!("t{trial}_b"), &["id"])
                .table(&format!("t{trial}_c"), &["id"]);
            left.table_delay = rng.delay(3);
            left.routine_delay = rng.delay(3);
            right.table_delay = rng.delay(3);
            right.routine_delay = rng.delay(3);

            let fetched = FetchJoin::default()
                .run(&left.into_instance(), &right.into_instance())
                .await
                .unwrap();

            assert_eq!(fetched.source.tables.len(), 1);
            assert_eq!(fetched.source.tables[0].table_name, format!("t{trial}_a"));
            assert_eq!(fetched.source.routines.len(), 1);
            assert_eq!(fetched.destination.tables.len(), 2);
            assert_eq!(
                fetched.destination.tables[1].table_name,
                format!("t{trial}_c")
            );
            assert!(fetched.destination.routines.is_empty());
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}
