//! End-to-end pipeline runs against the in-memory store.

use connectors::memory::MemoryStore;
use engine::error::{PipelineError, WorkerError};
use engine::pipeline::Pipeline;
use engine::retry::RetryPolicy;
use engine::settings::{LoadSettings, ParseErrorPolicy};
use model::records::UserRecord;
use model::table::TableRef;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

fn users_table() -> TableRef {
    TableRef::new("p1", "d1", "users")
}

fn ndjson_file(rows: u64) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for id in 0..rows {
        writeln!(file, "{{\"id\":{id},\"name\":\"user-{id}\"}}").unwrap();
    }
    file
}

fn pipeline_for(
    file: &NamedTempFile,
    batch_len: usize,
    workers: usize,
    parse_errors: ParseErrorPolicy,
    store: &MemoryStore,
) -> Pipeline {
    let settings =
        LoadSettings::new(users_table(), file.path(), batch_len, workers, parse_errors).unwrap();
    // Keep injected-failure tests fast.
    let retry = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(1));
    Pipeline::new(settings, Arc::new(store.clone())).with_retry(retry)
}

#[tokio::test]
async fn ten_lines_two_workers_batch_four() {
    let file = ndjson_file(10);
    let store = MemoryStore::new();
    let pipeline = pipeline_for(&file, 4, 2, ParseErrorPolicy::Strict, &store);

    let summary = pipeline.run(CancellationToken::new()).await.unwrap();

    assert_eq!(summary.lines_read, 10);
    assert_eq!(summary.batches_emitted, 3);
    assert_eq!(summary.metrics.rows_loaded, 10);
    assert_eq!(summary.metrics.batches_loaded, 3);
    assert_eq!(summary.metrics.batches_dropped, 0);

    // Batch sizes are 4, 4, 2 in some interleaving across the two workers.
    let mut sizes: Vec<usize> = store.insert_calls().iter().map(Vec::len).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![2, 4, 4]);

    // Order within each batch is preserved: ids are consecutive ascending.
    for call in store.insert_calls() {
        for pair in call.windows(2) {
            assert_eq!(pair[1].id, pair[0].id + 1);
        }
    }

    // All ten records arrive, none duplicated or lost.
    let mut ids: Vec<i64> = store.rows().iter().map(|row| row.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..10).collect::<Vec<i64>>());
}

#[tokio::test]
async fn one_session_per_worker_opened_and_closed() {
    let file = ndjson_file(7);
    let store = MemoryStore::new();
    let pipeline = pipeline_for(&file, 2, 3, ParseErrorPolicy::Strict, &store);

    pipeline.run(CancellationToken::new()).await.unwrap();

    assert_eq!(store.sessions_opened(), 3);
    assert_eq!(store.sessions_closed(), 3);
}

#[tokio::test]
async fn single_worker_preserves_global_order() {
    let file = ndjson_file(9);
    let store = MemoryStore::new();
    let pipeline = pipeline_for(&file, 4, 1, ParseErrorPolicy::Strict, &store);

    pipeline.run(CancellationToken::new()).await.unwrap();

    let ids: Vec<i64> = store.rows().iter().map(|row| row.id).collect();
    assert_eq!(ids, (0..9).collect::<Vec<i64>>());
}

#[tokio::test]
async fn empty_input_exits_cleanly() {
    let file = ndjson_file(0);
    let store = MemoryStore::new();
    let pipeline = pipeline_for(&file, 4, 2, ParseErrorPolicy::Strict, &store);

    let summary = pipeline.run(CancellationToken::new()).await.unwrap();

    assert_eq!(summary.lines_read, 0);
    assert_eq!(summary.batches_emitted, 0);
    assert!(store.rows().is_empty());
    assert_eq!(store.sessions_opened(), 2);
    assert_eq!(store.sessions_closed(), 2);
}

#[tokio::test]
async fn existing_table_is_not_fatal() {
    let store = MemoryStore::new();

    let first = ndjson_file(2);
    pipeline_for(&first, 4, 1, ParseErrorPolicy::Strict, &store)
        .run(CancellationToken::new())
        .await
        .unwrap();

    // Second run hits the already-created table and still proceeds.
    let second = ndjson_file(3);
    pipeline_for(&second, 4, 1, ParseErrorPolicy::Strict, &store)
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(store.created_tables(), vec!["p1.d1.users".to_string()]);
    assert_eq!(store.rows().len(), 5);
}

#[tokio::test]
async fn record_round_trips_without_coercion() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{{\"id\": 7, \"name\": \"Ada\"}}").unwrap();
    let store = MemoryStore::new();
    let pipeline = pipeline_for(&file, 4, 1, ParseErrorPolicy::Strict, &store);

    pipeline.run(CancellationToken::new()).await.unwrap();

    assert_eq!(
        store.rows(),
        vec![UserRecord {
            id: 7,
            name: "Ada".to_string()
        }]
    );
}

#[tokio::test]
async fn malformed_line_aborts_strict_run() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{{\"id\":1,\"name\":\"aaa\"}}").unwrap();
    writeln!(file, "this is not json").unwrap();
    writeln!(file, "{{\"id\":3,\"name\":\"ccc\"}}").unwrap();

    let store = MemoryStore::new();
    let pipeline = pipeline_for(&file, 1, 1, ParseErrorPolicy::Strict, &store);

    let err = pipeline.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Worker(WorkerError::Parse { .. })
    ));
}

#[tokio::test]
async fn malformed_line_is_skipped_under_skip_policy() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{{\"id\":1,\"name\":\"aaa\"}}").unwrap();
    writeln!(file, "this is not json").unwrap();
    writeln!(file, "{{\"id\":3,\"name\":\"ccc\"}}").unwrap();

    let store = MemoryStore::new();
    let pipeline = pipeline_for(&file, 2, 1, ParseErrorPolicy::Skip, &store);

    let summary = pipeline.run(CancellationToken::new()).await.unwrap();

    assert_eq!(summary.metrics.parse_skips, 1);
    assert_eq!(summary.metrics.rows_loaded, 2);
    let ids: Vec<i64> = store.rows().iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn missing_input_file_is_fatal() {
    let store = MemoryStore::new();
    let settings = LoadSettings::new(
        users_table(),
        "/no/such/input.txt",
        4,
        2,
        ParseErrorPolicy::Strict,
    )
    .unwrap();
    let pipeline = Pipeline::new(settings, Arc::new(store));

    let err = pipeline.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Source(_)));
}

#[tokio::test]
async fn transient_store_failure_is_retried() {
    let file = ndjson_file(4);
    let store = MemoryStore::new();
    store.fail_next_inserts(1);
    let pipeline = pipeline_for(&file, 4, 1, ParseErrorPolicy::Strict, &store);

    let summary = pipeline.run(CancellationToken::new()).await.unwrap();

    assert_eq!(summary.metrics.rows_loaded, 4);
    assert_eq!(summary.metrics.batches_dropped, 0);
    assert!(summary.metrics.transient_errors >= 1);
}

#[tokio::test]
async fn exhausted_retries_drop_the_batch_but_not_the_run() {
    let file = ndjson_file(6);
    let store = MemoryStore::new();
    store.fail_next_inserts(usize::MAX);
    let pipeline = pipeline_for(&file, 3, 2, ParseErrorPolicy::Strict, &store);

    let summary = pipeline.run(CancellationToken::new()).await.unwrap();

    assert_eq!(summary.lines_read, 6);
    assert_eq!(summary.metrics.rows_loaded, 0);
    assert_eq!(summary.metrics.batches_dropped, 2);
    assert_eq!(summary.metrics.rows_dropped, 6);
    assert!(store.rows().is_empty());
    // Sessions still close cleanly on the failure path.
    assert_eq!(store.sessions_opened(), 2);
    assert_eq!(store.sessions_closed(), 2);
}

#[tokio::test]
async fn cancelled_run_reports_cancellation() {
    let file = ndjson_file(100);
    let store = MemoryStore::new();
    let pipeline = pipeline_for(&file, 4, 2, ParseErrorPolicy::Strict, &store);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = pipeline.run(cancel).await.unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled));
}
