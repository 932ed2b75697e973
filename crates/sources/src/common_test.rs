//! Tests for the shared ingest path

use chrono::Utc;
use tempfile::TempDir;

use sloggo_config::FormatSelector;
use sloggo_protocol::LogFormat;
use sloggo_store::{BatchWriter, Direction, LogFilter, LogQuery, LogStore};

use crate::common::{ListenerMetrics, dispatch_message, split_messages};

async fn test_writer() -> (TempDir, LogStore, BatchWriter) {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(&dir.path().join("logs.db")).await.unwrap();
    let writer = BatchWriter::new(store.clone(), 10_000);
    (dir, store, writer)
}

async fn stored_count(store: &LogStore) -> i64 {
    store
        .query_logs(&LogQuery::new(
            LogFilter::new(),
            Utc::now(),
            Direction::Next,
            1,
        ))
        .await
        .unwrap()
        .total_count
}

#[test]
fn test_split_single_message() {
    let lines: Vec<&str> = split_messages("<13>1 - h a p m - one").collect();
    assert_eq!(lines, vec!["<13>1 - h a p m - one"]);
}

#[test]
fn test_split_multiple_messages() {
    let lines: Vec<&str> = split_messages("first\nsecond\nthird\n").collect();
    assert_eq!(lines, vec!["first", "second", "third"]);
}

#[test]
fn test_split_normalizes_crlf() {
    let lines: Vec<&str> = split_messages("first\r\nsecond\r\n").collect();
    assert_eq!(lines, vec!["first", "second"]);
}

#[test]
fn test_split_skips_empty_fragments() {
    let lines: Vec<&str> = split_messages("\n\nfirst\n \n\nsecond\n\n").collect();
    assert_eq!(lines, vec!["first", "second"]);
}

#[tokio::test]
async fn test_dispatch_parses_and_enqueues() {
    let (_dir, store, writer) = test_writer().await;
    let selector = FormatSelector::default();
    let metrics = ListenerMetrics::new();

    dispatch_message(
        "  <13>1 2023-10-01T12:34:56Z host app 1 2 - hello  ",
        &selector,
        &writer,
        &metrics,
    )
    .await;

    assert_eq!(metrics.snapshot().messages_stored, 1);
    assert_eq!(writer.pending_len(), 1);

    writer.flush().await.unwrap();
    assert_eq!(stored_count(&store).await, 1);
}

#[tokio::test]
async fn test_dispatch_drops_unparseable_line() {
    let (_dir, _store, writer) = test_writer().await;
    let selector = FormatSelector::default();
    let metrics = ListenerMetrics::new();

    dispatch_message("complete garbage", &selector, &writer, &metrics).await;

    assert_eq!(metrics.snapshot().parse_failures, 1);
    assert_eq!(metrics.snapshot().messages_stored, 0);
    assert_eq!(writer.pending_len(), 0);
}

#[tokio::test]
async fn test_dispatch_skips_empty_input() {
    let (_dir, _store, writer) = test_writer().await;
    let selector = FormatSelector::default();
    let metrics = ListenerMetrics::new();

    dispatch_message("   ", &selector, &writer, &metrics).await;

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.messages_stored, 0);
    assert_eq!(snapshot.parse_failures, 0);
}

#[tokio::test]
async fn test_dispatch_honors_format_policy() {
    let (_dir, _store, writer) = test_writer().await;
    let selector = FormatSelector::new(LogFormat::Rfc5424);
    let metrics = ListenerMetrics::new();

    // A 3164 line under a pinned 5424 policy is a parse failure
    dispatch_message(
        "<34>Oct 11 22:14:15 mymachine su: hello",
        &selector,
        &writer,
        &metrics,
    )
    .await;
    assert_eq!(metrics.snapshot().parse_failures, 1);

    // Switching the selector at runtime makes the same line parse
    selector.set(LogFormat::Rfc3164);
    dispatch_message(
        "<34>Oct 11 22:14:15 mymachine su: hello",
        &selector,
        &writer,
        &metrics,
    )
    .await;
    assert_eq!(metrics.snapshot().messages_stored, 1);
}
