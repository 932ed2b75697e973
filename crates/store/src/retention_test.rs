//! Tests for the retention reaper

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use sloggo_protocol::LogEntry;

use crate::query::{Direction, LogFilter, LogQuery};
use crate::retention::spawn_retention_task;
use crate::store::LogStore;

fn entry_at(age: chrono::Duration, message: &str) -> LogEntry {
    LogEntry {
        row_id: 0,
        facility: 1,
        severity: 6,
        version: 1,
        timestamp: Utc::now() - age,
        hostname: "host".to_string(),
        app_name: "app".to_string(),
        proc_id: "-".to_string(),
        msg_id: "-".to_string(),
        structured_data: "-".to_string(),
        message: message.to_string(),
    }
}

#[tokio::test]
async fn test_sweep_removes_expired_entries() {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(&dir.path().join("logs.db")).await.unwrap();

    // One entry two minutes old, one fresh; retention is one minute
    store
        .append_batch(&[
            entry_at(chrono::Duration::minutes(2), "expired"),
            entry_at(chrono::Duration::seconds(1), "fresh"),
        ])
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let handle = spawn_retention_task(store.clone(), 1, Duration::from_millis(20), cancel.clone());

    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();
    handle.await.unwrap();

    let page = store
        .query_logs(&LogQuery::new(
            LogFilter::new(),
            Utc::now(),
            Direction::Next,
            10,
        ))
        .await
        .unwrap();

    assert_eq!(page.total_count, 1);
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].message, "fresh");
}

#[tokio::test]
async fn test_first_sweep_waits_one_period() {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(&dir.path().join("logs.db")).await.unwrap();

    store
        .append_batch(&[entry_at(chrono::Duration::minutes(2), "expired")])
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let handle = spawn_retention_task(
        store.clone(),
        1,
        Duration::from_secs(3600),
        cancel.clone(),
    );

    // Long period: nothing reaped right after boot
    tokio::time::sleep(Duration::from_millis(100)).await;
    let page = store
        .query_logs(&LogQuery::new(
            LogFilter::new(),
            Utc::now(),
            Direction::Next,
            10,
        ))
        .await
        .unwrap();
    assert_eq!(page.total_count, 1);

    cancel.cancel();
    handle.await.unwrap();
}
