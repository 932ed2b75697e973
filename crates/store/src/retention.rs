//! Retention reaper
//!
//! A slow periodic task deleting entries older than the retention window.
//! The cutoff is recomputed on every tick; errors are logged and never stop
//! the task. The first sweep runs one period after startup.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::store::LogStore;

/// Default sweep period: 30 minutes
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Spawn the reaper task
pub fn spawn_retention_task(
    store: LogStore,
    retention_minutes: i64,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The interval fires immediately; consume that tick so the first
        // sweep happens one full period after boot.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let cutoff = Utc::now() - chrono::Duration::minutes(retention_minutes);
                    match store.delete_before(cutoff).await {
                        Ok(0) => {}
                        Ok(deleted) => {
                            tracing::info!(deleted, cutoff = %cutoff, "retention sweep removed old entries");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "retention sweep failed");
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "retention_test.rs"]
mod retention_test;
