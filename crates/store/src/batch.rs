//! Batched log writer
//!
//! Amortizes the per-row cost of the store, which is optimized for batched
//! appends. Entries accumulate in a mutex-protected vector; a flush swaps
//! the vector out under the lock and performs I/O afterwards, so producers
//! never wait on the database.
//!
//! Flush triggers:
//!
//! - **size** - reaching the maximum batch size flushes inline from the
//!   producing task (transient backpressure on the parser, never on the
//!   listener read loop)
//! - **time** - a periodic task flushes partial batches
//!
//! A failed flush aborts its whole batch; those entries are lost
//! (at-most-once per batch). Within a batch, submission order is preserved.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use sloggo_protocol::LogEntry;

use crate::Result;
use crate::store::LogStore;

/// Entries buffered before a size-triggered flush
pub const DEFAULT_MAX_BATCH: usize = 10_000;

/// Period of the time-triggered flush task
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Handle to the shared batch queue; cheap to clone
#[derive(Debug, Clone)]
pub struct BatchWriter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    store: LogStore,
    pending: Mutex<Vec<LogEntry>>,
    max_batch: usize,
    /// Serializes flushes; producers keep enqueueing meanwhile
    flush_gate: tokio::sync::Mutex<()>,
}

impl BatchWriter {
    /// Create a writer over `store` with the given size trigger
    pub fn new(store: LogStore, max_batch: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                pending: Mutex::new(Vec::with_capacity(max_batch)),
                max_batch,
                flush_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Enqueue one entry; flushes inline when the queue reaches capacity
    pub async fn store(&self, entry: LogEntry) -> Result<()> {
        let full = {
            let mut pending = self.lock_pending();
            pending.push(entry);
            pending.len() >= self.inner.max_batch
        };

        if full {
            self.flush().await?;
        }
        Ok(())
    }

    /// Flush all pending entries in one transaction; returns the count
    /// written. A no-op when the queue is empty.
    pub async fn flush(&self) -> Result<usize> {
        let _gate = self.inner.flush_gate.lock().await;

        let batch = {
            let mut pending = self.lock_pending();
            if pending.is_empty() {
                return Ok(0);
            }
            std::mem::replace(&mut *pending, Vec::with_capacity(self.inner.max_batch))
        };

        let count = batch.len();
        if let Err(e) = self.inner.store.append_batch(&batch).await {
            tracing::error!(error = %e, lost = count, "batch flush failed, entries dropped");
            return Err(e);
        }
        Ok(count)
    }

    /// Entries currently queued
    pub fn pending_len(&self) -> usize {
        self.lock_pending().len()
    }

    /// Spawn the periodic flush task. Flush errors are logged and the task
    /// keeps running; a final flush happens on cancellation.
    pub fn spawn_flush_task(
        &self,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let writer = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = writer.flush().await {
                            tracing::warn!(error = %e, "periodic batch flush failed");
                        }
                    }
                }
            }

            if let Err(e) = writer.flush().await {
                tracing::warn!(error = %e, "final batch flush failed");
            }
        })
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Vec<LogEntry>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;
