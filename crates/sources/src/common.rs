//! Shared ingest plumbing: message splitting, parse dispatch, counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sloggo_config::FormatSelector;
use sloggo_protocol::parse_message;
use sloggo_store::BatchWriter;

/// Concurrent parse units per listener (datagrams in flight for UDP,
/// open connections for TCP). Work beyond this bound is rejected.
pub const MAX_INFLIGHT: usize = 100;

/// Read deadline for both listeners. On UDP the deadline only exists to
/// re-check shutdown; on TCP it is rolling and resets after each timeout.
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Split raw ingest text into individual syslog messages.
///
/// Datagrams may carry several `\n`-separated messages; `\r\n` endings are
/// normalized and empty fragments skipped.
pub fn split_messages(data: &str) -> impl Iterator<Item = &str> {
    data.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
}

/// Parse one raw message under the current format policy and enqueue it.
///
/// Failures never propagate: an unparseable line is logged (with the last
/// parser's error) and dropped, a writer error is logged and dropped.
pub async fn dispatch_message(
    raw: &str,
    selector: &FormatSelector,
    writer: &BatchWriter,
    metrics: &ListenerMetrics,
) {
    let line = raw.trim();
    if line.is_empty() {
        return;
    }

    match parse_message(line, selector.get()) {
        Ok(entry) => {
            if let Err(e) = writer.store(entry).await {
                metrics.store_failure();
                tracing::error!(error = %e, "failed to enqueue log entry");
            } else {
                metrics.message_stored();
            }
        }
        Err(e) => {
            metrics.parse_failure();
            tracing::warn!(error = %e, line, "failed to parse log message");
        }
    }
}

/// Per-listener ingest counters
#[derive(Debug, Default)]
pub struct ListenerMetrics {
    /// Datagrams (UDP) or lines (TCP) received
    pub units_received: AtomicU64,

    /// Bytes received
    pub bytes_received: AtomicU64,

    /// Messages parsed and enqueued
    pub messages_stored: AtomicU64,

    /// Messages rejected by every enabled parser
    pub parse_failures: AtomicU64,

    /// Enqueue failures (batch writer errors)
    pub store_failures: AtomicU64,

    /// Units dropped under backpressure (no permit) or over the size cap
    pub rejected: AtomicU64,
}

impl ListenerMetrics {
    pub const fn new() -> Self {
        Self {
            units_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            messages_stored: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn unit_received(&self, bytes: u64) {
        self.units_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn message_stored(&self) {
        self.messages_stored.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ListenerMetricsSnapshot {
        ListenerMetricsSnapshot {
            units_received: self.units_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            messages_stored: self.messages_stored.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ListenerMetrics`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ListenerMetricsSnapshot {
    pub units_received: u64,
    pub bytes_received: u64,
    pub messages_stored: u64,
    pub parse_failures: u64,
    pub store_failures: u64,
    pub rejected: u64,
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;
