//! Sloggo Sources
//!
//! Syslog ingest listeners.
//!
//! # Available Listeners
//!
//! - **UDP** - one or more messages per datagram, `\n`-separated
//! - **TCP** - newline-framed streams with a 1 MiB per-message cap
//!
//! # Design
//!
//! Both listeners hand each raw message to the shared dispatch path: trim,
//! parse under the configured format policy (`auto` / `rfc5424` /
//! `rfc3164`), enqueue on the batch writer. Parsing runs on short-lived
//! tasks bounded by a 100-permit semaphore; when no permit is available the
//! unit of work (datagram or connection) is dropped with a warning rather
//! than blocking the read loop.

pub mod common;
pub mod tcp;
pub mod udp;

mod error;

pub use common::{ListenerMetrics, ListenerMetricsSnapshot, MAX_INFLIGHT, READ_TIMEOUT};
pub use error::ListenerError;
pub use tcp::{TcpListenerConfig, TcpSyslogListener};
pub use udp::{UdpListenerConfig, UdpSyslogListener};

/// Result type for listener operations
pub type Result<T> = std::result::Result<T, ListenerError>;
