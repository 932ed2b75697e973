//! Syslog TCP listener
//!
//! Accepts connections and reads newline-framed syslog messages.
//!
//! # Framing
//!
//! Non-transparent framing: each message ends with LF or CRLF, at most
//! 1 MiB per message. Longer messages are discarded at the boundary with a
//! log line; the connection stays up.
//!
//! # Design
//!
//! - per-connection concurrency bounded by the same 100-permit semaphore
//!   policy as UDP; an accepted connection that gets no permit is closed
//!   immediately
//! - a rolling 30 s read deadline; on timeout the deadline resets and
//!   scanning resumes. Permanent errors (EOF, reset) close the connection
//! - TCP keepalive with a 30 s probe period where the socket supports it

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use sloggo_config::FormatSelector;
use sloggo_store::BatchWriter;

use crate::Result;
use crate::common::{ListenerMetrics, MAX_INFLIGHT, READ_TIMEOUT, dispatch_message};
use crate::error::ListenerError;

/// Default TCP syslog port
const DEFAULT_PORT: u16 = 6514;

/// Maximum framed message length (1 MiB)
const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Buffered-reader capacity per connection
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Keepalive probe period
const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// TCP listener configuration
#[derive(Debug, Clone)]
pub struct TcpListenerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Maximum framed message length; longer lines are discarded
    pub max_message_size: usize,

    /// Read buffer size per connection
    pub buffer_size: usize,

    /// Rolling read deadline
    pub read_timeout: Duration,

    /// Concurrent connections before new accepts are closed
    pub max_connections: usize,

    /// Keepalive probe period
    pub keepalive_interval: Duration,
}

impl Default for TcpListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            read_timeout: READ_TIMEOUT,
            max_connections: MAX_INFLIGHT,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }
}

impl TcpListenerConfig {
    /// Create config with custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Syslog TCP listener
pub struct TcpSyslogListener {
    config: TcpListenerConfig,
    listener: TcpListener,
    writer: BatchWriter,
    selector: FormatSelector,
    metrics: Arc<ListenerMetrics>,
}

impl TcpSyslogListener {
    /// Bind the listening socket. Bind failures are fatal at boot, so this
    /// is separate from [`run`](Self::run).
    pub async fn bind(
        config: TcpListenerConfig,
        writer: BatchWriter,
        selector: FormatSelector,
    ) -> Result<Self> {
        let bind_addr = config.bind_address();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| ListenerError::Bind {
                address: bind_addr.clone(),
                source,
            })?;

        tracing::info!(address = %bind_addr, "TCP listener started");

        Ok(Self {
            config,
            listener,
            writer,
            selector,
            metrics: Arc::new(ListenerMetrics::new()),
        })
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<ListenerMetrics> {
        Arc::clone(&self.metrics)
    }

    /// The bound local address (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept loop; returns after cancellation
    pub async fn run(self, cancel: CancellationToken) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.dispatch_connection(stream, peer, &semaphore, &cancel),
                        Err(e) => {
                            tracing::warn!(error = %e, "TCP accept error");
                        }
                    }
                }
            }
        }

        tracing::info!("TCP listener stopped");
    }

    /// Hand an accepted connection to its own task, or close it when the
    /// listener is at capacity.
    fn dispatch_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        semaphore: &Arc<Semaphore>,
        cancel: &CancellationToken,
    ) {
        let permit = match Arc::clone(semaphore).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                self.metrics.rejected();
                tracing::warn!(
                    peer = %peer,
                    "TCP connection capacity reached, closing connection"
                );
                drop(stream);
                return;
            }
        };

        configure_socket(&stream, self.config.keepalive_interval);

        let handler = ConnectionHandler {
            config: self.config.clone(),
            writer: self.writer.clone(),
            selector: self.selector.clone(),
            metrics: Arc::clone(&self.metrics),
            peer,
            cancel: cancel.clone(),
        };

        tokio::spawn(async move {
            let _permit: OwnedSemaphorePermit = permit;
            if let Err(e) = handler.handle(stream).await {
                tracing::debug!(peer = %peer, error = %e, "TCP connection error");
            }
        });
    }
}

/// Enable keepalive where the socket supports it
fn configure_socket(stream: &TcpStream, keepalive_interval: Duration) {
    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new().with_time(keepalive_interval);
    if let Err(e) = sock.set_tcp_keepalive(&keepalive) {
        tracing::warn!(error = %e, "failed to set TCP keepalive");
    }
}

/// Handles a single TCP connection
struct ConnectionHandler {
    config: TcpListenerConfig,
    writer: BatchWriter,
    selector: FormatSelector,
    metrics: Arc<ListenerMetrics>,
    peer: SocketAddr,
    cancel: CancellationToken,
}

impl ConnectionHandler {
    async fn handle(self, stream: TcpStream) -> io::Result<()> {
        let mut reader = BufReader::with_capacity(self.config.buffer_size, stream);

        // Scan buffer, reused across lines; never grows past the cap
        let mut line_buf: Vec<u8> = Vec::with_capacity(1024);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,

                result = timeout(
                    self.config.read_timeout,
                    read_bounded_line(&mut reader, &mut line_buf, self.config.max_message_size),
                ) => {
                    match result {
                        // Deadline reached: reset it and resume scanning.
                        // Partial-line bytes already in line_buf are kept.
                        Err(_) => continue,

                        Ok(Ok(ReadLine::Line(bytes))) => {
                            self.metrics.unit_received(bytes as u64);
                            let text = String::from_utf8_lossy(&line_buf);
                            dispatch_message(&text, &self.selector, &self.writer, &self.metrics)
                                .await;
                            line_buf.clear();
                        }

                        Ok(Ok(ReadLine::TooLong)) => {
                            self.metrics.rejected();
                            tracing::warn!(
                                peer = %self.peer,
                                max = self.config.max_message_size,
                                "TCP message over size limit, discarded"
                            );
                            line_buf.clear();
                        }

                        Ok(Ok(ReadLine::Eof)) => break,

                        Ok(Err(e)) => {
                            if !is_connection_reset(&e) {
                                tracing::debug!(peer = %self.peer, error = %e, "TCP read error");
                            }
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Result of reading a bounded line
enum ReadLine {
    /// A complete line is in the buffer (byte count includes the newline)
    Line(usize),
    /// Line exceeded the cap and was consumed through its newline
    TooLong,
    /// End of stream with no pending bytes
    Eof,
}

/// Read one newline-terminated line into `buf`, never storing more than
/// `max_size` bytes.
///
/// `buf` is appended to, not cleared: a read interrupted by the rolling
/// deadline keeps its partial line for the next attempt. The caller clears
/// the buffer after consuming a line. An oversized line is consumed through
/// its terminating newline and reported as `TooLong`.
async fn read_bounded_line<R: AsyncBufReadExt + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_size: usize,
) -> io::Result<ReadLine> {
    let mut read_any = !buf.is_empty();

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            // EOF: return a final unterminated line if there is one
            return if read_any {
                Ok(ReadLine::Line(buf.len()))
            } else {
                Ok(ReadLine::Eof)
            };
        }
        read_any = true;

        let newline = available.iter().position(|&b| b == b'\n');
        let (take, complete) = match newline {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };

        let space = max_size.saturating_sub(buf.len());
        if take > space {
            reader.consume(take);
            if !complete {
                consume_to_newline(reader).await?;
            }
            return Ok(ReadLine::TooLong);
        }

        buf.extend_from_slice(&available[..take]);
        reader.consume(take);

        if complete {
            return Ok(ReadLine::Line(buf.len()));
        }
    }
}

/// Discard input up to and including the next newline (or EOF)
async fn consume_to_newline<R: AsyncBufReadExt + Unpin>(reader: &mut R) -> io::Result<()> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

/// Check if error is a connection reset (expected on abrupt disconnect)
fn is_connection_reset(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
