//! Syslog UDP listener
//!
//! Receives datagrams, splits them into `\n`-separated messages and hands
//! each batch of fragments to a short-lived parsing task.
//!
//! # Design
//!
//! - 64 KiB receive buffer per read; each datagram is copied out of the
//!   shared buffer before dispatch
//! - a 30 s read deadline that only serves as a shutdown check; on timeout
//!   the loop continues
//! - parsing bounded by a counting semaphore: with no permit available the
//!   datagram is dropped with a warning, the receive loop never blocks on
//!   parsing

use std::net::SocketAddr;
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use sloggo_config::FormatSelector;
use sloggo_store::BatchWriter;

use crate::Result;
use crate::common::{
    ListenerMetrics, MAX_INFLIGHT, READ_TIMEOUT, dispatch_message, split_messages,
};
use crate::error::ListenerError;

/// Default UDP syslog port
const DEFAULT_PORT: u16 = 5514;

/// Receive buffer per read (64 KiB)
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// SO_RCVBUF multiplier over the read buffer, to absorb bursts
const SOCKET_BUFFER_MULTIPLIER: usize = 4;

/// UDP listener configuration
#[derive(Debug, Clone)]
pub struct UdpListenerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Receive buffer size per read
    pub buffer_size: usize,

    /// Read deadline (shutdown check granularity)
    pub read_timeout: std::time::Duration,

    /// Concurrent parsing tasks before datagrams are dropped
    pub max_inflight: usize,
}

impl Default for UdpListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            read_timeout: READ_TIMEOUT,
            max_inflight: MAX_INFLIGHT,
        }
    }
}

impl UdpListenerConfig {
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

/// Syslog UDP listener
pub struct UdpSyslogListener {
    config: UdpListenerConfig,
    socket: UdpSocket,
    writer: BatchWriter,
    selector: FormatSelector,
    metrics: Arc<ListenerMetrics>,
}

impl UdpSyslogListener {
    /// Bind the socket. Bind failures are fatal at boot, so this is
    /// separate from [`run`](Self::run).
    pub async fn bind(
        config: UdpListenerConfig,
        writer: BatchWriter,
        selector: FormatSelector,
    ) -> Result<Self> {
        let bind_addr = config.bind_address();
        let socket_addr: SocketAddr = bind_addr.parse().map_err(|_| ListenerError::Bind {
            address: bind_addr.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid socket address"),
        })?;

        let socket = create_socket(socket_addr, config.buffer_size * SOCKET_BUFFER_MULTIPLIER)
            .map_err(|source| ListenerError::Bind {
                address: bind_addr.clone(),
                source,
            })?;

        tracing::info!(address = %bind_addr, "UDP listener started");

        Ok(Self {
            config,
            socket,
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
        Ok(self.socket.local_addr()?)
    }

    /// Receive loop; returns after cancellation
    pub async fn run(self, cancel: CancellationToken) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_inflight));
        let mut buf = vec![0u8; self.config.buffer_size];

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                result = timeout(self.config.read_timeout, self.socket.recv_from(&mut buf)) => {
                    match result {
                        // Deadline reached with nothing to read; loop so the
                        // shutdown check above runs
                        Err(_) => continue,

                        Ok(Ok((len, peer))) => {
                            self.metrics.unit_received(len as u64);
                            self.dispatch_datagram(&buf[..len], peer, &semaphore);
                        }

                        Ok(Err(e)) => {
                            tracing::warn!(error = %e, "UDP recv error");
                        }
                    }
                }
            }
        }

        tracing::info!("UDP listener stopped");
    }

    /// Copy the datagram out of the shared buffer and parse it on its own
    /// task, or drop it when the listener is at capacity.
    fn dispatch_datagram(&self, data: &[u8], peer: SocketAddr, semaphore: &Arc<Semaphore>) {
        match Arc::clone(semaphore).try_acquire_owned() {
            Ok(permit) => {
                let data = data.to_vec();
                let writer = self.writer.clone();
                let selector = self.selector.clone();
                let metrics = Arc::clone(&self.metrics);

                tokio::spawn(async move {
                    let _permit = permit;
                    let text = String::from_utf8_lossy(&data);
                    for line in split_messages(&text) {
                        dispatch_message(line, &selector, &writer, &metrics).await;
                    }
                });
            }
            Err(_) => {
                self.metrics.rejected();
                tracing::warn!(
                    peer = %peer,
                    "UDP parse capacity reached, dropping datagram"
                );
            }
        }
    }
}

/// Create a UDP socket with an enlarged receive buffer
fn create_socket(addr: SocketAddr, recv_buffer_size: usize) -> std::io::Result<UdpSocket> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    if let Err(e) = socket.set_recv_buffer_size(recv_buffer_size) {
        tracing::warn!(
            error = %e,
            requested_size = recv_buffer_size,
            "failed to set UDP SO_RCVBUF"
        );
    }

    socket.bind(&addr.into())?;
    socket.set_nonblocking(true)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
