//! Sloggo - single-process syslog collector and query service
//!
//! Accepts RFC 5424 and RFC 3164 syslog over TCP and UDP, persists entries
//! to an embedded store through a batching writer, and serves a filtered,
//! paginated, faceted read API for the browser front-end.
//!
//! Configuration comes from `SLOGGO_*` environment variables; see the
//! `sloggo-config` crate for the full list.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sloggo_api::{AppState, build_router};
use sloggo_config::{Config, FormatSelector, ListenerKind};
use sloggo_sources::{
    TcpListenerConfig, TcpSyslogListener, UdpListenerConfig, UdpSyslogListener,
};
use sloggo_store::{
    BatchWriter, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BATCH, DEFAULT_SWEEP_INTERVAL, LogStore,
    spawn_retention_task,
};

/// How long shutdown waits for background tasks before giving up
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Syslog collector and query service
#[derive(Parser, Debug)]
#[command(name = "sloggo", version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); overrides SLOGGO_DEBUG
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();

    init_logging(cli.log_level.as_deref(), config.debug)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Sloggo starting");
    info!(
        listeners = ?config.listeners,
        udp_port = config.udp_port,
        tcp_port = config.tcp_port,
        api_port = config.api_port,
        log_format = %config.log_format,
        retention_minutes = config.retention_minutes,
        debug = config.debug,
        "configuration loaded"
    );

    run(config).await?;

    info!("Sloggo shutdown complete");
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let db_path = config
        .database_path()
        .context("failed to resolve database path")?;
    let store = LogStore::open(&db_path)
        .await
        .context("failed to open log store")?;

    let writer = BatchWriter::new(store.clone(), DEFAULT_MAX_BATCH);
    let selector = FormatSelector::new(config.log_format);

    let cancel = CancellationToken::new();
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    tasks.push(writer.spawn_flush_task(DEFAULT_FLUSH_INTERVAL, cancel.clone()));
    tasks.push(spawn_retention_task(
        store.clone(),
        config.retention_minutes,
        DEFAULT_SWEEP_INTERVAL,
        cancel.clone(),
    ));

    if config.listener_enabled(ListenerKind::Udp) {
        let listener = UdpSyslogListener::bind(
            UdpListenerConfig::with_port(config.udp_port),
            writer.clone(),
            selector.clone(),
        )
        .await
        .context("failed to start UDP listener")?;
        tasks.push(tokio::spawn(listener.run(cancel.clone())));
    }

    if config.listener_enabled(ListenerKind::Tcp) {
        let listener = TcpSyslogListener::bind(
            TcpListenerConfig::with_port(config.tcp_port),
            writer.clone(),
            selector.clone(),
        )
        .await
        .context("failed to start TCP listener")?;
        tasks.push(tokio::spawn(listener.run(cancel.clone())));
    }

    let app = build_router(AppState::new(store.clone(), config.debug));
    let api_addr = format!("0.0.0.0:{}", config.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .context("failed to bind API server")?;
    info!(addr = %api_addr, "API server listening");

    let api_cancel = cancel.clone();
    tasks.push(tokio::spawn(async move {
        let shutdown = async move { api_cancel.cancelled().await };
        if let Err(e) = axum::serve(api_listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!(error = %e, "API server error");
        }
    }));

    signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    // The flush task writes any queued entries on its way out
    cancel.cancel();
    for task in tasks {
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, task).await;
    }
    store.close().await;

    Ok(())
}

/// Initialize the tracing subscriber; `SLOGGO_DEBUG` selects debug-level
/// output unless an explicit level is given.
fn init_logging(cli_level: Option<&str>, debug: bool) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let level = cli_level.unwrap_or(default_level);

    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
