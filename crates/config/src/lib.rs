//! Sloggo Configuration
//!
//! Configuration is read once from `SLOGGO_*` environment variables at
//! startup; every value has a default so an empty environment yields a
//! working collector. The one runtime-mutable value, the log-format
//! selector, lives in [`FormatSelector`] behind a reader-writer lock.
//!
//! | variable | default | meaning |
//! |---|---|---|
//! | `SLOGGO_LISTENERS` | `tcp,udp` | comma-separated subset of `{tcp,udp}` |
//! | `SLOGGO_UDP_PORT` | `5514` | UDP bind port |
//! | `SLOGGO_TCP_PORT` | `6514` | TCP bind port |
//! | `SLOGGO_API_PORT` | `8080` | HTTP bind port |
//! | `SLOGGO_LOG_RETENTION_MINUTES` | `43200` | retention window (30 days) |
//! | `SLOGGO_LOG_FORMAT` | `auto` | `auto` / `rfc5424` / `rfc3164` |
//! | `SLOGGO_DEBUG` | `false` | verbose request timing logs |
//! | `SLOGGO_DATA_DIR` | `<exe-dir>/.sloggo` | database directory |

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

pub use sloggo_protocol::LogFormat;

/// Default UDP syslog port
pub const DEFAULT_UDP_PORT: u16 = 5514;

/// Default TCP syslog port
pub const DEFAULT_TCP_PORT: u16 = 6514;

/// Default HTTP API port
pub const DEFAULT_API_PORT: u16 = 8080;

/// Default retention window: 30 days
pub const DEFAULT_RETENTION_MINUTES: i64 = 30 * 24 * 60;

/// Database file name inside the data directory
pub const DATABASE_FILE: &str = "logs.db";

/// Subdirectory of the executable's directory used when no data dir is set
const DEFAULT_DATA_SUBDIR: &str = ".sloggo";

/// A kind of syslog listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Tcp,
    Udp,
}

impl ListenerKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "tcp" => Some(Self::Tcp),
            "udp" => Some(Self::Udp),
            _ => None,
        }
    }
}

/// Process configuration, read once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Enabled syslog listeners
    pub listeners: Vec<ListenerKind>,

    /// UDP bind port
    pub udp_port: u16,

    /// TCP bind port
    pub tcp_port: u16,

    /// HTTP API bind port
    pub api_port: u16,

    /// Log retention window in minutes
    pub retention_minutes: i64,

    /// Initial log format policy (mutable at runtime via [`FormatSelector`])
    pub log_format: LogFormat,

    /// Verbose request timing logs
    pub debug: bool,

    /// Database directory override; defaults to `<exe-dir>/.sloggo`
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listeners: vec![ListenerKind::Tcp, ListenerKind::Udp],
            udp_port: DEFAULT_UDP_PORT,
            tcp_port: DEFAULT_TCP_PORT,
            api_port: DEFAULT_API_PORT,
            retention_minutes: DEFAULT_RETENTION_MINUTES,
            log_format: LogFormat::Auto,
            debug: false,
            data_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// for unset or unparseable values.
    pub fn from_env() -> Self {
        let listeners = env_string("SLOGGO_LISTENERS", "tcp,udp")
            .split(',')
            .filter_map(ListenerKind::parse)
            .collect();

        Self {
            listeners,
            udp_port: env_port("SLOGGO_UDP_PORT", DEFAULT_UDP_PORT),
            tcp_port: env_port("SLOGGO_TCP_PORT", DEFAULT_TCP_PORT),
            api_port: env_port("SLOGGO_API_PORT", DEFAULT_API_PORT),
            retention_minutes: env_i64("SLOGGO_LOG_RETENTION_MINUTES", DEFAULT_RETENTION_MINUTES),
            log_format: LogFormat::parse(&env_string("SLOGGO_LOG_FORMAT", "auto")),
            debug: env_string("SLOGGO_DEBUG", "false") == "true",
            data_dir: std::env::var("SLOGGO_DATA_DIR").ok().map(PathBuf::from),
        }
    }

    /// True when the given listener kind is enabled
    pub fn listener_enabled(&self, kind: ListenerKind) -> bool {
        self.listeners.contains(&kind)
    }

    /// Resolve the database file path: the configured data dir, or a
    /// `.sloggo` directory next to the executable.
    pub fn database_path(&self) -> std::io::Result<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => {
                let exe = std::env::current_exe()?;
                let exe_dir = exe.parent().ok_or_else(|| {
                    std::io::Error::other("executable has no parent directory")
                })?;
                exe_dir.join(DEFAULT_DATA_SUBDIR)
            }
        };
        Ok(dir.join(DATABASE_FILE))
    }
}

/// Runtime-mutable log-format selector.
///
/// Reads vastly outnumber writes (every message consults it, only the test
/// surface mutates it), hence the reader-writer lock.
#[derive(Debug, Clone)]
pub struct FormatSelector {
    inner: Arc<RwLock<LogFormat>>,
}

impl FormatSelector {
    /// Create a selector with the given initial policy
    pub fn new(format: LogFormat) -> Self {
        Self {
            inner: Arc::new(RwLock::new(format)),
        }
    }

    /// Current policy
    pub fn get(&self) -> LogFormat {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the policy
    pub fn set(&self, format: LogFormat) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = format;
        tracing::info!(format = %format, "log format changed");
    }
}

impl Default for FormatSelector {
    fn default() -> Self {
        Self::new(LogFormat::Auto)
    }
}

/// Read an environment variable, trimmed and lowercased, with a default
fn env_string(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value.trim().to_ascii_lowercase(),
        _ => default.to_string(),
    }
}

fn env_port(key: &str, default: u16) -> u16 {
    match std::env::var(key) {
        Ok(value) => value.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    match std::env::var(key) {
        Ok(value) => value.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod lib_test;
