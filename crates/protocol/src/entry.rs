//! The log entry type shared by parsers, the batch writer and the store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// RFC 5424 NILVALUE, persisted verbatim for absent fields
pub const NIL_VALUE: &str = "-";

/// Highest encodable priority (`23 * 8 + 7`)
pub const MAX_PRIORITY: u16 = 191;

/// A single log record as it flows through the system.
///
/// Created by a parser, owned by the batch queue until flush, owned by the
/// store afterward. `row_id` is 0 until the store assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Store-assigned identifier (0 before persistence)
    pub row_id: i64,

    /// Syslog facility, `pri / 8`, 0..=23
    pub facility: u8,

    /// Syslog severity, `pri % 8`, 0..=7
    pub severity: u8,

    /// Protocol version; 1 for RFC 3164
    pub version: u16,

    /// Message timestamp (UTC, nanosecond precision); never the zero instant
    pub timestamp: DateTime<Utc>,

    /// Originating host, `-` when absent
    pub hostname: String,

    /// Application name, `-` when absent
    pub app_name: String,

    /// Process identifier, `-` when absent
    pub proc_id: String,

    /// Message identifier, `-` when absent
    pub msg_id: String,

    /// `-`, or canonical `{"sd-id":{"k":"v"}}` JSON for RFC 5424 elements
    pub structured_data: String,

    /// Free-form message body, possibly multi-line
    pub message: String,
}

impl LogEntry {
    /// Combined priority value, `facility * 8 + severity`
    #[inline]
    pub fn priority(&self) -> u16 {
        self.facility as u16 * 8 + self.severity as u16
    }

    /// True when structured data carries actual elements (not the NIL token)
    #[inline]
    pub fn has_structured_data(&self) -> bool {
        self.structured_data != NIL_VALUE && !self.structured_data.is_empty()
    }
}

/// Split a priority value into `(facility, severity)`
#[inline]
pub fn split_priority(pri: u16) -> (u8, u8) {
    ((pri / 8) as u8, (pri % 8) as u8)
}
