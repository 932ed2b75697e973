//! Sloggo Protocol
//!
//! Syslog wire formats and the shared log entry type.
//!
//! # Supported Formats
//!
//! - **RFC 5424** (IETF syslog) - Structured data support, best-effort and
//!   strict parsing modes
//! - **RFC 3164** (BSD syslog) - Legacy format, still widely used
//!
//! Both parsers produce the same [`LogEntry`] shape so downstream code is
//! format-agnostic. Format selection (including the `auto` try-5424-then-3164
//! policy) lives in [`format`].

pub mod entry;
pub mod format;
pub mod rfc3164;
pub mod rfc5424;

mod error;

pub use entry::LogEntry;
pub use error::ParseError;
pub use format::{LogFormat, parse_message};

/// Result type for parse operations
pub type Result<T> = std::result::Result<T, ParseError>;
