//! Format selection and parse dispatch

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::entry::LogEntry;
use crate::{rfc3164, rfc5424};

/// How incoming syslog messages are parsed.
///
/// `Auto` tries RFC 5424 first and falls back to RFC 3164, which is safe
/// because the 5424 parser rejects BSD-style timestamps outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Try RFC 5424 first, then RFC 3164 (default)
    #[default]
    Auto,
    /// Only parse as RFC 5424
    Rfc5424,
    /// Only parse as RFC 3164
    Rfc3164,
}

impl LogFormat {
    /// Parse a selector value; anything unrecognized falls back to `Auto`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "rfc5424" => Self::Rfc5424,
            "rfc3164" => Self::Rfc3164,
            _ => Self::Auto,
        }
    }

    /// Get string representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Rfc5424 => "rfc5424",
            Self::Rfc3164 => "rfc3164",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse one syslog message under the given format policy.
///
/// On failure of all enabled parsers the returned error is the last parser's.
pub fn parse_message(line: &str, format: LogFormat) -> Result<LogEntry> {
    match format {
        LogFormat::Rfc5424 => rfc5424::parse(line),
        LogFormat::Rfc3164 => rfc3164::parse(line),
        LogFormat::Auto => rfc5424::parse(line).or_else(|_| rfc3164::parse(line)),
    }
}

#[cfg(test)]
#[path = "format_test.rs"]
mod format_test;
