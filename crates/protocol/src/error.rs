//! Parse error type shared by both format decoders

/// Errors produced while decoding a syslog message
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Input was empty after trimming
    #[error("empty message")]
    Empty,

    /// PRI part (`<N>`) missing or malformed
    #[error("missing or malformed PRI")]
    MalformedPri,

    /// Priority value exceeds the RFC maximum of 191
    #[error("priority {0} out of range (0..=191)")]
    PriorityOutOfRange(u16),

    /// Version field is not a positive integer
    #[error("malformed version: {0:?}")]
    MalformedVersion(String),

    /// Timestamp could not be parsed
    #[error("malformed timestamp: {0:?}")]
    MalformedTimestamp(String),

    /// Structured data element is syntactically invalid
    #[error("malformed structured data: {0}")]
    MalformedStructuredData(String),

    /// A mandatory header field is missing (strict mode only)
    #[error("missing header field: {0}")]
    MissingField(&'static str),

    /// Line does not match the RFC 3164 shape
    #[error("not an RFC 3164 message")]
    NotRfc3164,
}
