//! Listener error type

/// Errors from the syslog listeners
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address (fatal at boot)
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
