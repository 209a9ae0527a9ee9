//! Error types for the companion-link client.
//!
//! Only failures the caller can act on become errors: a missing endpoint
//! configuration and a session handle whose actor is gone. Runtime faults
//! on a live session (connect refused, listener I/O, bad payloads) are
//! surfaced to the shell as [`Notice`](crate::collaborator::Notice) events
//! instead, since the session absorbs them and carries on.

/// Top-level error type for the socket protocol client.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No resolvable endpoint configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Session actor channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, LinkError>;
