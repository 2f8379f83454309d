//! Server error types.

use std::net::SocketAddr;
use thiserror::Error;

/// Server errors.
///
/// `Bind`, `Runtime` and `AlreadyRunning` are returned from `start()`.
/// `Io` and `HandlerPanicked` arise inside a single connection; they are
/// logged and close only that connection.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("failed to start server runtime: {0}")]
    Runtime(std::io::Error),

    #[error("server already running")]
    AlreadyRunning,

    #[error("connection handler panicked: {0}")]
    HandlerPanicked(String),
}

impl ServerError {
    /// Returns whether this error is confined to one connection.
    pub fn is_connection_fault(&self) -> bool {
        matches!(self, ServerError::Io(_) | ServerError::HandlerPanicked(_))
    }
}
