//! Client error types.

use thiserror::Error;

/// Client errors.
///
/// Only setup failures are errors. A missing response (timeout, peer closed
/// early, transport fault after connecting) is reported as `Ok(None)` by
/// [`crate::ExchangeClient::exchange`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("connection to {0} timed out")]
    ConnectTimeout(String),

    #[error("failed to start client runtime: {0}")]
    Runtime(std::io::Error),
}
