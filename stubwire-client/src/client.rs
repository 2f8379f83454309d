//! One-shot exchange client.

use crate::connection::{self, ClientConfig};
use crate::error::ClientError;
use bytes::Bytes;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Grace period for the per-exchange runtime to stop its worker threads.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Client performing exactly one request/response cycle per call.
///
/// Every call opens a fresh connection and tears it down before returning.
/// Nothing is pooled or reused across calls.
///
/// The client treats one TCP read as one complete message. A response split
/// across several segments is truncated to whatever the first read returns.
#[derive(Debug, Clone)]
pub struct ExchangeClient {
    config: ClientConfig,
}

/// Builder returned by [`ExchangeClient::connect`].
#[derive(Debug, Clone)]
pub struct ExchangeClientBuilder {
    config: ClientConfig,
}

impl ExchangeClientBuilder {
    /// Bounds the wait for a response. A zero duration disables the bound.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_connect_timeout(timeout);
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config = self.config.with_read_buffer_size(size);
        self
    }

    pub fn build(self) -> ExchangeClient {
        ExchangeClient::new(self.config)
    }
}

/// Aborts the session task when dropped, closing its socket.
struct SessionGuard(Option<JoinHandle<()>>);

impl SessionGuard {
    /// Waits for the session to finish closing the connection.
    async fn join(mut self, peer: &str) {
        if let Some(handle) = self.0.take() {
            if let Err(e) = handle.await {
                tracing::debug!("[{}] Session task ended abnormally: {}", peer, e);
            }
        }
    }

    /// Aborts the session and waits until its socket has been dropped.
    async fn close(mut self, peer: &str) {
        if let Some(handle) = self.0.take() {
            handle.abort();
            match handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {
                    tracing::debug!("[{}] Session aborted, connection closed", peer);
                }
                Err(e) => tracing::debug!("[{}] Session task ended abnormally: {}", peer, e),
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}

impl ExchangeClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Starts configuring a client for `host:port`.
    pub fn connect(host: impl Into<String>, port: u16) -> ExchangeClientBuilder {
        ExchangeClientBuilder {
            config: ClientConfig::new(host, port),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `payload` and blocks until one response arrives or the timeout
    /// expires.
    ///
    /// A dedicated runtime is created for the call and shut down on every
    /// exit path. Returns `Ok(None)` when no response was captured.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async execution context; use
    /// [`ExchangeClient::exchange_async`] there.
    pub fn exchange(&self, payload: impl Into<Bytes>) -> Result<Option<Bytes>, ClientError> {
        let runtime = self.build_runtime()?;
        let result = runtime.block_on(self.exchange_async(payload));
        runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
        result
    }

    /// Performs the same single exchange on the caller's runtime.
    ///
    /// Dropping the returned future closes the connection.
    pub async fn exchange_async(
        &self,
        payload: impl Into<Bytes>,
    ) -> Result<Option<Bytes>, ClientError> {
        let request = payload.into();
        let peer = self.config.addr();
        let stream = self.open(&peer).await?;

        let (slot_tx, slot_rx) = oneshot::channel();
        let session = SessionGuard(Some(tokio::spawn(connection::run_session(
            stream,
            request,
            slot_tx,
            self.config.read_buffer_size,
            peer.clone(),
        ))));

        let response = match self.config.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, slot_rx).await {
                Ok(filled) => filled.ok(),
                Err(_) => {
                    tracing::debug!("[{}] No response within {:?}, closing", peer, timeout);
                    None
                }
            },
            None => slot_rx.await.ok(),
        };

        if response.is_some() {
            session.join(&peer).await;
        } else {
            session.close(&peer).await;
        }
        Ok(response)
    }

    async fn open(&self, peer: &str) -> Result<TcpStream, ClientError> {
        tracing::debug!("Connecting to {}...", peer);

        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect((self.config.host.as_str(), self.config.port)),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            ClientError::ConnectTimeout(peer.to_string())
        })?
        .map_err(|source| {
            tracing::debug!("Connection failed: {}", source);
            ClientError::Connect {
                addr: peer.to_string(),
                source,
            }
        })?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("[{}] Failed to set TCP_NODELAY: {}", peer, e);
        }
        tracing::debug!("Connected to {}", peer);
        Ok(stream)
    }

    fn build_runtime(&self) -> Result<Runtime, ClientError> {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads)
            .thread_name("stubwire-client")
            .enable_all()
            .build()
            .map_err(ClientError::Runtime)
    }
}
