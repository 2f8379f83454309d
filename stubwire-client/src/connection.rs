//! Connection configuration and the single-exchange session.

use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of worker threads per exchange.
pub const DEFAULT_WORKER_THREADS: usize = 1;

/// Exchange client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Target host name or IP address.
    pub host: String,
    /// Target port.
    pub port: u16,
    /// Upper bound on the wait for a response (None = wait indefinitely).
    pub timeout: Option<Duration>,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Size of the buffer used for the single response read.
    pub read_buffer_size: usize,
    /// Worker threads in the per-exchange runtime.
    pub worker_threads: usize,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            worker_threads: DEFAULT_WORKER_THREADS,
        }
    }

    /// Bounds the wait for a response. A zero duration disables the bound.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    /// Returns `host:port` for logging and error reports.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Runs one exchange over an established stream.
///
/// Writes and flushes `request`, then performs exactly one read. The bytes
/// of that read fill `slot`; no reassembly of fragmented responses is
/// attempted. Transport errors are logged and leave the slot empty. The
/// write side is shut down before returning.
pub(crate) async fn run_session<S>(
    mut stream: S,
    request: Bytes,
    slot: oneshot::Sender<Bytes>,
    read_buffer_size: usize,
    peer: String,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Err(e) = transfer(&mut stream, &request, slot, read_buffer_size, &peer).await {
        tracing::warn!("[{}] Exchange failed: {}", peer, e);
    }

    if let Err(e) = stream.shutdown().await {
        tracing::debug!("[{}] Close failed: {}", peer, e);
    }
    tracing::debug!("[{}] Connection closed", peer);
}

async fn transfer<S>(
    stream: &mut S,
    request: &[u8],
    slot: oneshot::Sender<Bytes>,
    read_buffer_size: usize,
    peer: &str,
) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(request).await?;
    stream.flush().await?;
    tracing::debug!("[{}] Sent {} bytes, waiting for response...", peer, request.len());

    let mut buf = vec![0u8; read_buffer_size];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        tracing::debug!("[{}] Connection closed before a response arrived", peer);
        return Ok(());
    }

    tracing::debug!("[{}] Received {} bytes", peer, n);
    if slot.send(Bytes::copy_from_slice(&buf[..n])).is_err() {
        tracing::debug!("[{}] Response discarded, exchange already finished", peer);
    }
    Ok(())
}
