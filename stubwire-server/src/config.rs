//! Server configuration.
//!
//! A [`ServerConfig`] is assembled once through [`ServerConfigBuilder`] and
//! is immutable afterwards. The greeting producer and read callback are
//! shared by every connection and may run concurrently, so they must be
//! safe to call from several threads at once.

use bytes::Bytes;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Default number of runtime worker threads.
pub const DEFAULT_WORKER_THREADS: usize = 2;

/// Default time `stop()` waits for connection tasks to wind down.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

type GreetingFn = dyn Fn() -> Bytes + Send + Sync;
type ReadFn = dyn Fn(Bytes) + Send + Sync;

/// Canned per-connection behaviour: what to send on accept, what to do
/// with inbound bytes.
#[derive(Clone)]
pub struct Script {
    greeting: Arc<GreetingFn>,
    on_read: Arc<ReadFn>,
}

impl Script {
    /// Produces the greeting for a freshly accepted connection.
    pub fn greeting(&self) -> Bytes {
        (self.greeting)()
    }

    /// Hands one inbound read to the callback.
    pub fn on_read(&self, data: Bytes) {
        (self.on_read)(data)
    }
}

impl Default for Script {
    fn default() -> Self {
        Self {
            greeting: Arc::new(Bytes::new),
            on_read: Arc::new(|_| {}),
        }
    }
}

impl std::fmt::Debug for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Script").finish_non_exhaustive()
    }
}

/// Immutable server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    bind_addr: SocketAddr,
    script: Script,
    close_after_read: bool,
    read_buffer_size: usize,
    worker_threads: usize,
    shutdown_timeout: Duration,
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Address to bind to. Port 0 picks an ephemeral port.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Whether a connection is closed once its first read is handled.
    pub fn close_after_read(&self) -> bool {
        self.close_after_read
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfigBuilder::default().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    bind_addr: SocketAddr,
    script: Script,
    close_after_read: bool,
    read_buffer_size: usize,
    worker_threads: usize,
    shutdown_timeout: Duration,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            script: Script::default(),
            close_after_read: false,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            worker_threads: DEFAULT_WORKER_THREADS,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServerConfigBuilder {
    /// Sets the listening port, keeping the bind IP.
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the bytes sent to every client right after accept.
    ///
    /// An empty greeting sends nothing.
    pub fn greeting<F, B>(mut self, greeting: F) -> Self
    where
        F: Fn() -> B + Send + Sync + 'static,
        B: Into<Bytes>,
    {
        self.script.greeting = Arc::new(move || greeting().into());
        self
    }

    /// Sets the callback receiving every inbound read verbatim.
    pub fn on_read<F>(mut self, on_read: F) -> Self
    where
        F: Fn(Bytes) + Send + Sync + 'static,
    {
        self.script.on_read = Arc::new(on_read);
        self
    }

    pub fn close_after_read(mut self, close: bool) -> Self {
        self.close_after_read = close;
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn build(self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind_addr,
            script: self.script,
            close_after_read: self.close_after_read,
            read_buffer_size: self.read_buffer_size,
            worker_threads: self.worker_threads,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}
