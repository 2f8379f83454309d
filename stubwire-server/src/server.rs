//! Scriptable embedded TCP server.

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::session::Session;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Lifecycle of an embedded test server.
pub trait EmbeddedServer {
    /// Binds and starts accepting connections.
    fn start(&self) -> Result<(), ServerError>;

    /// Releases all resources, blocking until shutdown completes.
    fn stop(&self);

    /// Returns the last commanded state.
    fn is_running(&self) -> bool;
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub reads_total: AtomicU64,
    pub errors_total: AtomicU64,
}

/// Decrements `connections_active` when the connection task ends or is
/// cancelled.
struct ActiveConnection(Arc<ServerStats>);

impl ActiveConnection {
    fn open(stats: Arc<ServerStats>) -> Self {
        stats.connections_total.fetch_add(1, Ordering::Relaxed);
        stats.connections_active.fetch_add(1, Ordering::Relaxed);
        Self(stats)
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        self.0.connections_active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Resources owned while the server is started.
struct Running {
    runtime: Runtime,
    shutdown: broadcast::Sender<()>,
    acceptor: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// TCP server that greets every connection with canned bytes and hands
/// inbound reads to a callback.
///
/// One runtime, created by `start()`, serves the listener and all
/// connections until `stop()`. Each connection is handled independently;
/// a failing connection is logged and closed without affecting others.
///
/// `start()` and `stop()` block and must not be called from inside an
/// async execution context.
pub struct ScriptableTcpServer {
    config: ServerConfig,
    state: Mutex<Option<Running>>,
    running: AtomicBool,
    stats: Arc<ServerStats>,
}

impl ScriptableTcpServer {
    /// Creates a new server (not yet started).
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(None),
            running: AtomicBool::new(false),
            stats: Arc::new(ServerStats::default()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the bound address while started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.state.lock().as_ref().map(|running| running.local_addr)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Binds the listener and starts accepting connections.
    pub fn start(&self) -> Result<(), ServerError> {
        let mut state = self.state.lock();
        if state.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads())
            .thread_name("stubwire-server")
            .enable_all()
            .build()
            .map_err(ServerError::Runtime)?;

        let bind_addr = self.config.bind_addr();
        let listener = runtime
            .block_on(TcpListener::bind(bind_addr))
            .map_err(|source| ServerError::Bind {
                addr: bind_addr,
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let (shutdown, shutdown_rx) = broadcast::channel(1);
        let acceptor = runtime.spawn(Self::accept_loop(
            listener,
            self.config.clone(),
            self.stats.clone(),
            shutdown.clone(),
            shutdown_rx,
        ));

        *state = Some(Running {
            runtime,
            shutdown,
            acceptor,
            local_addr,
        });
        self.running.store(true, Ordering::SeqCst);

        tracing::info!("Server listening on {}", local_addr);
        Ok(())
    }

    /// Stops accepting, closes every connection and shuts the runtime down.
    ///
    /// The running flag is cleared before resources are released, so
    /// `is_running()` may report false while sockets are still closing.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let Some(Running {
            runtime,
            shutdown,
            acceptor,
            local_addr,
        }) = self.state.lock().take()
        else {
            return;
        };

        let _ = shutdown.send(());
        if let Err(e) = runtime.block_on(acceptor) {
            tracing::warn!("Accept loop ended abnormally: {}", e);
        }
        runtime.shutdown_timeout(self.config.shutdown_timeout());

        tracing::info!("Server on {} stopped", local_addr);
    }

    /// Returns whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn accept_loop(
        listener: TcpListener,
        config: ServerConfig,
        stats: Arc<ServerStats>,
        shutdown: broadcast::Sender<()>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let active = ActiveConnection::open(stats.clone());
                            let config = config.clone();
                            let mut conn_shutdown = shutdown.subscribe();

                            tokio::spawn(async move {
                                Self::handle_connection(stream, addr, &config, &active.0, &mut conn_shutdown)
                                    .await;
                                drop(active);
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        config: &ServerConfig,
        stats: &ServerStats,
        shutdown: &mut broadcast::Receiver<()>,
    ) {
        tracing::info!("Client connected: {}", addr);
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!("[{}] Failed to set TCP_NODELAY: {}", addr, e);
        }

        let session = Session {
            addr,
            script: config.script(),
            close_after_read: config.close_after_read(),
            read_buffer_size: config.read_buffer_size(),
            stats,
        };

        if let Err(e) = session.run(stream, shutdown).await {
            stats.errors_total.fetch_add(1, Ordering::Relaxed);
            if e.is_connection_fault() {
                tracing::warn!("[{}] Connection error: {}", addr, e);
            } else {
                tracing::error!("[{}] Unexpected server error: {}", addr, e);
            }
        }

        tracing::info!("Client disconnected: {}", addr);
    }
}

impl EmbeddedServer for ScriptableTcpServer {
    fn start(&self) -> Result<(), ServerError> {
        ScriptableTcpServer::start(self)
    }

    fn stop(&self) {
        ScriptableTcpServer::stop(self)
    }

    fn is_running(&self) -> bool {
        ScriptableTcpServer::is_running(self)
    }
}

impl Drop for ScriptableTcpServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(running) = self.state.get_mut().take() {
            let _ = running.shutdown.send(());
            running.runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for ScriptableTcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptableTcpServer")
            .field("config", &self.config)
            .field("local_addr", &self.local_addr())
            .field("running", &self.is_running())
            .finish()
    }
}
