//! Per-connection session handling.

use crate::config::Script;
use crate::error::ServerError;
use crate::server::ServerStats;
use bytes::Bytes;
use std::any::Any;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;

/// State of one accepted connection.
///
/// Holds only shared read-only references to the script; nothing here is
/// visible to other connections.
pub(crate) struct Session<'a> {
    pub addr: SocketAddr,
    pub script: &'a Script,
    pub close_after_read: bool,
    pub read_buffer_size: usize,
    pub stats: &'a ServerStats,
}

impl Session<'_> {
    /// Serves the connection until the peer closes it, the script closes
    /// it after a read, or the server shuts down.
    pub async fn run<S>(
        &self,
        mut stream: S,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let greeting = guarded(|| self.script.greeting())?;
        if !greeting.is_empty() {
            stream.write_all(&greeting).await?;
            stream.flush().await?;
            tracing::debug!("[{}] Sent {} byte greeting", self.addr, greeting.len());
        }

        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            tokio::select! {
                result = stream.read(&mut buf) => {
                    let n = match result {
                        Ok(0) => {
                            tracing::debug!("[{}] Connection closed by client", self.addr);
                            return Ok(());
                        }
                        Ok(n) => n,
                        Err(e) => {
                            tracing::debug!("[{}] Read error: {}", self.addr, e);
                            return Err(ServerError::Io(e));
                        }
                    };

                    tracing::debug!("[{}] Received {} bytes", self.addr, n);
                    self.stats.reads_total.fetch_add(1, Ordering::Relaxed);
                    let data = Bytes::copy_from_slice(&buf[..n]);
                    guarded(|| self.script.on_read(data))?;

                    if self.close_after_read {
                        tracing::debug!("[{}] Closing after read", self.addr);
                        if let Err(e) = stream.shutdown().await {
                            tracing::debug!("[{}] Close failed: {}", self.addr, e);
                        }
                        return Ok(());
                    }
                }

                _ = shutdown.recv() => {
                    tracing::debug!("[{}] Shutdown signal received", self.addr);
                    return Ok(());
                }
            }
        }
    }
}

/// Runs a script callback, turning a panic into a connection fault.
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, ServerError> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| ServerError::HandlerPanicked(panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recording_config(close_after_read: bool) -> (ServerConfig, Arc<Mutex<Vec<Bytes>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let config = ServerConfig::builder()
            .greeting(|| &b"hello"[..])
            .on_read(move |data| sink.lock().push(data))
            .close_after_read(close_after_read)
            .build();
        (config, seen)
    }

    fn session<'a>(config: &'a ServerConfig, stats: &'a ServerStats) -> Session<'a> {
        Session {
            addr: "127.0.0.1:9".parse().unwrap(),
            script: config.script(),
            close_after_read: config.close_after_read(),
            read_buffer_size: config.read_buffer_size(),
            stats,
        }
    }

    #[tokio::test]
    async fn test_greeting_then_close_after_read() {
        let (config, seen) = recording_config(true);
        let stats = ServerStats::default();
        let (_tx, mut rx) = broadcast::channel(1);

        let stream = tokio_test::io::Builder::new()
            .write(b"hello")
            .read(b"request")
            .build();
        session(&config, &stats).run(stream, &mut rx).await.unwrap();

        assert_eq!(seen.lock().as_slice(), &[Bytes::from_static(b"request")]);
        assert_eq!(stats.reads_total.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_stays_open_for_further_reads() {
        let (config, seen) = recording_config(false);
        let stats = ServerStats::default();
        let (_tx, mut rx) = broadcast::channel(1);

        let stream = tokio_test::io::Builder::new()
            .write(b"hello")
            .read(b"first")
            .read(b"second")
            .build();
        session(&config, &stats).run(stream, &mut rx).await.unwrap();

        assert_eq!(
            seen.lock().as_slice(),
            &[Bytes::from_static(b"first"), Bytes::from_static(b"second")]
        );
    }

    #[tokio::test]
    async fn test_empty_greeting_writes_nothing() {
        let config = ServerConfig::default();
        let stats = ServerStats::default();
        let (_tx, mut rx) = broadcast::channel(1);

        // Any write would not match the mock and fail the test.
        let stream = tokio_test::io::Builder::new().read(b"data").build();
        session(&config, &stats).run(stream, &mut rx).await.unwrap();
        assert_eq!(stats.reads_total.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_panicking_callback_is_contained() {
        let config = ServerConfig::builder()
            .on_read(|_| panic!("callback exploded"))
            .build();
        let stats = ServerStats::default();
        let (_tx, mut rx) = broadcast::channel(1);

        let stream = tokio_test::io::Builder::new().read(b"boom").build();
        let err = session(&config, &stats)
            .run(stream, &mut rx)
            .await
            .unwrap_err();

        match err {
            ServerError::HandlerPanicked(msg) => assert!(msg.contains("callback exploded")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_read_error_is_reported() {
        let config = ServerConfig::default();
        let stats = ServerStats::default();
        let (_tx, mut rx) = broadcast::channel(1);

        let stream = tokio_test::io::Builder::new()
            .read_error(std::io::Error::from(std::io::ErrorKind::ConnectionReset))
            .build();
        let err = session(&config, &stats)
            .run(stream, &mut rx)
            .await
            .unwrap_err();
        assert!(err.is_connection_fault());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
