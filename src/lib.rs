//! stubwire - embedded network fixtures for integration tests.
//!
//! Re-exports the three stubwire crates:
//! - [`ExchangeClient`]: one request, one response, then teardown
//! - [`ScriptableTcpServer`]: canned greeting plus a read callback per connection
//! - [`PublicKeyDecoder`]: OpenSSH `ssh-rsa` public key lines to [`RsaPublicKey`]

pub use stubwire_client::{ClientConfig, ClientError, ExchangeClient, ExchangeClientBuilder};
pub use stubwire_server::{
    EmbeddedServer, ScriptableTcpServer, ServerConfig, ServerConfigBuilder, ServerError,
    ServerStats,
};
pub use stubwire_sshkey::{ErrorKind, KeyError, PublicKeyDecoder, RsaPublicKey};

pub use stubwire_client as client;
pub use stubwire_server as server;
pub use stubwire_sshkey as sshkey;

use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber honouring `RUST_LOG` (default `info`).
///
/// Safe to call from every test: only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
