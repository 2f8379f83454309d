//! # stubwire-server
//!
//! Scriptable embedded TCP server for stubwire.
//!
//! This crate provides:
//! - A TCP server that sends a canned greeting to every accepted connection
//! - Verbatim delivery of inbound reads to a caller-supplied callback
//! - Optional close-after-first-read behaviour
//! - Blocking `start`/`stop` lifecycle control with statistics
//!
//! Callbacks may run concurrently from several connections and must be
//! thread-safe; the server does no locking on their behalf.

pub mod config;
pub mod error;
pub mod server;
mod session;

pub use config::{Script, ServerConfig, ServerConfigBuilder};
pub use error::ServerError;
pub use server::{EmbeddedServer, ScriptableTcpServer, ServerStats};
