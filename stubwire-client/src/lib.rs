//! # stubwire-client
//!
//! One-shot exchange client for stubwire.
//!
//! This crate provides:
//! - A blocking `exchange` call: connect, send, await one response, tear down
//! - An async variant running on the caller's runtime
//! - Optional response timeout, reported as an absent response
//!
//! There is no framing: one TCP read is taken as the whole response.

pub mod client;
pub mod connection;
pub mod error;

pub use client::{ExchangeClient, ExchangeClientBuilder};
pub use connection::ClientConfig;
pub use error::ClientError;
