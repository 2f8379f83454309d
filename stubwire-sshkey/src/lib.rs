//! # stubwire-sshkey
//!
//! OpenSSH public key decoding for stubwire.
//!
//! This crate provides:
//! - Single-line OpenSSH public key parsing (`ssh-rsa <base64> [comment]`)
//! - Bounds-checked SSH wire-format readers and writers
//! - Validated RSA public key records (modulus, exponent)

pub mod decoder;
pub mod error;
pub mod key;
pub mod wire;

pub use decoder::PublicKeyDecoder;
pub use error::{ErrorKind, KeyError};
pub use key::{RsaPublicKey, SSH_RSA};
pub use wire::{WireReader, WireWriter};

/// Re-exported so callers can build or inspect key integers.
pub use num_bigint::BigUint;
