//! Public key decoding errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while decoding an OpenSSH public key.
///
/// Each variant identifies the validation step that failed.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("public key must be a single line, found {0} lines")]
    LineCount(usize),

    #[error("invalid public key format: expected '<algorithm> <base64> [comment]', found {0} field(s)")]
    TooFewFields(usize),

    #[error("unsupported public key algorithm '{0}': only ssh-rsa is supported")]
    UnsupportedAlgorithm(String),

    #[error("invalid base64 key data: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("algorithm name in key blob is not ASCII")]
    InvalidAlgorithmName,

    #[error("algorithm mismatch: public key header says '{header}', key blob says '{embedded}'")]
    AlgorithmMismatch { header: String, embedded: String },

    #[error("truncated {field}: need {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("{field} is negative")]
    NegativeInteger { field: &'static str },

    #[error("{field} is zero")]
    ZeroInteger { field: &'static str },

    #[error("{0} unexpected bytes after modulus")]
    TrailingData(usize),

    #[error("failed to read public key file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Coarse classification of a [`KeyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed line, base64 or wire-format blob.
    Format,
    /// Well-formed key of an algorithm other than RSA.
    Unsupported,
    /// The key file could not be read.
    Io,
}

impl KeyError {
    /// Returns the error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeyError::UnsupportedAlgorithm(_) => ErrorKind::Unsupported,
            KeyError::Io { .. } => ErrorKind::Io,
            KeyError::LineCount(_)
            | KeyError::TooFewFields(_)
            | KeyError::InvalidBase64(_)
            | KeyError::InvalidAlgorithmName
            | KeyError::AlgorithmMismatch { .. }
            | KeyError::Truncated { .. }
            | KeyError::NegativeInteger { .. }
            | KeyError::ZeroInteger { .. }
            | KeyError::TrailingData(_) => ErrorKind::Format,
        }
    }
}
