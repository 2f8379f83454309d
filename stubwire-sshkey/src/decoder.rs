//! OpenSSH public key line decoding.
//!
//! A public key line has the form:
//!
//! ```text
//! ssh-rsa AAAAB3NzaC1yc2EAAAADAQAB... [comment]
//! ```
//!
//! The base64 field holds the key blob: the algorithm name, the public
//! exponent and the modulus, each length-prefixed (see [`crate::wire`]).

use crate::error::KeyError;
use crate::key::{RsaPublicKey, SSH_RSA};
use crate::wire::WireReader;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use std::path::Path;

/// Standard alphabet; trailing `=` padding may be present or stripped.
const KEY_BLOB_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes OpenSSH public keys into [`RsaPublicKey`] records.
///
/// Decoding is all-or-nothing: the first failed check returns an error and
/// no partial key is produced.
pub struct PublicKeyDecoder;

impl PublicKeyDecoder {
    /// Decodes a single OpenSSH public key line.
    ///
    /// A trailing line terminator is accepted; any further line is not.
    pub fn decode(input: &str) -> Result<RsaPublicKey, KeyError> {
        let lines: Vec<&str> = input.lines().collect();
        let [line] = lines.as_slice() else {
            return Err(KeyError::LineCount(lines.len()));
        };

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(KeyError::TooFewFields(fields.len()));
        }

        let algorithm = fields[0];
        if algorithm != SSH_RSA {
            return Err(KeyError::UnsupportedAlgorithm(algorithm.to_string()));
        }

        let blob = KEY_BLOB_ENGINE.decode(fields[1])?;
        Self::decode_blob_as(algorithm, &blob)
    }

    /// Decodes a raw SSH wire-format key blob.
    pub fn decode_blob(blob: &[u8]) -> Result<RsaPublicKey, KeyError> {
        Self::decode_blob_as(SSH_RSA, blob)
    }

    /// Reads a public key file and decodes its single line.
    pub fn decode_file(path: impl AsRef<Path>) -> Result<RsaPublicKey, KeyError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| KeyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::decode(&content)
    }

    /// Decodes a blob whose embedded algorithm name must equal `header`.
    fn decode_blob_as(header: &str, blob: &[u8]) -> Result<RsaPublicKey, KeyError> {
        let mut reader = WireReader::new(blob);

        let name = reader.read_string("algorithm name")?;
        let embedded = std::str::from_utf8(name)
            .ok()
            .filter(|name| name.is_ascii())
            .ok_or(KeyError::InvalidAlgorithmName)?;
        if embedded != header {
            return Err(KeyError::AlgorithmMismatch {
                header: header.to_string(),
                embedded: embedded.to_string(),
            });
        }

        let exponent = reader.read_mpint("exponent")?;
        let modulus = reader.read_mpint("modulus")?;
        reader.finish()?;

        if exponent.bits() == 0 {
            return Err(KeyError::ZeroInteger { field: "exponent" });
        }
        if modulus.bits() == 0 {
            return Err(KeyError::ZeroInteger { field: "modulus" });
        }

        Ok(RsaPublicKey::new(modulus, exponent))
    }
}
