//! Decoded public key records.

use crate::wire::WireWriter;
use base64::Engine;
use bytes::Bytes;
use num_bigint::BigUint;

/// Algorithm name of RSA keys, both in the text header and in the blob.
pub const SSH_RSA: &str = "ssh-rsa";

/// An RSA public key decoded from OpenSSH format.
///
/// Values of this type only come out of a successful decode, so the
/// modulus and exponent are always positive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RsaPublicKey {
    modulus: BigUint,
    exponent: BigUint,
}

impl RsaPublicKey {
    pub(crate) fn new(modulus: BigUint, exponent: BigUint) -> Self {
        Self { modulus, exponent }
    }

    /// Returns the SSH algorithm name.
    pub fn algorithm(&self) -> &'static str {
        SSH_RSA
    }

    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    pub fn exponent(&self) -> &BigUint {
        &self.exponent
    }

    /// Returns the key size in bits.
    pub fn bits(&self) -> u64 {
        self.modulus.bits()
    }

    /// Encodes the key as an SSH wire-format blob.
    pub fn to_blob(&self) -> Bytes {
        let mut writer = WireWriter::new();
        writer
            .put_string(SSH_RSA.as_bytes())
            .put_mpint(&self.exponent)
            .put_mpint(&self.modulus);
        writer.freeze()
    }

    /// Formats the key as an OpenSSH public key line.
    pub fn to_openssh_line(&self, comment: Option<&str>) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(self.to_blob());
        match comment {
            Some(comment) if !comment.is_empty() => format!("{} {} {}", SSH_RSA, encoded, comment),
            _ => format!("{} {}", SSH_RSA, encoded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_key() -> RsaPublicKey {
        RsaPublicKey::new(BigUint::from(0xC5u32), BigUint::from(3u32))
    }

    #[test]
    fn test_to_blob_layout() {
        let blob = small_key().to_blob();
        let expected: &[u8] = b"\x00\x00\x00\x07ssh-rsa\x00\x00\x00\x01\x03\x00\x00\x00\x02\x00\xc5";
        assert_eq!(blob.as_ref(), expected);
    }

    #[test]
    fn test_to_openssh_line() {
        let key = small_key();
        let line = key.to_openssh_line(Some("user@host"));
        assert!(line.starts_with("ssh-rsa AAAAB3NzaC1yc2E"));
        assert!(line.ends_with(" user@host"));

        let bare = key.to_openssh_line(None);
        assert_eq!(bare.split(' ').count(), 2);
        assert_eq!(key.to_openssh_line(Some("")), bare);
    }

    #[test]
    fn test_bits() {
        assert_eq!(small_key().bits(), 8);
        assert_eq!(small_key().algorithm(), "ssh-rsa");
    }
}
