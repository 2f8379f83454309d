//! SSH wire-format primitives.
//!
//! Every field of a public key blob is length-prefixed:
//!
//! ```text
//! +-----------+----------------------+
//! |  length   |  data                |
//! |  4 bytes  |  length bytes        |
//! |  (BE u32) |                      |
//! +-----------+----------------------+
//! ```
//!
//! A `string` carries raw bytes. An `mpint` carries a big-endian two's
//! complement integer, so a positive value whose top bit is set is written
//! with a leading zero byte.

use crate::error::KeyError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use num_bigint::BigUint;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Bounds-checked reader over an SSH wire-format buffer.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Reads a big-endian `uint32`.
    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, KeyError> {
        if self.buf.remaining() < LENGTH_PREFIX_SIZE {
            return Err(KeyError::Truncated {
                field,
                needed: LENGTH_PREFIX_SIZE,
                available: self.buf.remaining(),
            });
        }
        Ok(self.buf.get_u32())
    }

    /// Reads a length-prefixed `string`.
    pub fn read_string(&mut self, field: &'static str) -> Result<&'a [u8], KeyError> {
        let len = self.read_u32(field)? as usize;
        if self.buf.len() < len {
            return Err(KeyError::Truncated {
                field,
                needed: len,
                available: self.buf.len(),
            });
        }
        let (data, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(data)
    }

    /// Reads a non-negative `mpint`.
    pub fn read_mpint(&mut self, field: &'static str) -> Result<BigUint, KeyError> {
        let data = self.read_string(field)?;
        if data.first().is_some_and(|b| b & 0x80 != 0) {
            return Err(KeyError::NegativeInteger { field });
        }
        Ok(BigUint::from_bytes_be(data))
    }

    /// Fails if any bytes are left unread.
    pub fn finish(self) -> Result<(), KeyError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(KeyError::TrailingData(self.buf.len()))
        }
    }
}

/// Writer producing SSH wire-format buffers.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a length-prefixed `string`.
    pub fn put_string(&mut self, data: &[u8]) -> &mut Self {
        self.buf.put_u32(data.len() as u32);
        self.buf.put_slice(data);
        self
    }

    /// Appends a non-negative `mpint`.
    pub fn put_mpint(&mut self, value: &BigUint) -> &mut Self {
        if value.bits() == 0 {
            self.buf.put_u32(0);
            return self;
        }
        let bytes = value.to_bytes_be();
        if bytes[0] & 0x80 != 0 {
            self.buf.put_u32(bytes.len() as u32 + 1);
            self.buf.put_u8(0);
        } else {
            self.buf.put_u32(bytes.len() as u32);
        }
        self.buf.put_slice(&bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_string() {
        let mut reader = WireReader::new(b"\x00\x00\x00\x07ssh-rsa\x00\x00\x00\x00");
        assert_eq!(reader.read_string("algorithm").unwrap(), b"ssh-rsa");
        assert_eq!(reader.read_string("empty").unwrap(), b"");
        assert_eq!(reader.remaining(), 0);
        reader.finish().unwrap();
    }

    #[test]
    fn test_truncated_length_prefix() {
        let mut reader = WireReader::new(b"\x00\x00\x01");
        let err = reader.read_string("exponent").unwrap_err();
        assert!(matches!(
            err,
            KeyError::Truncated {
                field: "exponent",
                needed: 4,
                available: 3
            }
        ));
    }

    #[test]
    fn test_truncated_body() {
        // Length claims 8 bytes, only 3 follow
        let mut reader = WireReader::new(b"\x00\x00\x00\x08abc");
        let err = reader.read_string("modulus").unwrap_err();
        assert!(matches!(
            err,
            KeyError::Truncated {
                field: "modulus",
                needed: 8,
                available: 3
            }
        ));
    }

    #[test]
    fn test_huge_length_does_not_panic() {
        let mut reader = WireReader::new(b"\xff\xff\xff\xffabcd");
        assert!(matches!(
            reader.read_string("algorithm name"),
            Err(KeyError::Truncated { .. })
        ));
    }

    #[test]
    fn test_mpint_sign_byte() {
        // 0x80 needs a leading zero to stay positive
        let mut writer = WireWriter::new();
        writer.put_mpint(&BigUint::from(0x80u32));
        assert_eq!(writer.freeze().as_ref(), b"\x00\x00\x00\x02\x00\x80");

        let mut writer = WireWriter::new();
        writer.put_mpint(&BigUint::from(0x7fu32));
        assert_eq!(writer.freeze().as_ref(), b"\x00\x00\x00\x01\x7f");

        let mut writer = WireWriter::new();
        writer.put_mpint(&BigUint::from(0u32));
        assert_eq!(writer.freeze().as_ref(), b"\x00\x00\x00\x00");
    }

    #[test]
    fn test_read_mpint_with_sign_byte() {
        let mut reader = WireReader::new(b"\x00\x00\x00\x03\x00\x80\x01");
        assert_eq!(
            reader.read_mpint("modulus").unwrap(),
            BigUint::from(0x8001u32)
        );
    }

    #[test]
    fn test_negative_mpint_rejected() {
        let mut reader = WireReader::new(b"\x00\x00\x00\x01\x80");
        assert!(matches!(
            reader.read_mpint("exponent"),
            Err(KeyError::NegativeInteger { field: "exponent" })
        ));
    }

    #[test]
    fn test_trailing_data() {
        let mut reader = WireReader::new(b"\x00\x00\x00\x01\x03extra");
        reader.read_mpint("exponent").unwrap();
        assert!(matches!(reader.finish(), Err(KeyError::TrailingData(5))));
    }

    #[test]
    fn test_writer_chaining() {
        let mut writer = WireWriter::new();
        assert!(writer.is_empty());
        writer
            .put_string(b"ssh-rsa")
            .put_mpint(&BigUint::from(0x80u32));
        // 0x80 needs a leading zero byte to stay non-negative.
        assert_eq!(writer.len(), 4 + 7 + 4 + 2);
    }
}
