//! Binary reading and writing utilities for the networm protocol.
//!
//! All values are little-endian. Strings are null-terminated UTF-8.

use crate::ProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A reader for parsing binary protocol messages.
///
/// Every getter checks the remaining length first, so a truncated payload
/// surfaces as [`ProtocolError::UnexpectedEof`] instead of a panic.
#[derive(Debug)]
pub struct BinaryReader {
    buf: Bytes,
}

impl BinaryReader {
    /// Create a new reader from raw bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { buf: data.into() }
    }

    /// Returns remaining bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[inline]
    fn ensure(&self, n: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() >= n {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedEof)
        }
    }

    #[inline]
    pub fn get_u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    #[inline]
    pub fn get_u32(&mut self) -> Result<u32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    #[inline]
    pub fn get_u64(&mut self) -> Result<u64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.buf.get_u64_le())
    }

    #[inline]
    pub fn get_f64(&mut self) -> Result<f64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.buf.get_f64_le())
    }

    /// Read a null-terminated UTF-8 string.
    ///
    /// A missing terminator is an error; invalid UTF-8 is replaced lossily.
    pub fn get_string_utf8(&mut self) -> Result<String, ProtocolError> {
        let end = self
            .buf
            .iter()
            .position(|&b| b == 0)
            .ok_or(ProtocolError::UnexpectedEof)?;
        let bytes = self.buf.split_to(end);
        self.buf.advance(1);
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a `u32` element count, rejecting counts that could not possibly
    /// fit in the remaining bytes given the minimum element size.
    pub fn get_count(&mut self, min_element_len: usize) -> Result<usize, ProtocolError> {
        let count = self.get_u32()? as usize;
        if count.saturating_mul(min_element_len) > self.remaining() {
            return Err(ProtocolError::UnexpectedEof);
        }
        Ok(count)
    }

    /// Fails if any bytes are left unread.
    pub fn finish(self) -> Result<(), ProtocolError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(ProtocolError::TrailingBytes(n)),
        }
    }
}

/// A writer for building binary protocol messages.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
}

impl BinaryWriter {
    /// Create a new writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create a new writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the current length.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    #[inline]
    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    #[inline]
    pub fn put_u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    #[inline]
    pub fn put_f64(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    /// Write a null-terminated UTF-8 string.
    ///
    /// Interior nulls would end the string early on the other side, so they
    /// are dropped.
    pub fn put_string_utf8(&mut self, s: &str) {
        for b in s.bytes().filter(|&b| b != 0) {
            self.buf.put_u8(b);
        }
        self.buf.put_u8(0);
    }

    /// Consume the writer and return the built buffer.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    /// Get current buffer as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_utf8() {
        let mut w = BinaryWriter::new();
        w.put_string_utf8("hello");
        w.put_u32(7);
        let mut r = BinaryReader::new(w.finish());
        assert_eq!(r.get_string_utf8().unwrap(), "hello");
        assert_eq!(r.get_u32().unwrap(), 7);
        assert!(r.finish().is_ok());
    }

    #[test]
    fn test_interior_null_dropped() {
        let mut w = BinaryWriter::new();
        w.put_string_utf8("a\0b");
        let mut r = BinaryReader::new(w.finish());
        assert_eq!(r.get_string_utf8().unwrap(), "ab");
    }

    #[test]
    fn test_truncated_read_is_error() {
        let mut r = BinaryReader::new(vec![1u8, 2, 3]);
        assert!(matches!(r.get_f64(), Err(ProtocolError::UnexpectedEof)));
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let mut r = BinaryReader::new(b"abc".to_vec());
        assert!(matches!(r.get_string_utf8(), Err(ProtocolError::UnexpectedEof)));
    }

    #[test]
    fn test_absurd_count_rejected() {
        let mut w = BinaryWriter::new();
        w.put_u32(u32::MAX);
        let mut r = BinaryReader::new(w.finish());
        assert!(r.get_count(24).is_err());
    }

    #[test]
    fn test_trailing_bytes() {
        let r = BinaryReader::new(vec![0u8; 2]);
        assert!(matches!(r.finish(), Err(ProtocolError::TrailingBytes(2))));
    }
}
