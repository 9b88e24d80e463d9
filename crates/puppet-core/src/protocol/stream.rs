//! Field-level stream encoding shared by every command
//!
//! All integers are big-endian. Strings and blobs are written as a `u32`
//! byte length followed by the bytes. Reads are bounds-checked so a short
//! payload becomes a [`DecodeError::Truncated`] instead of a panic.

use super::error::DecodeError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A value with a fixed field order on the wire.
pub trait WireFormat: Sized {
    /// Name used in decode errors and logs
    const NAME: &'static str;

    /// Append the encoded fields to `out`
    fn write_to(&self, out: &mut WireWriter);

    /// Read the fields back in the same order
    fn read_from(input: &mut WireReader) -> Result<Self, DecodeError>;

    /// Encode into a fresh buffer
    fn to_bytes(&self) -> Bytes {
        let mut writer = WireWriter::new();
        self.write_to(&mut writer);
        writer.finish()
    }

    /// Decode a complete payload; leftover bytes are an error
    fn from_bytes(bytes: Bytes) -> Result<Self, DecodeError> {
        let mut reader = WireReader::new(bytes);
        let value = Self::read_from(&mut reader)?;
        reader.expect_end(Self::NAME)?;
        Ok(value)
    }
}

/// Sequential writer over a growable buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    pub fn put_f64(&mut self, value: f64) {
        self.buf.put_u64(value.to_bits());
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    /// Write a length-prefixed byte blob
    pub fn put_blob(&mut self, bytes: &[u8]) {
        self.put_len(bytes.len());
        self.buf.put_slice(bytes);
    }

    /// Write a length-prefixed UTF-8 string
    pub fn put_str(&mut self, value: &str) {
        self.put_blob(value.as_bytes());
    }

    /// Write an id list: count followed by each id
    pub fn put_ids(&mut self, ids: &[i32]) {
        self.put_len(ids.len());
        for id in ids {
            self.buf.put_i32(*id);
        }
    }

    /// Write a counted sequence of nested values
    pub fn put_seq<T: WireFormat>(&mut self, items: &[T]) {
        self.put_len(items.len());
        for item in items {
            item.write_to(self);
        }
    }

    fn put_len(&mut self, len: usize) {
        // Frame payloads are capped well below u32::MAX
        self.buf.put_u32(len as u32);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Bounds-checked sequential reader.
#[derive(Debug)]
pub struct WireReader {
    buf: Bytes,
}

impl WireReader {
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, field: &'static str, needed: usize) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::Truncated {
                field,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn get_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        self.need(field, 1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        self.need(field, 4)?;
        Ok(self.buf.get_u32())
    }

    pub fn get_i32(&mut self, field: &'static str) -> Result<i32, DecodeError> {
        self.need(field, 4)?;
        Ok(self.buf.get_i32())
    }

    pub fn get_i64(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        self.need(field, 8)?;
        Ok(self.buf.get_i64())
    }

    pub fn get_f64(&mut self, field: &'static str) -> Result<f64, DecodeError> {
        self.need(field, 8)?;
        Ok(f64::from_bits(self.buf.get_u64()))
    }

    pub fn get_bool(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        match self.get_u8(field)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidEnum {
                field,
                value: u32::from(other),
            }),
        }
    }

    pub fn get_blob(&mut self, field: &'static str) -> Result<Bytes, DecodeError> {
        let len = self.get_u32(field)? as usize;
        self.need(field, len)?;
        Ok(self.buf.split_to(len))
    }

    pub fn get_string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let bytes = self.get_blob(field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 { field })
    }

    pub fn get_ids(&mut self, field: &'static str) -> Result<Vec<i32>, DecodeError> {
        let count = self.get_u32(field)? as usize;
        // Each id takes four bytes; refuse counts the payload cannot hold
        self.need(field, count.saturating_mul(4))?;
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            ids.push(self.buf.get_i32());
        }
        Ok(ids)
    }

    pub fn get_seq<T: WireFormat>(&mut self, field: &'static str) -> Result<Vec<T>, DecodeError> {
        let count = self.get_u32(field)? as usize;
        // Every element occupies at least one byte
        self.need(field, count)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::read_from(self)?);
        }
        Ok(items)
    }

    /// Fail if any bytes remain unread
    pub fn expect_end(&self, command: &'static str) -> Result<(), DecodeError> {
        if self.buf.has_remaining() {
            return Err(DecodeError::TrailingBytes {
                command,
                count: self.buf.remaining(),
            });
        }
        Ok(())
    }
}
