// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Aligned CDR cursors.
//!
//! Every primitive is aligned to its own size relative to the start of the
//! stream. Strings are a `u32` length (including the trailing NUL)
//! followed by the bytes and the NUL; sequences are a `u32` element count
//! followed by the elements.

use super::{CdrError, CdrResult};

macro_rules! impl_write_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self, value: $type) {
            self.align($size);
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    };
}

macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> CdrResult<$type> {
            self.align($size)?;
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.read_bytes($size)?);
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

/// Growable encoder.
#[derive(Debug, Default)]
pub struct CdrWriter {
    buffer: Vec<u8>,
}

impl CdrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    impl_write_le!(write_u16, u16, 2);
    impl_write_le!(write_u32, u32, 4);
    impl_write_le!(write_u64, u64, 8);
    impl_write_le!(write_i16, i16, 2);
    impl_write_le!(write_i32, i32, 4);
    impl_write_le!(write_i64, i64, 8);
    impl_write_le!(write_f32, f32, 4);
    impl_write_le!(write_f64, f64, 8);

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_u32(value.len() as u32 + 1);
        self.write_bytes(value.as_bytes());
        self.write_u8(0);
    }

    /// Pad with zeros up to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) {
        if alignment <= 1 {
            return;
        }
        let mask = alignment - 1;
        let aligned = (self.buffer.len() + mask) & !mask;
        self.buffer.resize(aligned, 0);
    }

    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Bounds-checked decoder over a borrowed buffer.
pub struct CdrReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> CdrReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_read_le!(read_u16, u16, 2);
    impl_read_le!(read_u32, u32, 4);
    impl_read_le!(read_u64, u64, 8);
    impl_read_le!(read_i16, i16, 2);
    impl_read_le!(read_i32, i32, 4);
    impl_read_le!(read_i64, i64, 8);
    impl_read_le!(read_f32, f32, 4);
    impl_read_le!(read_f64, f64, 8);

    pub fn read_u8(&mut self) -> CdrResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_bool(&mut self) -> CdrResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CdrError::InvalidData {
                reason: format!("boolean byte {}", other),
            }),
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> CdrResult<&'a [u8]> {
        if self.offset + len > self.buffer.len() {
            return Err(CdrError::ReadFailed {
                offset: self.offset,
                reason: "unexpected end of buffer".into(),
            });
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn read_string(&mut self) -> CdrResult<String> {
        let len = self.read_u32()? as usize;
        if len == 0 {
            return Err(CdrError::InvalidData {
                reason: "string length 0 (missing terminator)".into(),
            });
        }
        let raw = self.read_bytes(len)?;
        let (text, nul) = raw.split_at(len - 1);
        if nul != [0] {
            return Err(CdrError::InvalidData {
                reason: "string is not NUL terminated".into(),
            });
        }
        String::from_utf8(text.to_vec()).map_err(|_| CdrError::InvalidData {
            reason: "string is not utf-8".into(),
        })
    }

    /// Element count of a sequence, checked against the bytes left.
    pub fn read_seq_len(&mut self, elem_size: usize) -> CdrResult<usize> {
        let len = self.read_u32()? as usize;
        if len.saturating_mul(elem_size.max(1)) > self.remaining() {
            return Err(CdrError::ReadFailed {
                offset: self.offset,
                reason: format!("sequence of {} elements overruns buffer", len),
            });
        }
        Ok(len)
    }

    pub fn align(&mut self, alignment: usize) -> CdrResult<()> {
        if alignment <= 1 {
            return Ok(());
        }
        let mask = alignment - 1;
        let aligned = (self.offset + mask) & !mask;
        if aligned > self.buffer.len() {
            return Err(CdrError::ReadFailed {
                offset: self.offset,
                reason: "unexpected end of buffer".into(),
            });
        }
        self.offset = aligned;
        Ok(())
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_are_aligned() {
        let mut w = CdrWriter::new();
        w.write_u8(0xAB);
        w.write_u32(0x1234_5678);
        w.write_u8(1);
        w.write_f64(std::f64::consts::PI);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[1..4], &[0, 0, 0]);
        assert_eq!(&bytes[4..8], &0x1234_5678u32.to_le_bytes());

        let mut r = CdrReader::new(&bytes);
        assert_eq!(r.read_u8().expect("u8"), 0xAB);
        assert_eq!(r.read_u32().expect("u32"), 0x1234_5678);
        assert!(r.read_bool().expect("bool"));
        assert_eq!(r.read_f64().expect("f64"), std::f64::consts::PI);
        assert!(r.is_eof());
    }

    #[test]
    fn test_string_layout() {
        let mut w = CdrWriter::new();
        w.write_string("hi");
        let bytes = w.into_bytes();
        assert_eq!(bytes, vec![3, 0, 0, 0, b'h', b'i', 0]);
        assert_eq!(CdrReader::new(&bytes).read_string().expect("string"), "hi");
    }

    #[test]
    fn test_truncated_input_reports_offset() {
        let bytes = [1u8, 0, 0];
        let mut r = CdrReader::new(&bytes);
        match r.read_u32() {
            Err(CdrError::ReadFailed { offset, .. }) => assert_eq!(offset, 0),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_sequence_length_checked() {
        let mut w = CdrWriter::new();
        w.write_u32(1000);
        let bytes = w.into_bytes();
        assert!(CdrReader::new(&bytes).read_seq_len(4).is_err());
    }

    #[test]
    fn test_invalid_bool_rejected() {
        assert!(CdrReader::new(&[2]).read_bool().is_err());
    }
}
