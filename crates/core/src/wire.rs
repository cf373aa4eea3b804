// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Big-endian wire primitives
//!
//! Every on-disk structure (schema records, encryption headers, journal and
//! checkpoint headers) is built from these helpers. Strings are length
//! prefixed UTF-8; readers report the field that ran short so corruption
//! reports point at something meaningful.

use thiserror::Error;

/// Errors raised while decoding wire data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unsupported schema version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("truncated {field}: needed {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("invalid lifecycle tag {0:#04x}")]
    InvalidLifecycleTag(u8),
    #[error("invalid value {value:#04x} for {field}")]
    InvalidFlag { field: &'static str, value: u8 },
    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}

pub fn put_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

pub fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// A length too large for the prefix that carries it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} is {len} bytes, over the {max} its length prefix allows")]
pub struct LengthOverflow {
    pub field: &'static str,
    pub len: usize,
    pub max: usize,
}

/// `len` as a `u32` length or count prefix
pub fn len_u32(len: usize, field: &'static str) -> Result<u32, LengthOverflow> {
    u32::try_from(len).map_err(|_| LengthOverflow {
        field,
        len,
        max: u32::MAX as usize,
    })
}

/// Write a `u32` length-prefixed string
pub fn put_str(
    out: &mut Vec<u8>,
    value: &str,
    field: &'static str,
) -> Result<(), LengthOverflow> {
    put_u32(out, len_u32(value.len(), field)?);
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Write a `u16` length-prefixed string
///
/// Used for identifiers that are short by construction (key ids, encoding
/// names).
pub fn put_short_str(
    out: &mut Vec<u8>,
    value: &str,
    field: &'static str,
) -> Result<(), LengthOverflow> {
    let len = u16::try_from(value.len()).map_err(|_| LengthOverflow {
        field,
        len: value.len(),
        max: u16::MAX as usize,
    })?;
    put_u16(out, len);
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

/// Cursor over a byte slice
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::Truncated {
                field,
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N, field)?);
        Ok(array)
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>(field)?[0])
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array(field)?))
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array(field)?))
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.read_array(field)?))
    }

    pub fn read_str(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let len = self.read_u32(field)? as usize;
        self.read_utf8(len, field)
    }

    pub fn read_short_str(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let len = self.read_u16(field)? as usize;
        self.read_utf8(len, field)
    }

    /// Read a boolean flag byte, rejecting anything but 0 or 1
    pub fn read_flag(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        match self.read_u8(field)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(DecodeError::InvalidFlag { field, value }),
        }
    }

    /// Require that the whole buffer has been consumed
    pub fn finish(&self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }

    fn read_utf8(&mut self, len: usize, field: &'static str) -> Result<String, DecodeError> {
        let bytes = self.read_bytes(len, field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 { field })
    }
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
