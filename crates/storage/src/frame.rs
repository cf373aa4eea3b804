// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checksummed frames and file headers
//!
//! Journal segments and checkpoints are both sequences of frames:
//!
//! ```text
//! [payload len: u32][crc32(len ++ payload): u32][payload]
//! ```
//!
//! The checksum covers the length prefix, so a damaged length never passes
//! for a shorter valid frame. The first frame of every file is a
//! [`FileHeader`].

use crate::error::WalError;
use fl_core::wire::{self, LengthOverflow, WireReader};
use fl_core::RecordSerde;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

pub const FRAME_HEADER_LEN: u64 = 8;

/// On-disk format version shared by journals and checkpoints
pub const FORMAT_VERSION: u16 = 1;

/// Largest payload a frame length prefix can describe
pub const MAX_FRAME_PAYLOAD: usize = u32::MAX as usize;

/// CRC32 over the big-endian length prefix followed by the payload
pub fn checksum(len: u32, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&len.to_be_bytes());
    hasher.update(payload);
    hasher.finalize()
}

/// Length prefix for a payload of `payload_len` bytes
pub fn frame_len(payload_len: usize) -> io::Result<u32> {
    u32::try_from(payload_len).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame payload of {payload_len} bytes exceeds {MAX_FRAME_PAYLOAD}"),
        )
    })
}

/// Encode a payload as a complete frame
pub fn encode_frame(payload: &[u8]) -> io::Result<Vec<u8>> {
    let len = frame_len(payload.len())?;
    let mut out = Vec::with_capacity(FRAME_HEADER_LEN as usize + payload.len());
    wire::put_u32(&mut out, len);
    wire::put_u32(&mut out, checksum(len, payload));
    out.extend_from_slice(payload);
    Ok(out)
}

/// Offset of the first complete, checksum-valid frame anywhere in `bytes`
pub fn scan_for_frame(bytes: &[u8]) -> Option<usize> {
    let header = FRAME_HEADER_LEN as usize;
    (0..bytes.len().saturating_sub(header - 1)).find(|&start| {
        let len = u32::from_be_bytes([
            bytes[start],
            bytes[start + 1],
            bytes[start + 2],
            bytes[start + 3],
        ]);
        let expected = u32::from_be_bytes([
            bytes[start + 4],
            bytes[start + 5],
            bytes[start + 6],
            bytes[start + 7],
        ]);
        let body = start + header;
        len as usize <= bytes.len() - body
            && checksum(len, &bytes[body..body + len as usize]) == expected
    })
}

/// Result of reading one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Frame { offset: u64, payload: Vec<u8> },
    /// Clean end of file on a frame boundary
    End,
    /// Frame header or body runs past end of file
    Torn { offset: u64, reason: &'static str },
    /// Payload does not match its checksum; `at_end` when the frame's last
    /// byte is the last byte of the file
    ChecksumMismatch { offset: u64, at_end: bool },
}

/// Sequential frame reader over a file of known length
pub struct FrameReader<R> {
    inner: R,
    position: u64,
    len: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R, len: u64) -> Self {
        Self {
            inner,
            position: 0,
            len,
        }
    }

    /// Offset of the next frame
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn next_frame(&mut self) -> io::Result<FrameOutcome> {
        let offset = self.position;
        let remaining = self.len.saturating_sub(offset);
        if remaining == 0 {
            return Ok(FrameOutcome::End);
        }
        if remaining < FRAME_HEADER_LEN {
            return Ok(FrameOutcome::Torn {
                offset,
                reason: "incomplete frame header",
            });
        }

        let mut header = [0u8; FRAME_HEADER_LEN as usize];
        self.inner.read_exact(&mut header)?;
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        let expected = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);

        // Checked before allocating so a garbage length cannot balloon memory
        let end = offset + FRAME_HEADER_LEN + u64::from(len);
        if end > self.len {
            return Ok(FrameOutcome::Torn {
                offset,
                reason: "frame body runs past end of file",
            });
        }

        let mut payload = vec![0u8; len as usize];
        self.inner.read_exact(&mut payload)?;
        self.position = end;

        if checksum(len, &payload) != expected {
            return Ok(FrameOutcome::ChecksumMismatch {
                offset,
                at_end: end == self.len,
            });
        }
        Ok(FrameOutcome::Frame { offset, payload })
    }
}

impl<R: Read + Seek> FrameReader<R> {
    /// Jump to a frame boundary, e.g. a checkpoint's replay position
    pub fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.position = offset;
        Ok(())
    }

    /// Offset of a valid frame starting anywhere after the damaged frame at
    /// `offset`
    ///
    /// A torn write only ever damages the last frame, so finding one means
    /// acknowledged frames sit behind the damage. Leaves the reader at the
    /// end of the file.
    pub fn find_frame_after(&mut self, offset: u64) -> io::Result<Option<u64>> {
        let start = offset + 1;
        if start >= self.len {
            return Ok(None);
        }
        self.inner.seek(SeekFrom::Start(start))?;
        let mut rest = Vec::new();
        self.inner
            .by_ref()
            .take(self.len - start)
            .read_to_end(&mut rest)?;
        self.position = self.len;
        Ok(scan_for_frame(&rest).map(|at| start + at as u64))
    }
}

/// Which kind of file a header introduces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Journal,
    Checkpoint,
}

impl FileKind {
    pub fn magic(self) -> [u8; 4] {
        match self {
            FileKind::Journal => *b"FLWJ",
            FileKind::Checkpoint => *b"FLCK",
        }
    }
}

/// First frame of every journal segment and checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub kind: FileKind,
    pub format_version: u16,
    pub encoding_name: String,
    pub serde_version: u32,
}

impl FileHeader {
    pub fn for_serde<S: RecordSerde + ?Sized>(kind: FileKind, serde: &S) -> Self {
        Self {
            kind,
            format_version: FORMAT_VERSION,
            encoding_name: serde.encoding_name().to_string(),
            serde_version: serde.version(),
        }
    }

    pub fn payload(&self) -> Result<Vec<u8>, LengthOverflow> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.kind.magic());
        wire::put_u16(&mut out, self.format_version);
        wire::put_short_str(&mut out, &self.encoding_name, "encoding name")?;
        wire::put_u32(&mut out, self.serde_version);
        Ok(out)
    }

    /// The header as a complete frame
    pub fn encode(&self) -> Result<Vec<u8>, WalError> {
        Ok(encode_frame(&self.payload()?)?)
    }

    /// Size of the header frame; journal data starts here
    pub fn encoded_len(&self) -> Result<u64, WalError> {
        Ok(FRAME_HEADER_LEN + self.payload()?.len() as u64)
    }

    pub fn decode(payload: &[u8], kind: FileKind, path: &Path) -> Result<Self, WalError> {
        let corrupt = |reason: String| WalError::Corruption {
            path: path.to_path_buf(),
            offset: 0,
            reason,
        };

        let mut input = WireReader::new(payload);
        let magic = input
            .read_array::<4>("file magic")
            .map_err(|e| corrupt(e.to_string()))?;
        if magic != kind.magic() {
            return Err(corrupt(format!("not a {kind:?} file")));
        }
        let format_version = input
            .read_u16("format version")
            .map_err(|e| corrupt(e.to_string()))?;
        if format_version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {format_version}"
            )));
        }
        let encoding_name = input
            .read_short_str("encoding name")
            .map_err(|e| corrupt(e.to_string()))?;
        let serde_version = input
            .read_u32("serde version")
            .map_err(|e| corrupt(e.to_string()))?;
        input.finish().map_err(|e| corrupt(e.to_string()))?;

        Ok(Self {
            kind,
            format_version,
            encoding_name,
            serde_version,
        })
    }

    /// Fail with `EncodingMismatch` unless `serde` wrote this file
    pub fn ensure_matches<S: RecordSerde + ?Sized>(
        &self,
        serde: &S,
        path: &Path,
    ) -> Result<(), WalError> {
        if self.encoding_name != serde.encoding_name() || self.serde_version != serde.version() {
            return Err(WalError::EncodingMismatch {
                path: path.to_path_buf(),
                expected: format!("{} v{}", serde.encoding_name(), serde.version()),
                found: format!("{} v{}", self.encoding_name, self.serde_version),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
