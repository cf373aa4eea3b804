// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal segment reader

use crate::error::WalError;
use crate::frame::{FileHeader, FileKind, FrameOutcome, FrameReader};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Reads the frames of one journal segment
///
/// A segment whose header frame is missing or torn opens with no header;
/// whether that is acceptable depends on whether it is the newest segment.
/// A damaged header with valid frames behind it is corruption.
pub struct JournalReader {
    path: PathBuf,
    frames: FrameReader<BufReader<File>>,
    header: Option<FileHeader>,
}

impl JournalReader {
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let mut frames = FrameReader::new(BufReader::new(file), len);

        let header = match frames.next_frame()? {
            FrameOutcome::Frame { payload, .. } => {
                Some(FileHeader::decode(&payload, FileKind::Journal, path)?)
            }
            FrameOutcome::End => None,
            FrameOutcome::Torn { offset, .. }
            | FrameOutcome::ChecksumMismatch {
                offset,
                at_end: true,
            } => {
                if let Some(valid_at) = frames.find_frame_after(offset)? {
                    return Err(WalError::Corruption {
                        path: path.to_path_buf(),
                        offset,
                        reason: format!(
                            "damaged segment header with a valid frame at offset {valid_at}"
                        ),
                    });
                }
                None
            }
            FrameOutcome::ChecksumMismatch {
                offset,
                at_end: false,
            } => {
                return Err(WalError::ChecksumMismatch {
                    path: path.to_path_buf(),
                    offset,
                })
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            frames,
            header,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> Option<&FileHeader> {
        self.header.as_ref()
    }

    /// Length of the segment on disk
    pub fn len(&self) -> u64 {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Offset of the next frame
    pub fn position(&self) -> u64 {
        self.frames.position()
    }

    /// Skip ahead to a known frame boundary
    pub fn seek_to(&mut self, offset: u64) -> Result<(), WalError> {
        if offset < self.frames.position() || offset > self.frames.len() {
            return Err(WalError::Corruption {
                path: self.path.clone(),
                offset,
                reason: format!(
                    "replay position outside segment (data starts at {}, length {})",
                    self.frames.position(),
                    self.frames.len()
                ),
            });
        }
        self.frames.seek_to(offset)?;
        Ok(())
    }

    pub fn next_frame(&mut self) -> Result<FrameOutcome, WalError> {
        Ok(self.frames.next_frame()?)
    }

    /// See [`FrameReader::find_frame_after`]
    pub fn find_frame_after(&mut self, offset: u64) -> Result<Option<u64>, WalError> {
        Ok(self.frames.find_frame_after(offset)?)
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
