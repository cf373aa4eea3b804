// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal segment writer

use crate::error::WalError;
use crate::frame::{encode_frame, FileHeader};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Appends frames to one journal segment
///
/// Writes go straight to the file so `len` always matches what the
/// operating system has accepted.
pub struct JournalWriter {
    path: PathBuf,
    generation: u64,
    file: File,
    len: u64,
    entries: u64,
}

impl JournalWriter {
    /// Create a new segment containing only its header, fsynced
    pub fn create(path: &Path, generation: u64, header: &FileHeader) -> Result<Self, WalError> {
        let mut file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(path)?;
        let frame = header.encode()?;
        file.write_all(&frame)?;
        file.sync_all()?;

        tracing::debug!(path = %path.display(), generation, "created journal segment");
        Ok(Self {
            path: path.to_path_buf(),
            generation,
            file,
            len: frame.len() as u64,
            entries: 0,
        })
    }

    /// Reopen a recovered segment for appending
    ///
    /// The caller has already truncated any torn tail, so the file length is
    /// the end of the last valid frame.
    pub fn open_existing(path: &Path, generation: u64) -> Result<Self, WalError> {
        let file = OpenOptions::new().append(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            generation,
            file,
            len,
            entries: 0,
        })
    }

    /// Append one frame, returning its offset
    ///
    /// On failure the segment is cut back to its previous length so a
    /// partial frame never sits in front of later appends.
    pub fn append(&mut self, payload: &[u8], sync: bool) -> io::Result<u64> {
        let offset = self.len;
        let frame = encode_frame(payload)?;

        let result = self.file.write_all(&frame).and_then(|()| {
            if sync {
                self.file.sync_data()
            } else {
                Ok(())
            }
        });
        if let Err(e) = result {
            tracing::warn!(
                path = %self.path.display(),
                offset,
                error = %e,
                "journal append failed, rolling back"
            );
            if let Err(rollback) = self.file.set_len(offset) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %rollback,
                    "failed to roll back partial journal frame"
                );
            }
            return Err(e);
        }

        self.len += frame.len() as u64;
        self.entries += 1;
        Ok(offset)
    }

    /// Flush and fsync the segment
    pub fn sync(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_all()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bytes in the segment, header included
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Frames appended through this writer
    pub fn entries(&self) -> u64 {
        self.entries
    }
}

/// Cut a file back to `len` bytes and make it durable
pub(crate) fn truncate_file(path: &Path, len: u64) -> Result<(), WalError> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(len)?;
    file.sync_all()?;
    tracing::info!(path = %path.display(), len, "journal truncated at torn tail");
    Ok(())
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
