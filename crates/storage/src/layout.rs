// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage directory layout and ownership
//!
//! ```text
//! <dir>/
//!   .lock                      exclusive advisory lock (holder's PID)
//!   journal-<gen:020>.wal      journal segments, active = highest gen
//!   checkpoint-<gen:020>.ckpt  checkpoints
//!   checkpoint.latest          marker naming the newest complete checkpoint
//! ```

use crate::error::WalError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = ".lock";
const MARKER_FILE: &str = "checkpoint.latest";
const JOURNAL_PREFIX: &str = "journal-";
const JOURNAL_SUFFIX: &str = ".wal";
const CHECKPOINT_PREFIX: &str = "checkpoint-";
const CHECKPOINT_SUFFIX: &str = ".ckpt";
const PARTIAL_SUFFIX: &str = ".ckpt.partial";
const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct StorageLayout {
    dir: PathBuf,
}

impl StorageLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    pub fn marker_path(&self) -> PathBuf {
        self.dir.join(MARKER_FILE)
    }

    pub fn marker_temp_path(&self) -> PathBuf {
        self.dir.join(format!("{MARKER_FILE}{TEMP_SUFFIX}"))
    }

    pub fn journal_path(&self, generation: u64) -> PathBuf {
        self.dir
            .join(format!("{JOURNAL_PREFIX}{generation:020}{JOURNAL_SUFFIX}"))
    }

    pub fn checkpoint_path(&self, generation: u64) -> PathBuf {
        self.dir
            .join(format!("{CHECKPOINT_PREFIX}{generation:020}{CHECKPOINT_SUFFIX}"))
    }

    pub fn partial_checkpoint_path(&self, generation: u64) -> PathBuf {
        self.dir
            .join(format!("{CHECKPOINT_PREFIX}{generation:020}{PARTIAL_SUFFIX}"))
    }

    /// Journal segment generations, ascending
    pub fn journal_generations(&self) -> io::Result<Vec<u64>> {
        self.scan(JOURNAL_PREFIX, JOURNAL_SUFFIX)
    }

    /// Checkpoint generations, ascending
    pub fn checkpoint_generations(&self) -> io::Result<Vec<u64>> {
        self.scan(CHECKPOINT_PREFIX, CHECKPOINT_SUFFIX)
    }

    /// Leftovers from checkpoints that never reached their rename
    pub fn partial_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(PARTIAL_SUFFIX) || name.ends_with(TEMP_SUFFIX) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Highest generation used by any journal or checkpoint
    pub fn max_generation(&self) -> io::Result<Option<u64>> {
        let journals = self.journal_generations()?;
        let checkpoints = self.checkpoint_generations()?;
        Ok(journals.into_iter().chain(checkpoints).max())
    }

    fn scan(&self, prefix: &str, suffix: &str) -> io::Result<Vec<u64>> {
        let mut generations = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let generation = name
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
                .and_then(|digits| digits.parse::<u64>().ok());
            if let Some(generation) = generation {
                generations.push(generation);
            }
        }
        generations.sort_unstable();
        Ok(generations)
    }

    /// Make renames and newly created files in the directory durable
    pub fn sync_dir(&self) -> io::Result<()> {
        #[cfg(unix)]
        {
            File::open(&self.dir)?.sync_all()?;
        }
        Ok(())
    }
}

/// Exclusive ownership of a storage directory, released on drop
#[derive(Debug)]
pub struct DirectoryLock {
    path: PathBuf,
    // NOTE(lifetime): Held to maintain the advisory lock
    file: File,
}

impl DirectoryLock {
    pub fn acquire(layout: &StorageLayout) -> Result<Self, WalError> {
        let path = layout.lock_path();
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| WalError::Locked(layout.dir().to_path_buf()))?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        tracing::debug!(path = %path.display(), "acquired storage lock");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release storage lock");
        }
    }
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
