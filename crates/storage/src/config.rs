// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for WalEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalConfig {
    /// Records appended since the last checkpoint before an automatic checkpoint
    pub max_journal_records: u64,
    /// Size of the active journal segment before an automatic checkpoint
    pub max_journal_bytes: u64,
    /// Records per frame when writing a checkpoint
    pub checkpoint_batch_size: usize,
    /// Number of superseded checkpoints kept after a new one lands, each with
    /// the journal segments it replays, so recovery can fall back to them
    pub keep_old_checkpoints: usize,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            max_journal_records: 50_000,
            max_journal_bytes: 64 * 1024 * 1024,
            checkpoint_batch_size: 1000,
            keep_old_checkpoints: 1,
        }
    }
}

impl WalConfig {
    pub fn with_max_journal_records(mut self, records: u64) -> Self {
        self.max_journal_records = records;
        self
    }

    pub fn with_max_journal_bytes(mut self, bytes: u64) -> Self {
        self.max_journal_bytes = bytes;
        self
    }

    pub fn with_checkpoint_batch_size(mut self, size: usize) -> Self {
        self.checkpoint_batch_size = size.max(1);
        self
    }

    pub fn with_keep_old_checkpoints(mut self, keep: usize) -> Self {
        self.keep_old_checkpoints = keep;
        self
    }

    /// Whether the journal has grown enough to warrant a checkpoint
    pub fn checkpoint_due(&self, records_since_checkpoint: u64, journal_bytes: u64) -> bool {
        records_since_checkpoint >= self.max_journal_records
            || journal_bytes >= self.max_journal_bytes
    }
}
