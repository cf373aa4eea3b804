// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL engine: journal, checkpoints and recovery
//!
//! `WalEngine` owns a storage directory for its whole life. It is created
//! with [`WalEngine::open`], must be recovered with
//! [`WalEngine::recover_records`] before accepting writes, and is closed with
//! [`WalEngine::shutdown`] (or on drop).

use crate::checkpoint::{CheckpointMeta, CheckpointStore, LoadedCheckpoint, ReplayPosition};
use crate::config::WalConfig;
use crate::error::WalError;
use crate::frame::{FileHeader, FileKind, FrameOutcome, MAX_FRAME_PAYLOAD};
use crate::layout::{DirectoryLock, StorageLayout};
use crate::reader::JournalReader;
use crate::state::{validate_record, RecordTable};
use crate::writer::{truncate_file, JournalWriter};
use fl_core::{Record, RecordId, RecordSerde, SerdeFactory};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Lifecycle of a WAL engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Recovering,
    Open,
    Checkpointing,
    ShuttingDown,
    Closed,
}

/// What the last recovery found on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub checkpoint_generation: Option<u64>,
    pub checkpoint_records: usize,
    pub journal_entries: u64,
    pub journal_records: u64,
    /// Bytes cut from a torn tail
    pub truncated_bytes: u64,
    /// Records dropped because their queue no longer exists
    pub orphaned_records: usize,
}

/// Point-in-time engine statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalStats {
    pub state: EngineState,
    pub record_count: usize,
    pub journal_generation: Option<u64>,
    pub journal_bytes: u64,
    pub records_since_checkpoint: u64,
    pub checkpoints_taken: u64,
    pub last_checkpoint: Option<u64>,
}

struct EngineInner {
    state: EngineState,
    table: RecordTable,
    writer: Option<JournalWriter>,
    // NOTE(lifetime): Held to keep the directory exclusive until shutdown
    lock: Option<DirectoryLock>,
    records_since_checkpoint: u64,
    checkpoints_taken: u64,
    last_checkpoint: Option<u64>,
    last_recovery: Option<RecoveryReport>,
}

impl EngineInner {
    fn require(&self, expected: EngineState, operation: &'static str) -> Result<(), WalError> {
        if self.state != expected {
            return Err(WalError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    fn writer_mut(&mut self, operation: &'static str) -> Result<&mut JournalWriter, WalError> {
        let state = self.state;
        self.writer
            .as_mut()
            .ok_or(WalError::InvalidState { operation, state })
    }
}

/// Sequential write-ahead log over a pluggable record serde
pub struct WalEngine<S: RecordSerde> {
    layout: StorageLayout,
    checkpoints: CheckpointStore,
    config: WalConfig,
    serde: S,
    inner: Mutex<EngineInner>,
}

impl<S: RecordSerde> WalEngine<S> {
    /// Take ownership of `dir` and build the serde from `factory`
    ///
    /// The engine starts in `Recovering`; call
    /// [`recover_records`](Self::recover_records) before writing.
    pub fn open<F>(dir: impl AsRef<Path>, factory: &F, config: WalConfig) -> Result<Self, WalError>
    where
        F: SerdeFactory<Serde = S>,
    {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let layout = StorageLayout::new(dir);
        let lock = DirectoryLock::acquire(&layout)?;
        let serde = factory.create_serde()?;

        let checkpoints = CheckpointStore::new(layout.clone());
        checkpoints.remove_stale()?;

        tracing::info!(
            dir = %dir.display(),
            encoding = serde.encoding_name(),
            "opened WAL storage"
        );

        Ok(Self {
            layout,
            checkpoints,
            config,
            serde,
            inner: Mutex::new(EngineInner {
                state: EngineState::Recovering,
                table: RecordTable::new(),
                writer: None,
                lock: Some(lock),
                records_since_checkpoint: 0,
                checkpoints_taken: 0,
                last_checkpoint: None,
                last_recovery: None,
            }),
        })
    }

    fn lock_inner(&self) -> MutexGuard<'_, EngineInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rebuild the record table from disk
    ///
    /// Returns every live record as current state (tag UPDATE) in id order.
    /// Only valid once, in `Recovering`.
    pub fn recover_records(&self) -> Result<Vec<Record>, WalError> {
        let mut inner = self.lock_inner();
        inner.require(EngineState::Recovering, "recover_records")?;

        let (table, writer, report) = self.recover()?;
        let records: Vec<Record> = table.records().cloned().collect();

        tracing::info!(
            records = records.len(),
            checkpoint = ?report.checkpoint_generation,
            entries = report.journal_entries,
            truncated_bytes = report.truncated_bytes,
            "WAL recovery complete"
        );

        inner.table = table;
        inner.writer = Some(writer);
        inner.records_since_checkpoint = report.journal_records;
        inner.last_checkpoint = report.checkpoint_generation;
        inner.last_recovery = Some(report);
        inner.state = EngineState::Open;
        Ok(records)
    }

    fn recover(&self) -> Result<(RecordTable, JournalWriter, RecoveryReport), WalError> {
        let mut report = RecoveryReport::default();

        let loaded = self.checkpoints.load_latest(&self.serde)?;
        let replay = loaded.as_ref().map(|c| c.meta.replay);
        let mut table = match loaded {
            Some(LoadedCheckpoint {
                meta,
                records,
                swap_locations,
            }) => {
                report.checkpoint_generation = Some(meta.generation);
                report.checkpoint_records = records.len();
                RecordTable::from_checkpoint(records, swap_locations)
            }
            None => RecordTable::new(),
        };

        let first_generation = replay.map_or(0, |r| r.generation);
        let segments: Vec<u64> = self
            .layout
            .journal_generations()?
            .into_iter()
            .filter(|g| *g >= first_generation)
            .collect();
        if let (Some(replay), Some(first)) = (replay, segments.first()) {
            if *first != replay.generation {
                return Err(WalError::Corruption {
                    path: self.layout.journal_path(replay.generation),
                    offset: 0,
                    reason: "journal segment referenced by checkpoint is missing".to_string(),
                });
            }
        }

        let mut active = None;
        for (index, &generation) in segments.iter().enumerate() {
            let is_last = index + 1 == segments.len();
            let resume_at = replay
                .filter(|r| r.generation == generation)
                .map(|r| r.offset);
            let segment = self.replay_segment(generation, resume_at, is_last, &mut table, &mut report)?;
            if is_last {
                active = Some(segment);
            }
        }

        let orphaned = table.retain_queues(|queue| self.serde.resolves_queue(queue));
        if orphaned > 0 {
            tracing::warn!(orphaned, "dropped recovered records for unknown queues");
        }
        report.orphaned_records = orphaned;

        let header = FileHeader::for_serde(FileKind::Journal, &self.serde);
        let writer = match active {
            Some(SegmentEnd::Valid(generation)) => {
                JournalWriter::open_existing(&self.layout.journal_path(generation), generation)?
            }
            Some(SegmentEnd::Headerless(generation)) => {
                let path = self.layout.journal_path(generation);
                fs::remove_file(&path)?;
                JournalWriter::create(&path, generation, &header)?
            }
            None => JournalWriter::create(
                &self.layout.journal_path(first_generation),
                first_generation,
                &header,
            )?,
        };
        self.layout.sync_dir()?;

        if let Some(generation) = report.checkpoint_generation {
            self.settle_checkpoint(generation)?;
        }

        Ok((table, writer, report))
    }

    /// Replay one segment into `table`, cutting a torn tail off the newest
    fn replay_segment(
        &self,
        generation: u64,
        resume_at: Option<u64>,
        is_last: bool,
        table: &mut RecordTable,
        report: &mut RecoveryReport,
    ) -> Result<SegmentEnd, WalError> {
        let path = self.layout.journal_path(generation);
        let mut reader = JournalReader::open(&path)?;

        let Some(header) = reader.header() else {
            if !is_last {
                return Err(WalError::Corruption {
                    path,
                    offset: 0,
                    reason: "missing or torn segment header".to_string(),
                });
            }
            tracing::warn!(
                path = %path.display(),
                bytes = reader.len(),
                "discarding newest journal segment with torn header"
            );
            report.truncated_bytes += reader.len();
            return Ok(SegmentEnd::Headerless(generation));
        };
        header.ensure_matches(&self.serde, &path)?;

        if let Some(offset) = resume_at {
            reader.seek_to(offset)?;
        }

        let torn_at = loop {
            match reader.next_frame()? {
                FrameOutcome::Frame { offset, payload } => {
                    // Decode the whole entry before applying any of it
                    let batch = self
                        .serde
                        .deserialize_batch(&payload)
                        .map_err(|source| WalError::Replay {
                            path: path.clone(),
                            offset,
                            source,
                        })?;
                    report.journal_entries += 1;
                    report.journal_records += batch.len() as u64;
                    for record in &batch {
                        table.apply(record);
                    }
                }
                FrameOutcome::End => break None,
                FrameOutcome::Torn { offset, reason } => {
                    if !is_last {
                        return Err(WalError::Corruption {
                            path,
                            offset,
                            reason: reason.to_string(),
                        });
                    }
                    break Some(offset);
                }
                FrameOutcome::ChecksumMismatch { offset, at_end } => {
                    if !(is_last && at_end) {
                        return Err(WalError::ChecksumMismatch { path, offset });
                    }
                    break Some(offset);
                }
            }
        };

        if let Some(offset) = torn_at {
            if let Some(valid_at) = reader.find_frame_after(offset)? {
                return Err(WalError::Corruption {
                    path,
                    offset,
                    reason: format!(
                        "damaged entry with a valid entry after it at offset {valid_at}"
                    ),
                });
            }
            let bytes = reader.len() - offset;
            tracing::warn!(
                path = %path.display(),
                offset,
                bytes,
                "torn write at end of journal, truncating"
            );
            drop(reader);
            truncate_file(&path, offset)?;
            report.truncated_bytes += bytes;
        }
        Ok(SegmentEnd::Valid(generation))
    }

    /// Make the loaded checkpoint the published one and drop what it covers
    fn settle_checkpoint(&self, generation: u64) -> Result<(), WalError> {
        if self.checkpoints.read_marker()? != Some(generation) {
            tracing::info!(generation, "republishing recovered checkpoint");
            self.checkpoints.write_marker(generation)?;
        }
        self.remove_uncovered_segments(generation)
    }

    /// Delete journal segments no retained checkpoint can replay from
    ///
    /// A checkpoint's replay segment shares its generation, so segments from
    /// the oldest kept checkpoint onward stay for fallback recovery.
    fn remove_uncovered_segments(&self, current: u64) -> Result<(), WalError> {
        let oldest = self
            .layout
            .checkpoint_generations()?
            .into_iter()
            .min()
            .map_or(current, |g| g.min(current));
        for old in self.layout.journal_generations()? {
            if old < oldest {
                self.remove_segment(old);
            }
        }
        Ok(())
    }

    fn remove_segment(&self, generation: u64) {
        let path = self.layout.journal_path(generation);
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove old journal segment");
        }
    }

    /// Append a batch of records as one journal entry
    ///
    /// The entry is written (and fsynced when `sync` is set) before the table
    /// changes, so a failed write leaves the table as it was.
    pub fn update(&self, records: &[Record], sync: bool) -> Result<(), WalError> {
        let mut inner = self.lock_inner();
        inner.require(EngineState::Open, "update")?;
        if records.is_empty() {
            return Ok(());
        }
        for record in records {
            validate_record(record)?;
        }

        let payload = self.serde.serialize_batch(records)?;
        if payload.len() > MAX_FRAME_PAYLOAD {
            return Err(WalError::EntryTooLarge {
                len: payload.len(),
                max: MAX_FRAME_PAYLOAD,
            });
        }
        inner.writer_mut("update")?.append(&payload, sync)?;

        for record in records {
            inner.table.apply(record);
        }
        inner.records_since_checkpoint += records.len() as u64;

        let journal_bytes = inner.writer.as_ref().map_or(0, JournalWriter::len);
        if self
            .config
            .checkpoint_due(inner.records_since_checkpoint, journal_bytes)
        {
            if let Err(e) = self.checkpoint_locked(&mut inner) {
                tracing::warn!(error = %e, "automatic checkpoint failed, will retry on a later update");
            }
        }
        Ok(())
    }

    /// Write a checkpoint and start a fresh journal segment
    pub fn checkpoint(&self) -> Result<CheckpointMeta, WalError> {
        let mut inner = self.lock_inner();
        inner.require(EngineState::Open, "checkpoint")?;
        self.checkpoint_locked(&mut inner)
    }

    fn checkpoint_locked(&self, inner: &mut EngineInner) -> Result<CheckpointMeta, WalError> {
        inner.state = EngineState::Checkpointing;
        let result = self.write_checkpoint(inner);
        inner.state = EngineState::Open;
        result
    }

    fn write_checkpoint(&self, inner: &mut EngineInner) -> Result<CheckpointMeta, WalError> {
        let writer = inner.writer_mut("checkpoint")?;
        writer.sync()?;
        let current = writer.generation();

        let generation = self
            .layout
            .max_generation()?
            .map_or(current, |max| max.max(current))
            + 1;
        let header = FileHeader::for_serde(FileKind::Journal, &self.serde);
        let replay = ReplayPosition {
            generation,
            offset: header.encoded_len()?,
        };

        let meta = self.checkpoints.write(
            &self.serde,
            generation,
            &inner.table,
            replay,
            self.config.checkpoint_batch_size,
        )?;

        let published = JournalWriter::create(&self.layout.journal_path(generation), generation, &header)
            .and_then(|writer| {
                self.checkpoints.write_marker(generation)?;
                Ok(writer)
            });
        let new_writer = match published {
            Ok(writer) => writer,
            Err(e) => {
                self.checkpoints.discard(generation);
                return Err(e);
            }
        };
        inner.writer = Some(new_writer);

        match self
            .checkpoints
            .prune(generation, self.config.keep_old_checkpoints)
        {
            Ok(deleted) if !deleted.is_empty() => {
                tracing::debug!(?deleted, "pruned old checkpoints");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "failed to prune old checkpoints"),
        }
        if let Err(e) = self.remove_uncovered_segments(generation) {
            tracing::warn!(error = %e, "failed to remove old journal segments");
        }

        inner.records_since_checkpoint = 0;
        inner.checkpoints_taken += 1;
        inner.last_checkpoint = Some(generation);
        tracing::info!(
            generation,
            records = meta.record_count,
            size_bytes = meta.size_bytes,
            "checkpoint complete"
        );
        Ok(meta)
    }

    /// Flush the journal and release the directory
    ///
    /// Calling it again after the engine is closed does nothing.
    pub fn shutdown(&self) -> Result<(), WalError> {
        let mut inner = self.lock_inner();
        if inner.state == EngineState::Closed {
            tracing::debug!("WAL already shut down");
            return Ok(());
        }
        inner.state = EngineState::ShuttingDown;

        let result = match inner.writer.take() {
            Some(mut writer) => writer.sync().map_err(WalError::from),
            None => Ok(()),
        };
        inner.table.clear();
        if let Some(lock) = inner.lock.take() {
            tracing::debug!(path = %lock.path().display(), "releasing storage lock");
        }
        inner.state = EngineState::Closed;

        tracing::info!(dir = %self.layout.dir().display(), "WAL shut down");
        result
    }

    pub fn state(&self) -> EngineState {
        self.lock_inner().state
    }

    pub fn record_count(&self) -> usize {
        self.lock_inner().table.len()
    }

    /// Swap files referenced by swapped-out records
    pub fn recovered_swap_locations(&self) -> BTreeSet<String> {
        self.lock_inner().table.swap_locations().clone()
    }

    /// Largest record id seen; seeds the caller's id generator
    pub fn max_record_id(&self) -> Option<RecordId> {
        self.lock_inner().table.max_record_id()
    }

    pub fn recovery_report(&self) -> Option<RecoveryReport> {
        self.lock_inner().last_recovery.clone()
    }

    pub fn stats(&self) -> WalStats {
        let inner = self.lock_inner();
        WalStats {
            state: inner.state,
            record_count: inner.table.len(),
            journal_generation: inner.writer.as_ref().map(JournalWriter::generation),
            journal_bytes: inner.writer.as_ref().map_or(0, JournalWriter::len),
            records_since_checkpoint: inner.records_since_checkpoint,
            checkpoints_taken: inner.checkpoints_taken,
            last_checkpoint: inner.last_checkpoint,
        }
    }

    pub fn serde(&self) -> &S {
        &self.serde
    }

    pub fn dir(&self) -> &Path {
        self.layout.dir()
    }
}

impl<S: RecordSerde> Drop for WalEngine<S> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "WAL shutdown on drop failed");
        }
    }
}

/// How the newest replayed segment ended
enum SegmentEnd {
    Valid(u64),
    /// Header missing or torn; the segment holds no entries
    Headerless(u64),
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
