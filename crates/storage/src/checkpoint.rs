// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoints of the record table
//!
//! A checkpoint captures the whole table so journal segments before it can
//! be deleted. Layout, all frames:
//!
//! ```text
//! [file header]
//! [summary: record count u64, swap location count u32, locations...]
//! [record batch]...
//! [footer: replay generation u64, replay offset u64]
//! ```
//!
//! Files are written as `.ckpt.partial`, fsynced, then renamed into place.
//! The `checkpoint.latest` marker names the newest complete checkpoint.

use crate::error::WalError;
use crate::frame::{encode_frame, FileHeader, FileKind, FrameOutcome, FrameReader};
use crate::layout::StorageLayout;
use crate::state::RecordTable;
use fl_core::wire::{self, WireReader};
use fl_core::{Record, RecordSerde, SerdeError};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

/// Where journal replay resumes after a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayPosition {
    pub generation: u64,
    pub offset: u64,
}

/// Metadata about a checkpoint on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointMeta {
    pub generation: u64,
    pub record_count: u64,
    pub size_bytes: u64,
    pub replay: ReplayPosition,
}

/// A fully decoded checkpoint
#[derive(Debug, Clone)]
pub struct LoadedCheckpoint {
    pub meta: CheckpointMeta,
    pub records: Vec<Record>,
    pub swap_locations: BTreeSet<String>,
}

/// Manages checkpoint files and the latest-checkpoint marker
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    layout: StorageLayout,
}

impl CheckpointStore {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// Write a checkpoint of `table` and rename it into place
    ///
    /// The marker is not touched; callers publish the checkpoint with
    /// [`write_marker`](Self::write_marker) once the matching journal
    /// segment exists.
    pub fn write<S: RecordSerde + ?Sized>(
        &self,
        serde: &S,
        generation: u64,
        table: &RecordTable,
        replay: ReplayPosition,
        batch_size: usize,
    ) -> Result<CheckpointMeta, WalError> {
        let partial = self.layout.partial_checkpoint_path(generation);
        let path = self.layout.checkpoint_path(generation);

        let result = self.write_partial(serde, &partial, table, replay, batch_size.max(1));
        let size_bytes = match result {
            Ok(size) => size,
            Err(e) => {
                let _ = fs::remove_file(&partial);
                return Err(e);
            }
        };

        fs::rename(&partial, &path)?;
        self.layout.sync_dir()?;

        tracing::info!(
            generation,
            records = table.len(),
            size_bytes,
            "checkpoint written"
        );
        Ok(CheckpointMeta {
            generation,
            record_count: table.len() as u64,
            size_bytes,
            replay,
        })
    }

    fn write_partial<S: RecordSerde + ?Sized>(
        &self,
        serde: &S,
        path: &Path,
        table: &RecordTable,
        replay: ReplayPosition,
        batch_size: usize,
    ) -> Result<u64, WalError> {
        let mut out = BufWriter::new(File::create(path)?);
        let mut size = 0u64;
        let mut put = |out: &mut BufWriter<File>, payload: &[u8]| -> io::Result<()> {
            let frame = encode_frame(payload)?;
            size += frame.len() as u64;
            out.write_all(&frame)
        };

        put(&mut out, &FileHeader::for_serde(FileKind::Checkpoint, serde).payload()?)?;

        let mut summary = Vec::new();
        wire::put_u64(&mut summary, table.len() as u64);
        wire::put_u32(
            &mut summary,
            wire::len_u32(table.swap_locations().len(), "swap location count")?,
        );
        for location in table.swap_locations() {
            wire::put_str(&mut summary, location, "swap location")?;
        }
        put(&mut out, &summary)?;

        let records: Vec<&Record> = table.records().collect();
        for chunk in records.chunks(batch_size) {
            let batch: Vec<Record> = chunk.iter().map(|r| (*r).clone()).collect();
            put(&mut out, &serde.serialize_batch(&batch)?)?;
        }

        let mut footer = Vec::new();
        wire::put_u64(&mut footer, replay.generation);
        wire::put_u64(&mut footer, replay.offset);
        put(&mut out, &footer)?;

        out.flush()?;
        out.get_ref().sync_all()?;
        Ok(size)
    }

    /// Decode the checkpoint at `generation`
    pub fn load<S: RecordSerde + ?Sized>(
        &self,
        serde: &S,
        generation: u64,
    ) -> Result<LoadedCheckpoint, WalError> {
        let path = self.layout.checkpoint_path(generation);
        let file = File::open(&path)?;
        let size_bytes = file.metadata()?.len();
        let mut frames = FrameReader::new(BufReader::new(file), size_bytes);

        let corrupt = |offset: u64, reason: String| WalError::Corruption {
            path: path.clone(),
            offset,
            reason,
        };

        let (_, header) = next_payload(&mut frames, &path)?;
        FileHeader::decode(&header, FileKind::Checkpoint, &path)?.ensure_matches(serde, &path)?;

        let (offset, summary) = next_payload(&mut frames, &path)?;
        let mut input = WireReader::new(&summary);
        let summary_err = |e: fl_core::DecodeError| corrupt(offset, e.to_string());
        let record_count = input.read_u64("record count").map_err(summary_err)?;
        let swap_count = input.read_u32("swap location count").map_err(summary_err)?;
        let mut swap_locations = BTreeSet::new();
        for _ in 0..swap_count {
            swap_locations.insert(input.read_str("swap location").map_err(summary_err)?);
        }
        input.finish().map_err(summary_err)?;

        let mut records = Vec::new();
        while (records.len() as u64) < record_count {
            let (offset, payload) = next_payload(&mut frames, &path)?;
            let batch = serde
                .deserialize_batch(&payload)
                .map_err(|source| WalError::Replay {
                    path: path.clone(),
                    offset,
                    source,
                })?;
            if batch.is_empty() {
                return Err(corrupt(offset, "empty record batch".to_string()));
            }
            records.extend(batch);
        }
        if records.len() as u64 != record_count {
            return Err(corrupt(
                frames.position(),
                format!("expected {record_count} records, found {}", records.len()),
            ));
        }

        let (offset, footer) = next_payload(&mut frames, &path)?;
        let mut input = WireReader::new(&footer);
        let footer_err = |e: fl_core::DecodeError| corrupt(offset, e.to_string());
        let replay = ReplayPosition {
            generation: input.read_u64("replay generation").map_err(footer_err)?,
            offset: input.read_u64("replay offset").map_err(footer_err)?,
        };
        input.finish().map_err(footer_err)?;

        if frames.next_frame()? != FrameOutcome::End {
            return Err(corrupt(frames.position(), "data after footer".to_string()));
        }

        Ok(LoadedCheckpoint {
            meta: CheckpointMeta {
                generation,
                record_count,
                size_bytes,
                replay,
            },
            records,
            swap_locations,
        })
    }

    /// Load the newest usable checkpoint
    ///
    /// Tries the marker's generation first, then older checkpoints newest
    /// first. Structural damage falls back to an older checkpoint; encoding
    /// mismatches, key failures and IO errors do not. Returns `None` only
    /// when there are no checkpoints at all.
    pub fn load_latest<S: RecordSerde + ?Sized>(
        &self,
        serde: &S,
    ) -> Result<Option<LoadedCheckpoint>, WalError> {
        let marker = self.read_marker()?;
        let mut candidates = self.layout.checkpoint_generations()?;
        if let Some(marker) = marker {
            candidates.retain(|g| *g <= marker);
        }
        candidates.reverse();

        let mut last_error = None;
        for generation in candidates {
            match self.load(serde, generation) {
                Ok(loaded) => {
                    if marker.is_some_and(|m| m != generation) {
                        tracing::warn!(
                            generation,
                            marker = ?marker,
                            "marker checkpoint unusable, fell back to older checkpoint"
                        );
                    }
                    return Ok(Some(loaded));
                }
                Err(e) if is_recoverable(&e) => {
                    tracing::warn!(generation, error = %e, "skipping damaged checkpoint");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Checkpoint generations on disk, newest first
    pub fn list(&self) -> Result<Vec<u64>, WalError> {
        let mut generations = self.layout.checkpoint_generations()?;
        generations.reverse();
        Ok(generations)
    }

    /// Generation named by the marker, if present and intact
    pub fn read_marker(&self) -> Result<Option<u64>, WalError> {
        let path = self.layout.marker_path();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut lines = contents.lines();
        let generation = lines.next().and_then(|l| l.trim().parse::<u64>().ok());
        let crc = lines.next().and_then(|l| l.trim().parse::<u32>().ok());
        match (generation, crc) {
            (Some(generation), Some(crc)) if crc == marker_checksum(generation) => {
                Ok(Some(generation))
            }
            _ => {
                tracing::warn!(path = %path.display(), "ignoring damaged checkpoint marker");
                Ok(None)
            }
        }
    }

    /// Atomically point the marker at `generation`
    pub fn write_marker(&self, generation: u64) -> Result<(), WalError> {
        let temp = self.layout.marker_temp_path();
        let mut file = File::create(&temp)?;
        write!(file, "{generation}\n{}\n", marker_checksum(generation))?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, self.layout.marker_path())?;
        self.layout.sync_dir()?;
        Ok(())
    }

    /// Remove partial files and checkpoints newer than the marker
    ///
    /// Both are leftovers of checkpoints that never got published.
    pub fn remove_stale(&self) -> Result<usize, WalError> {
        let mut removed = 0;
        for path in self.layout.partial_files()? {
            tracing::info!(path = %path.display(), "removing partial checkpoint file");
            fs::remove_file(&path)?;
            removed += 1;
        }

        if let Some(marker) = self.read_marker()? {
            for generation in self.layout.checkpoint_generations()? {
                if generation > marker {
                    tracing::info!(generation, marker, "removing unpublished checkpoint");
                    fs::remove_file(self.layout.checkpoint_path(generation))?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    /// Delete a checkpoint that could not be published
    pub fn discard(&self, generation: u64) {
        let path = self.layout.checkpoint_path(generation);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to discard checkpoint");
            }
        }
    }

    /// Delete checkpoints older than `current`, keeping the newest
    /// `keep_count` of them
    pub fn prune(&self, current: u64, keep_count: usize) -> Result<Vec<u64>, WalError> {
        let mut deleted = Vec::new();
        let mut old_kept = 0;

        for generation in self.list()? {
            if generation >= current {
                continue;
            }
            if old_kept < keep_count {
                old_kept += 1;
                continue;
            }
            fs::remove_file(self.layout.checkpoint_path(generation))?;
            deleted.push(generation);
        }

        Ok(deleted)
    }
}

fn marker_checksum(generation: u64) -> u32 {
    crc32fast::hash(generation.to_string().as_bytes())
}

/// Damage that an older checkpoint can stand in for
fn is_recoverable(error: &WalError) -> bool {
    match error {
        WalError::Corruption { .. } | WalError::ChecksumMismatch { .. } => true,
        WalError::Replay { source, .. } => matches!(source, SerdeError::Decode(_)),
        _ => false,
    }
}

/// Next frame of a checkpoint, where anything but a valid frame is damage
fn next_payload<R: io::Read>(
    frames: &mut FrameReader<R>,
    path: &Path,
) -> Result<(u64, Vec<u8>), WalError> {
    match frames.next_frame()? {
        FrameOutcome::Frame { offset, payload } => Ok((offset, payload)),
        FrameOutcome::End => Err(WalError::Corruption {
            path: path.to_path_buf(),
            offset: frames.position(),
            reason: "checkpoint ends early".to_string(),
        }),
        FrameOutcome::Torn { offset, reason } => Err(WalError::Corruption {
            path: path.to_path_buf(),
            offset,
            reason: reason.to_string(),
        }),
        FrameOutcome::ChecksumMismatch { offset, .. } => Err(WalError::ChecksumMismatch {
            path: path.to_path_buf(),
            offset,
        }),
    }
}

#[cfg(test)]
#[path = "checkpoint_tests.rs"]
mod tests;
