// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the behavioral specs

pub use fl_core::{ClaimRef, LifecycleTag, Record, RecordId, RecordSerde, SchemaSerde, SchemaSerdeFactory};
pub use fl_crypto::{EncryptedSerde, EncryptedSerdeFactory, EncryptionConfig};
pub use fl_storage::{EngineState, FileHeader, FileKind, StorageLayout, WalConfig, WalEngine, WalError};
pub use std::path::{Path, PathBuf};

pub const KEY_1: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
pub const KEY_2: &str = "f0e0d0c0b0a090807060504030201000";

pub type EncryptedWal = WalEngine<EncryptedSerde<SchemaSerde>>;

/// A temporary WAL directory
pub struct Store {
    dir: tempfile::TempDir,
    config: WalConfig,
}

impl Store {
    pub fn empty() -> Self {
        Self::with_config(WalConfig::default())
    }

    pub fn with_config(config: WalConfig) -> Self {
        Self {
            dir: tempfile::TempDir::new().unwrap(),
            config,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(self.path())
    }

    /// Open with the plaintext schema serde, without recovering
    pub fn open_plain(&self) -> Result<WalEngine<SchemaSerde>, WalError> {
        WalEngine::open(self.path(), &SchemaSerdeFactory::default(), self.config.clone())
    }

    /// Open with encryption under `config`, without recovering
    pub fn open_encrypted_with(&self, config: EncryptionConfig) -> Result<EncryptedWal, WalError> {
        let factory = EncryptedSerdeFactory::new(SchemaSerdeFactory::default(), config).unwrap();
        WalEngine::open(self.path(), &factory, self.config.clone())
    }

    pub fn open_encrypted(&self, active_key_id: &str) -> Result<EncryptedWal, WalError> {
        self.open_encrypted_with(keys(active_key_id))
    }

    /// Open encrypted and recover, returning the engine and its records
    pub fn encrypted(&self, active_key_id: &str) -> (EncryptedWal, Vec<Record>) {
        let engine = self.open_encrypted(active_key_id).unwrap();
        let records = engine.recover_records().unwrap();
        (engine, records)
    }

    pub fn plain(&self) -> (WalEngine<SchemaSerde>, Vec<Record>) {
        let engine = self.open_plain().unwrap();
        let records = engine.recover_records().unwrap();
        (engine, records)
    }

    /// The newest journal segment on disk
    pub fn active_journal(&self) -> PathBuf {
        let layout = self.layout();
        let generation = *layout.journal_generations().unwrap().last().unwrap();
        layout.journal_path(generation)
    }

    /// Every file in the store, concatenated
    pub fn all_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for entry in std::fs::read_dir(self.path()).unwrap() {
            bytes.extend(std::fs::read(entry.unwrap().path()).unwrap());
        }
        bytes
    }
}

/// Static keys K1 (AES-256) and K2 (AES-128), `active` used for new entries
pub fn keys(active: &str) -> EncryptionConfig {
    EncryptionConfig::with_static_keys(active, [("K1", KEY_1), ("K2", KEY_2)])
}

pub fn flow_record(id: u64) -> Record {
    Record::new(id, "queue-a")
        .with_attribute("filename", &format!("invoice-{id}.pdf"))
        .with_attribute("uuid", &format!("00000000-0000-0000-0000-{id:012}"))
        .with_claim(ClaimRef::new("default", "section-1", &format!("claim-{id}")).with_range(id * 10, 10))
}

pub fn ids(records: &[Record]) -> Vec<u64> {
    records.iter().map(|r| r.id.0).collect()
}

/// Byte ranges of the frames in `bytes` from `start`, in order
pub fn frame_ranges(bytes: &[u8], start: usize) -> Vec<(usize, usize)> {
    let mut offset = start;
    let mut frames = Vec::new();
    while offset + 8 <= bytes.len() {
        let len = u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
        frames.push((offset, offset + 8 + len));
        offset += 8 + len;
    }
    frames
}

/// Byte ranges of the entry frames in `journal`, header excluded
pub fn entry_frames<S: RecordSerde>(journal: &Path, serde: &S) -> Vec<(usize, usize)> {
    let bytes = std::fs::read(journal).unwrap();
    let start = FileHeader::for_serde(FileKind::Journal, serde).encoded_len().unwrap() as usize;
    frame_ranges(&bytes, start)
}

/// Recompute a frame's checksum after its payload was edited
pub fn reseal_frame(bytes: &mut [u8], (start, end): (usize, usize)) {
    let len = u32::try_from(end - start - 8).unwrap();
    let crc = fl_storage::frame::checksum(len, &bytes[start + 8..end]);
    bytes[start + 4..start + 8].copy_from_slice(&crc.to_be_bytes());
}
