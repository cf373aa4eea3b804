// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fl-storage: sequential write-ahead log for flow-unit records
//!
//! ## Architecture
//!
//! ```text
//! update(records) → RecordSerde → frame → JournalWriter → journal-<gen>.wal
//!                                                              ↓
//! recover_records() ← RecordTable ← replay ← JournalReader ← checkpoint-<gen>.ckpt
//! ```
//!
//! ## Durability Guarantees
//!
//! - `update(records, true)` fsyncs before returning
//! - Every frame carries a CRC32 of its length prefix and payload
//! - An incomplete frame at the end of the newest segment is a torn write:
//!   replay stops there and the tail is truncated, unless a valid frame
//!   follows it
//! - Superseded checkpoints that are kept keep their journal segments
//! - Corruption anywhere else fails recovery instead of dropping data
//! - Checkpoints are written aside and swapped in with an atomic rename

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod layout;
pub mod reader;
pub mod state;
pub mod writer;

pub use checkpoint::{CheckpointMeta, CheckpointStore, LoadedCheckpoint, ReplayPosition};
pub use config::WalConfig;
pub use engine::{EngineState, RecoveryReport, WalEngine, WalStats};
pub use error::WalError;
pub use frame::{FileHeader, FileKind, FrameOutcome, FrameReader};
pub use layout::{DirectoryLock, StorageLayout};
pub use reader::JournalReader;
pub use state::RecordTable;
pub use writer::JournalWriter;
