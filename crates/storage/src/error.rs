// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::engine::EngineState;
use fl_core::{LengthOverflow, RecordId, SerdeError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] SerdeError),
    #[error("failed to decode entry in {} at offset {offset}: {source}", .path.display())]
    Replay {
        path: PathBuf,
        offset: u64,
        #[source]
        source: SerdeError,
    },
    #[error("checksum mismatch in {} at offset {offset}", .path.display())]
    ChecksumMismatch { path: PathBuf, offset: u64 },
    #[error("corrupted {} at offset {offset}: {reason}", .path.display())]
    Corruption {
        path: PathBuf,
        offset: u64,
        reason: String,
    },
    #[error("{} was written by {found}, this WAL uses {expected}", .path.display())]
    EncodingMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error("storage directory {} is locked by another WAL", .0.display())]
    Locked(PathBuf),
    #[error("{operation} not allowed while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },
    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: RecordId, reason: String },
    #[error("journal entry of {len} bytes exceeds the {max} byte frame limit")]
    EntryTooLarge { len: usize, max: usize },
}

impl From<LengthOverflow> for WalError {
    fn from(err: LengthOverflow) -> Self {
        WalError::Serde(err.into())
    }
}

impl WalError {
    /// Whether this error comes from a failed decryption or an unknown key
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            WalError::Serde(SerdeError::Authentication { .. } | SerdeError::KeyNotFound(_))
                | WalError::Replay {
                    source: SerdeError::Authentication { .. } | SerdeError::KeyNotFound(_),
                    ..
                }
        )
    }
}
