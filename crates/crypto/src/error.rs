// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::config::ConfigError;
use fl_core::SerdeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("authentication failed for key {key_id}")]
    Authentication { key_id: String },
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("invalid key material for {key_id}: {reason}")]
    InvalidKey { key_id: String, reason: String },
    #[error("encryption failed with key {key_id}")]
    Encryption { key_id: String },
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<CryptoError> for SerdeError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Authentication { key_id } => SerdeError::Authentication { key_id },
            CryptoError::KeyNotFound(key_id) => SerdeError::KeyNotFound(key_id),
            other => SerdeError::Encryption(other.to_string()),
        }
    }
}
