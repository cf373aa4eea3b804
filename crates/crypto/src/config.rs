// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Encryption configuration
//!
//! Built once when the WAL is opened and never changed afterwards. Rotating
//! `active_key_id` only affects new entries; existing entries keep the key id
//! written in their header.
//!
//! ```toml
//! key_provider_implementation = "static"
//! key_provider_location = ""
//! active_key_id = "K2"
//! target_repository_implementation = "encrypted-sequential-wal"
//!
//! [key_map]
//! K1 = "0123…"   # 32 or 64 hex characters
//! K2 = "4567…"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Repository implementation an encryption config must target
pub const ENCRYPTED_WAL_IMPLEMENTATION: &str = "encrypted-sequential-wal";

/// Longest key id an encryption header can carry
pub const MAX_KEY_ID_LEN: usize = u16::MAX as usize;

/// Reject key ids that would not fit an encryption header
pub fn check_key_id(key_id: &str) -> Result<(), ConfigError> {
    if key_id.len() > MAX_KEY_ID_LEN {
        return Err(ConfigError::KeyIdTooLong {
            len: key_id.len(),
            max: MAX_KEY_ID_LEN,
        });
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("unknown key provider implementation: {0}")]
    UnknownProvider(String),
    #[error("key provider {provider} requires a location")]
    MissingLocation { provider: String },
    #[error("configuration targets {found}, expected {expected}")]
    WrongTarget { expected: String, found: String },
    #[error("invalid hex key material for {key_id}: {reason}")]
    InvalidKeyHex { key_id: String, reason: String },
    #[error("key id of {len} bytes exceeds the {max} byte limit")]
    KeyIdTooLong { len: usize, max: usize },
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionConfig {
    pub key_provider_implementation: String,
    /// Path or URL for providers that load keys externally; empty for `static`
    #[serde(default)]
    pub key_provider_location: String,
    pub active_key_id: String,
    /// Key id → hex-encoded key material
    #[serde(default)]
    pub key_map: BTreeMap<String, String>,
    pub target_repository_implementation: String,
}

impl EncryptionConfig {
    /// Configuration for the static in-config provider
    pub fn with_static_keys<I, K, V>(active_key_id: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            key_provider_implementation: "static".to_string(),
            key_provider_location: String::new(),
            active_key_id: active_key_id.to_string(),
            key_map: keys
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            target_repository_implementation: ENCRYPTED_WAL_IMPLEMENTATION.to_string(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check required fields are present
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_provider_implementation.trim().is_empty() {
            return Err(ConfigError::MissingField("key_provider_implementation"));
        }
        if self.active_key_id.trim().is_empty() {
            return Err(ConfigError::MissingField("active_key_id"));
        }
        if self.target_repository_implementation.trim().is_empty() {
            return Err(ConfigError::MissingField("target_repository_implementation"));
        }
        check_key_id(&self.active_key_id)?;
        for key_id in self.key_map.keys() {
            check_key_id(key_id)?;
        }
        Ok(())
    }

    /// Reject configurations written for a different repository implementation
    pub fn validate_target(&self, expected: &str) -> Result<(), ConfigError> {
        if self.target_repository_implementation != expected {
            return Err(ConfigError::WrongTarget {
                expected: expected.to_string(),
                found: self.target_repository_implementation.clone(),
            });
        }
        Ok(())
    }
}

// Key material never reaches logs
impl fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key_provider_implementation", &self.key_provider_implementation)
            .field("key_provider_location", &self.key_provider_location)
            .field("active_key_id", &self.active_key_id)
            .field("key_ids", &self.key_map.keys().collect::<Vec<_>>())
            .field(
                "target_repository_implementation",
                &self.target_repository_implementation,
            )
            .finish()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
