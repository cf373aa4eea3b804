// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key providers
//!
//! A provider resolves a key id to symmetric key material. Providers are
//! chosen by name through [`key_provider_from_config`]; there is no global
//! registry.

use crate::config::{ConfigError, EncryptionConfig};
use crate::error::CryptoError;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// AES-128 and AES-256 key sizes
const VALID_KEY_LENGTHS: [usize; 2] = [16, 32];

/// Symmetric key bytes, erased from memory on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: Vec<u8>,
}

impl KeyMaterial {
    pub fn from_bytes(key_id: &str, bytes: &[u8]) -> Result<Self, CryptoError> {
        if !VALID_KEY_LENGTHS.contains(&bytes.len()) {
            return Err(CryptoError::InvalidKey {
                key_id: key_id.to_string(),
                reason: format!(
                    "expected 16 or 32 bytes, got {} bytes",
                    bytes.len()
                ),
            });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn from_hex(key_id: &str, hex_key: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(hex::decode(hex_key.trim()).map_err(|e| {
            ConfigError::InvalidKeyHex {
                key_id: key_id.to_string(),
                reason: e.to_string(),
            }
        })?);
        Self::from_bytes(key_id, &bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial({} bytes)", self.bytes.len())
    }
}

/// Resolves key ids to key material
pub trait KeyProvider: Send + Sync {
    /// Fetch a copy of the key; the copy is erased when the caller drops it
    fn key(&self, key_id: &str) -> Result<KeyMaterial, CryptoError>;

    fn key_exists(&self, key_id: &str) -> bool;

    fn key_ids(&self) -> Vec<String>;
}

/// Keys held directly in the configuration
#[derive(Debug, Default)]
pub struct StaticKeyProvider {
    keys: BTreeMap<String, KeyMaterial>,
}

impl StaticKeyProvider {
    pub fn new(keys: BTreeMap<String, KeyMaterial>) -> Self {
        Self { keys }
    }

    pub fn from_hex_map(map: &BTreeMap<String, String>) -> Result<Self, CryptoError> {
        let mut keys = BTreeMap::new();
        for (key_id, hex_key) in map {
            keys.insert(key_id.clone(), KeyMaterial::from_hex(key_id, hex_key)?);
        }
        Ok(Self { keys })
    }
}

impl KeyProvider for StaticKeyProvider {
    fn key(&self, key_id: &str) -> Result<KeyMaterial, CryptoError> {
        self.keys
            .get(key_id)
            .cloned()
            .ok_or_else(|| CryptoError::KeyNotFound(key_id.to_string()))
    }

    fn key_exists(&self, key_id: &str) -> bool {
        self.keys.contains_key(key_id)
    }

    fn key_ids(&self) -> Vec<String> {
        self.keys.keys().cloned().collect()
    }
}

/// Keys loaded from a file of `key_id=hex` lines
///
/// Blank lines and lines starting with `#` are ignored.
#[derive(Debug)]
pub struct FileKeyProvider {
    path: PathBuf,
    inner: StaticKeyProvider,
}

impl FileKeyProvider {
    pub fn load(path: &Path) -> Result<Self, CryptoError> {
        let content = Zeroizing::new(std::fs::read_to_string(path).map_err(ConfigError::from)?);
        let mut keys = BTreeMap::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key_id, hex_key)) = line.split_once('=') else {
                return Err(ConfigError::InvalidKeyHex {
                    key_id: format!("line {}", index + 1),
                    reason: "expected key_id=hex".to_string(),
                }
                .into());
            };
            let key_id = key_id.trim();
            keys.insert(key_id.to_string(), KeyMaterial::from_hex(key_id, hex_key)?);
        }

        tracing::debug!(path = %path.display(), keys = keys.len(), "loaded key file");

        Ok(Self {
            path: path.to_path_buf(),
            inner: StaticKeyProvider::new(keys),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyProvider for FileKeyProvider {
    fn key(&self, key_id: &str) -> Result<KeyMaterial, CryptoError> {
        self.inner.key(key_id)
    }

    fn key_exists(&self, key_id: &str) -> bool {
        self.inner.key_exists(key_id)
    }

    fn key_ids(&self) -> Vec<String> {
        self.inner.key_ids()
    }
}

/// Build the provider named by `key_provider_implementation`
///
/// Accepts `static` and `file` (case-insensitive). The active key id must
/// resolve in the resulting provider.
pub fn key_provider_from_config(
    config: &EncryptionConfig,
) -> Result<Arc<dyn KeyProvider>, CryptoError> {
    config.validate()?;

    let provider: Arc<dyn KeyProvider> =
        match config.key_provider_implementation.to_ascii_lowercase().as_str() {
            "static" | "static-key-provider" => {
                if config.key_map.is_empty() {
                    return Err(ConfigError::MissingField("key_map").into());
                }
                Arc::new(StaticKeyProvider::from_hex_map(&config.key_map)?)
            }
            "file" | "file-key-provider" => {
                if config.key_provider_location.trim().is_empty() {
                    return Err(ConfigError::MissingLocation {
                        provider: config.key_provider_implementation.clone(),
                    }
                    .into());
                }
                Arc::new(FileKeyProvider::load(Path::new(
                    config.key_provider_location.trim(),
                ))?)
            }
            other => return Err(ConfigError::UnknownProvider(other.to_string()).into()),
        };

    if !provider.key_exists(&config.active_key_id) {
        return Err(CryptoError::KeyNotFound(config.active_key_id.clone()));
    }

    Ok(provider)
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
