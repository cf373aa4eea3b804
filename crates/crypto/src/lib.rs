// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fl-crypto: encryption layer for the flow-unit WAL
//!
//! ```text
//! EncryptionConfig → key_provider_from_config → KeyProvider
//!                                                   ↓
//! Record → delegate serde → plaintext → EncryptionCodec → [header][len][ciphertext]
//! ```
//!
//! `EncryptedSerde` wraps any `RecordSerde`, so the WAL engine stays unaware
//! that encryption is happening.

pub mod codec;
pub mod config;
pub mod encrypted;
pub mod error;
pub mod provider;

pub use codec::{EncryptionCodec, EncryptionHeader, NONCE_LENGTH, TAG_LENGTH};
pub use config::{ConfigError, EncryptionConfig, ENCRYPTED_WAL_IMPLEMENTATION, MAX_KEY_ID_LEN};
pub use encrypted::{EncryptedSerde, EncryptedSerdeFactory};
pub use error::CryptoError;
pub use provider::{
    key_provider_from_config, FileKeyProvider, KeyMaterial, KeyProvider, StaticKeyProvider,
};
