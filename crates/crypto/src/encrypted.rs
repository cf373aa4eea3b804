// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Encrypting wrapper around any record serde
//!
//! Each record is written as
//!
//! ```text
//! [key id: u16 len + UTF-8][nonce: 12 bytes][payload len: u32][ciphertext + tag]
//! ```
//!
//! where the plaintext is the delegate's encoding of the record. The
//! delegate must consume the decrypted plaintext exactly.

use crate::codec::{EncryptionCodec, EncryptionHeader};
use crate::config::{check_key_id, EncryptionConfig, ENCRYPTED_WAL_IMPLEMENTATION};
use crate::error::CryptoError;
use crate::provider::key_provider_from_config;
use fl_core::wire::{self, WireReader};
use fl_core::{Record, RecordSerde, SerdeError, SerdeFactory};

/// Version of the encrypted framing, independent of the delegate's version
pub const ENCRYPTED_SERDE_VERSION: u32 = 1;

pub struct EncryptedSerde<S> {
    delegate: S,
    codec: EncryptionCodec,
    active_key_id: String,
    encoding_name: String,
}

impl<S: RecordSerde> EncryptedSerde<S> {
    /// Wrap `delegate`, encrypting new records with `active_key_id`
    pub fn new(delegate: S, codec: EncryptionCodec, active_key_id: &str) -> Result<Self, CryptoError> {
        check_key_id(active_key_id)?;
        if !codec.provider().key_exists(active_key_id) {
            return Err(CryptoError::KeyNotFound(active_key_id.to_string()));
        }
        let encoding_name = format!("encrypted-{}", delegate.encoding_name());
        Ok(Self {
            delegate,
            codec,
            active_key_id: active_key_id.to_string(),
            encoding_name,
        })
    }

    pub fn delegate(&self) -> &S {
        &self.delegate
    }

    pub fn active_key_id(&self) -> &str {
        &self.active_key_id
    }
}

impl<S: RecordSerde> RecordSerde for EncryptedSerde<S> {
    fn encoding_name(&self) -> &str {
        &self.encoding_name
    }

    fn version(&self) -> u32 {
        ENCRYPTED_SERDE_VERSION
    }

    fn serialize_record(&self, record: &Record, out: &mut Vec<u8>) -> Result<(), SerdeError> {
        let mut plaintext = Vec::new();
        self.delegate.serialize_record(record, &mut plaintext)?;

        let (header, ciphertext) = self.codec.encrypt(&plaintext, &self.active_key_id)?;
        header.write(out)?;
        wire::put_u32(out, wire::len_u32(ciphertext.len(), "ciphertext")?);
        out.extend_from_slice(&ciphertext);
        Ok(())
    }

    fn deserialize_record(&self, input: &mut WireReader<'_>) -> Result<Record, SerdeError> {
        let header = EncryptionHeader::read(input)?;
        let len = input.read_u32("ciphertext length")? as usize;
        let ciphertext = input.read_bytes(len, "ciphertext")?;

        let plaintext = self.codec.decrypt(&header, ciphertext)?;
        let mut inner = WireReader::new(&plaintext);
        let record = self.delegate.deserialize_record(&mut inner)?;
        inner.finish()?;
        Ok(record)
    }

    fn resolves_queue(&self, queue_id: &str) -> bool {
        self.delegate.resolves_queue(queue_id)
    }
}

/// Builds `EncryptedSerde` instances around a delegate factory
pub struct EncryptedSerdeFactory<F> {
    delegate: F,
    config: EncryptionConfig,
}

impl<F: SerdeFactory> EncryptedSerdeFactory<F> {
    /// Fails if the configuration targets another repository implementation
    pub fn new(delegate: F, config: EncryptionConfig) -> Result<Self, CryptoError> {
        config.validate()?;
        config.validate_target(ENCRYPTED_WAL_IMPLEMENTATION)?;
        Ok(Self { delegate, config })
    }

    pub fn config(&self) -> &EncryptionConfig {
        &self.config
    }
}

impl<F: SerdeFactory> SerdeFactory for EncryptedSerdeFactory<F> {
    type Serde = EncryptedSerde<F::Serde>;

    fn create_serde(&self) -> Result<Self::Serde, SerdeError> {
        let provider = key_provider_from_config(&self.config)?;
        let delegate = self.delegate.create_serde()?;
        tracing::debug!(
            provider = %self.config.key_provider_implementation,
            active_key_id = %self.config.active_key_id,
            "building encrypted record serde"
        );
        Ok(EncryptedSerde::new(
            delegate,
            EncryptionCodec::new(provider),
            &self.config.active_key_id,
        )?)
    }
}

#[cfg(test)]
#[path = "encrypted_tests.rs"]
mod tests;
