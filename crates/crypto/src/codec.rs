// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AES-GCM authenticated encryption of record payloads
//!
//! Every call draws a fresh 96-bit nonce from the OS CSPRNG, so a nonce is
//! never reused for a key. The cipher is selected by key length (AES-128-GCM
//! or AES-256-GCM). Key material is fetched per call and erased when the call
//! returns; only the key id is ever written out.
//!
//! ```text
//! Header layout:
//! ┌──────────────────────────┬──────────────────┐
//! │ key id (u16 len + UTF-8) │ nonce (12 bytes) │
//! └──────────────────────────┴──────────────────┘
//! ```

use crate::error::CryptoError;
use crate::provider::{KeyMaterial, KeyProvider};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes128Gcm, Aes256Gcm, KeyInit};
use fl_core::wire::{self, DecodeError, LengthOverflow, WireReader};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;

/// AES-GCM nonce length in bytes
pub const NONCE_LENGTH: usize = 12;

/// AES-GCM authentication tag length in bytes
pub const TAG_LENGTH: usize = 16;

/// Self-describing prefix of every encrypted payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionHeader {
    pub key_id: String,
    pub nonce: [u8; NONCE_LENGTH],
}

impl EncryptionHeader {
    pub fn write(&self, out: &mut Vec<u8>) -> Result<(), LengthOverflow> {
        wire::put_short_str(out, &self.key_id, "encryption key id")?;
        out.extend_from_slice(&self.nonce);
        Ok(())
    }

    pub fn read(input: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        let key_id = input.read_short_str("encryption key id")?;
        let nonce = input.read_array::<NONCE_LENGTH>("encryption nonce")?;
        Ok(Self { key_id, nonce })
    }
}

enum Cipher {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

impl Cipher {
    fn new(key_id: &str, key: &KeyMaterial) -> Result<Self, CryptoError> {
        let invalid = || CryptoError::InvalidKey {
            key_id: key_id.to_string(),
            reason: format!("unsupported key length {}", key.len()),
        };
        match key.len() {
            16 => Aes128Gcm::new_from_slice(key.as_bytes())
                .map(Cipher::Aes128)
                .map_err(|_| invalid()),
            32 => Aes256Gcm::new_from_slice(key.as_bytes())
                .map(Cipher::Aes256)
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    fn encrypt(&self, nonce: &[u8; NONCE_LENGTH], plaintext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        let nonce = GenericArray::from_slice(nonce);
        match self {
            Cipher::Aes128(cipher) => cipher.encrypt(nonce, plaintext),
            Cipher::Aes256(cipher) => cipher.encrypt(nonce, plaintext),
        }
    }

    fn decrypt(&self, nonce: &[u8; NONCE_LENGTH], ciphertext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        let nonce = GenericArray::from_slice(nonce);
        match self {
            Cipher::Aes128(cipher) => cipher.decrypt(nonce, ciphertext),
            Cipher::Aes256(cipher) => cipher.decrypt(nonce, ciphertext),
        }
    }
}

/// Encrypts and decrypts payloads with keys from a provider
#[derive(Clone)]
pub struct EncryptionCodec {
    provider: Arc<dyn KeyProvider>,
}

impl EncryptionCodec {
    pub fn new(provider: Arc<dyn KeyProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &dyn KeyProvider {
        self.provider.as_ref()
    }

    /// Encrypt `plaintext` with the key named `key_id`
    ///
    /// Returns the header to store alongside the ciphertext; the ciphertext
    /// carries the 16-byte authentication tag at its end.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        key_id: &str,
    ) -> Result<(EncryptionHeader, Vec<u8>), CryptoError> {
        let key = self.provider.key(key_id)?;
        let cipher = Cipher::new(key_id, &key)?;

        let mut nonce = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CryptoError::Encryption {
                key_id: key_id.to_string(),
            })?;

        debug_assert_eq!(ciphertext.len(), plaintext.len() + TAG_LENGTH);

        Ok((
            EncryptionHeader {
                key_id: key_id.to_string(),
                nonce,
            },
            ciphertext,
        ))
    }

    /// Decrypt and authenticate a payload
    ///
    /// Fails with `KeyNotFound` if the header names an unknown key and with
    /// `Authentication` if the tag does not verify (tampering or wrong key).
    pub fn decrypt(
        &self,
        header: &EncryptionHeader,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let key = self.provider.key(&header.key_id)?;
        let cipher = Cipher::new(&header.key_id, &key)?;

        cipher
            .decrypt(&header.nonce, ciphertext)
            .map_err(|_| CryptoError::Authentication {
                key_id: header.key_id.clone(),
            })
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
