// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The serde capability the WAL engine is written against
//!
//! The engine only sees a `RecordSerde`. Whether records are stored in plain
//! schema form or wrapped in encryption is decided by whoever builds the
//! serde, so the journal format never changes with the cipher.

use crate::record::Record;
use crate::wire::{self, DecodeError, LengthOverflow, WireReader};
use thiserror::Error;

/// Errors from serializing or deserializing records
#[derive(Debug, Error)]
pub enum SerdeError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("encode error: {0}")]
    Length(#[from] LengthOverflow),
    #[error("authentication failed for entry encrypted with key {key_id}")]
    Authentication { key_id: String },
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("encryption error: {0}")]
    Encryption(String),
}

/// Serializer/deserializer pair for records
///
/// Records are written to and read from a byte stream so implementations can
/// wrap one another. A batch is a `u32` record count followed by the records.
pub trait RecordSerde: Send + Sync {
    /// Name stored in journal and checkpoint headers
    fn encoding_name(&self) -> &str;

    fn version(&self) -> u32;

    fn serialize_record(&self, record: &Record, out: &mut Vec<u8>) -> Result<(), SerdeError>;

    fn deserialize_record(&self, input: &mut WireReader<'_>) -> Result<Record, SerdeError>;

    /// Whether the queue owning a recovered record is still known
    fn resolves_queue(&self, _queue_id: &str) -> bool {
        true
    }

    fn serialize_batch(&self, records: &[Record]) -> Result<Vec<u8>, SerdeError> {
        let mut out = Vec::new();
        wire::put_u32(&mut out, wire::len_u32(records.len(), "batch record count")?);
        for record in records {
            self.serialize_record(record, &mut out)?;
        }
        Ok(out)
    }

    /// Decode a whole batch; the payload must be consumed exactly
    fn deserialize_batch(&self, bytes: &[u8]) -> Result<Vec<Record>, SerdeError> {
        let mut input = WireReader::new(bytes);
        let count = input.read_u32("batch record count")? as usize;
        // Count comes from disk; cap the preallocation by what could fit
        let mut records = Vec::with_capacity(count.min(input.remaining()));
        for _ in 0..count {
            records.push(self.deserialize_record(&mut input)?);
        }
        input.finish()?;
        Ok(records)
    }
}

/// Builds the serde a WAL instance uses for its whole lifetime
pub trait SerdeFactory {
    type Serde: RecordSerde;

    fn create_serde(&self) -> Result<Self::Serde, SerdeError>;
}
