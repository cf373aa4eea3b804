// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned plaintext record encoding
//!
//! ```text
//! [version u32][tag u8][id u64][queue id str]
//! [attribute count u32]([key str][value str])*
//! [claim count u32]([container str][section str][identifier str][offset u64][length u64])*
//! [has swap location u8]([swap location str])?
//! ```
//!
//! Attributes are written in key order, so equal records encode to equal bytes.

use crate::queue::QueueLookup;
use crate::record::{ClaimRef, LifecycleTag, Record, RecordId};
use crate::record_serde::{RecordSerde, SerdeError, SerdeFactory};
use crate::wire::{self, DecodeError, LengthOverflow, WireReader};
use std::collections::BTreeMap;

/// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

pub const ENCODING_NAME: &str = "schema-record-serde";

#[derive(Debug, Clone, Default)]
pub struct SchemaSerde {
    queues: QueueLookup,
}

impl SchemaSerde {
    pub fn new(queues: QueueLookup) -> Self {
        Self { queues }
    }

    fn encode(record: &Record, out: &mut Vec<u8>) -> Result<(), LengthOverflow> {
        wire::put_u32(out, SCHEMA_VERSION);
        wire::put_u8(out, record.tag.as_byte());
        wire::put_u64(out, record.id.0);
        wire::put_str(out, &record.queue_id, "queue id")?;

        wire::put_u32(out, wire::len_u32(record.attributes.len(), "attribute count")?);
        for (key, value) in &record.attributes {
            wire::put_str(out, key, "attribute key")?;
            wire::put_str(out, value, "attribute value")?;
        }

        wire::put_u32(out, wire::len_u32(record.claims.len(), "claim count")?);
        for claim in &record.claims {
            wire::put_str(out, &claim.container, "claim container")?;
            wire::put_str(out, &claim.section, "claim section")?;
            wire::put_str(out, &claim.identifier, "claim identifier")?;
            wire::put_u64(out, claim.offset);
            wire::put_u64(out, claim.length);
        }

        match &record.swap_location {
            Some(location) => {
                wire::put_u8(out, 1);
                wire::put_str(out, location, "swap location")?;
            }
            None => wire::put_u8(out, 0),
        }
        Ok(())
    }

    fn decode(input: &mut WireReader<'_>) -> Result<Record, DecodeError> {
        let version = input.read_u32("schema version")?;
        if version != SCHEMA_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }

        let tag = LifecycleTag::from_byte(input.read_u8("lifecycle tag")?)?;
        let id = RecordId(input.read_u64("record id")?);
        let queue_id = input.read_str("queue id")?;

        let attribute_count = input.read_u32("attribute count")?;
        let mut attributes = BTreeMap::new();
        for _ in 0..attribute_count {
            let key = input.read_str("attribute key")?;
            let value = input.read_str("attribute value")?;
            attributes.insert(key, value);
        }

        let claim_count = input.read_u32("claim count")? as usize;
        let mut claims = Vec::with_capacity(claim_count.min(input.remaining()));
        for _ in 0..claim_count {
            claims.push(ClaimRef {
                container: input.read_str("claim container")?,
                section: input.read_str("claim section")?,
                identifier: input.read_str("claim identifier")?,
                offset: input.read_u64("claim offset")?,
                length: input.read_u64("claim length")?,
            });
        }

        let swap_location = if input.read_flag("swap location flag")? {
            Some(input.read_str("swap location")?)
        } else {
            None
        };

        Ok(Record {
            id,
            queue_id,
            attributes,
            claims,
            tag,
            swap_location,
        })
    }
}

impl RecordSerde for SchemaSerde {
    fn encoding_name(&self) -> &str {
        ENCODING_NAME
    }

    fn version(&self) -> u32 {
        SCHEMA_VERSION
    }

    fn serialize_record(&self, record: &Record, out: &mut Vec<u8>) -> Result<(), SerdeError> {
        Ok(Self::encode(record, out)?)
    }

    fn deserialize_record(&self, input: &mut WireReader<'_>) -> Result<Record, SerdeError> {
        Ok(Self::decode(input)?)
    }

    fn resolves_queue(&self, queue_id: &str) -> bool {
        self.queues.contains(queue_id)
    }
}

/// Factory producing `SchemaSerde` instances bound to a queue lookup
#[derive(Debug, Clone, Default)]
pub struct SchemaSerdeFactory {
    queues: QueueLookup,
}

impl SchemaSerdeFactory {
    pub fn new(queues: QueueLookup) -> Self {
        Self { queues }
    }
}

impl SerdeFactory for SchemaSerdeFactory {
    type Serde = SchemaSerde;

    fn create_serde(&self) -> Result<SchemaSerde, SerdeError> {
        Ok(SchemaSerde::new(self.queues.clone()))
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
