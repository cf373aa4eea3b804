// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fl-core: record model and serialization for the flow-unit write-ahead log
//!
//! This crate provides:
//! - The flow-unit `Record` and its lifecycle tags
//! - The `RecordSerde` capability the WAL engine is written against
//! - `SchemaSerde`, the versioned plaintext record encoding
//! - Wire helpers shared by every on-disk format

pub mod queue;
pub mod record;
pub mod record_serde;
pub mod schema;
pub mod wire;

pub use queue::QueueLookup;
pub use record::{ClaimRef, LifecycleTag, Record, RecordId};
pub use record_serde::{RecordSerde, SerdeError, SerdeFactory};
pub use schema::{SchemaSerde, SchemaSerdeFactory};
pub use wire::{DecodeError, LengthOverflow, WireReader};
