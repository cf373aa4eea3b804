// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory record table materialized from checkpoints and journal replay

use crate::error::WalError;
use fl_core::{LifecycleTag, Record, RecordId};
use std::collections::{BTreeMap, BTreeSet};

/// Current state of every live flow unit
///
/// Records are held as current state (tag UPDATE). Swap-outs move a record
/// out of the table and remember where its swap file lives.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordTable {
    records: BTreeMap<RecordId, Record>,
    swap_locations: BTreeSet<String>,
    max_record_id: Option<RecordId>,
}

impl RecordTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table from a checkpoint
    pub fn from_checkpoint(records: Vec<Record>, swap_locations: BTreeSet<String>) -> Self {
        let mut table = Self {
            swap_locations,
            ..Self::default()
        };
        for record in records {
            table.note_id(record.id);
            table.records.insert(record.id, record.as_current_state());
        }
        table
    }

    /// Apply one log entry
    pub fn apply(&mut self, record: &Record) {
        self.note_id(record.id);
        match record.tag {
            LifecycleTag::Create | LifecycleTag::Update => {
                self.records.insert(record.id, record.as_current_state());
            }
            LifecycleTag::Delete => {
                self.records.remove(&record.id);
            }
            LifecycleTag::SwapOut => {
                self.records.remove(&record.id);
                if let Some(location) = &record.swap_location {
                    self.swap_locations.insert(location.clone());
                }
            }
            LifecycleTag::SwapIn => {
                if let Some(location) = &record.swap_location {
                    self.swap_locations.remove(location);
                }
                self.records.insert(record.id, record.as_current_state());
            }
        }
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in id order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn swap_locations(&self) -> &BTreeSet<String> {
        &self.swap_locations
    }

    /// Largest id seen in any applied entry, including deleted records
    pub fn max_record_id(&self) -> Option<RecordId> {
        self.max_record_id
    }

    /// Drop records whose queue fails `keep`, returning how many were dropped
    pub fn retain_queues(&mut self, keep: impl Fn(&str) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| keep(&record.queue_id));
        before - self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.swap_locations.clear();
    }

    fn note_id(&mut self, id: RecordId) {
        self.max_record_id = Some(self.max_record_id.map_or(id, |max| max.max(id)));
    }
}

/// Reject entries the table could not apply faithfully
pub fn validate_record(record: &Record) -> Result<(), WalError> {
    if record.tag.is_swap() && record.swap_location.is_none() {
        return Err(WalError::InvalidRecord {
            id: record.id,
            reason: format!("{} entry without a swap location", record.tag),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
