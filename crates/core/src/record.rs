// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow-unit records as persisted by the WAL
//!
//! A record is the state of one flow unit plus the lifecycle tag of the
//! operation that produced the log entry. The tag describes that single
//! entry, not the flow unit's history.

use crate::wire::DecodeError;
use std::collections::BTreeMap;
use std::fmt;

/// Unique, stable identifier of a flow unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Operation that produced a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleTag {
    Create,
    Update,
    Delete,
    SwapIn,
    SwapOut,
}

impl LifecycleTag {
    pub fn as_byte(self) -> u8 {
        match self {
            LifecycleTag::Create => 1,
            LifecycleTag::Update => 2,
            LifecycleTag::Delete => 3,
            LifecycleTag::SwapIn => 4,
            LifecycleTag::SwapOut => 5,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, DecodeError> {
        match byte {
            1 => Ok(LifecycleTag::Create),
            2 => Ok(LifecycleTag::Update),
            3 => Ok(LifecycleTag::Delete),
            4 => Ok(LifecycleTag::SwapIn),
            5 => Ok(LifecycleTag::SwapOut),
            other => Err(DecodeError::InvalidLifecycleTag(other)),
        }
    }

    /// Whether entries with this tag must carry a swap location
    pub fn is_swap(self) -> bool {
        matches!(self, LifecycleTag::SwapIn | LifecycleTag::SwapOut)
    }
}

impl fmt::Display for LifecycleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleTag::Create => "CREATE",
            LifecycleTag::Update => "UPDATE",
            LifecycleTag::Delete => "DELETE",
            LifecycleTag::SwapIn => "SWAP_IN",
            LifecycleTag::SwapOut => "SWAP_OUT",
        };
        f.write_str(name)
    }
}

/// Reference to content held by the external claim manager
///
/// The WAL only stores the reference; it never reads or writes the content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClaimRef {
    pub container: String,
    pub section: String,
    pub identifier: String,
    pub offset: u64,
    pub length: u64,
}

impl ClaimRef {
    pub fn new(container: &str, section: &str, identifier: &str) -> Self {
        Self {
            container: container.to_string(),
            section: section.to_string(),
            identifier: identifier.to_string(),
            offset: 0,
            length: 0,
        }
    }

    pub fn with_range(mut self, offset: u64, length: u64) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }
}

/// One persisted flow-unit state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: RecordId,
    pub queue_id: String,
    pub attributes: BTreeMap<String, String>,
    pub claims: Vec<ClaimRef>,
    pub tag: LifecycleTag,
    /// Location of the swap file for SWAP_IN / SWAP_OUT entries
    pub swap_location: Option<String>,
}

impl Record {
    /// Create a record tagged CREATE with no attributes or claims
    pub fn new(id: impl Into<RecordId>, queue_id: &str) -> Self {
        Self {
            id: id.into(),
            queue_id: queue_id.to_string(),
            attributes: BTreeMap::new(),
            claims: Vec::new(),
            tag: LifecycleTag::Create,
            swap_location: None,
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_claim(mut self, claim: ClaimRef) -> Self {
        self.claims.push(claim);
        self
    }

    pub fn with_tag(mut self, tag: LifecycleTag) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_swap_location(mut self, location: &str) -> Self {
        self.swap_location = Some(location.to_string());
        self
    }

    /// This record as current state: tagged UPDATE, swap location cleared
    pub fn as_current_state(&self) -> Self {
        Self {
            tag: LifecycleTag::Update,
            swap_location: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
