// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only view of the queues that own records
//!
//! The owning collaborator builds a lookup before opening the WAL and hands
//! it to the serde factory. The WAL never mutates it.

use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct QueueLookup {
    // None accepts every queue id
    known: Option<Arc<BTreeSet<String>>>,
}

impl QueueLookup {
    /// A lookup that resolves every queue id
    pub fn any() -> Self {
        Self { known: None }
    }

    /// A lookup restricted to the given queue ids
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: Some(Arc::new(ids.into_iter().map(Into::into).collect())),
        }
    }

    pub fn contains(&self, queue_id: &str) -> bool {
        match &self.known {
            Some(known) => known.contains(queue_id),
            None => true,
        }
    }

    /// Whether this lookup accepts every queue id
    pub fn is_open(&self) -> bool {
        self.known.is_none()
    }
}
