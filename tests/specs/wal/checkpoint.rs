// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoint specs
//!
//! Verify that checkpointing never changes what recovery returns.

use crate::prelude::*;
use similar_asserts::assert_eq;

fn workload(engine: &EncryptedWal, checkpoint_at: Option<u64>) {
    for id in 1..=60 {
        engine.update(&[flow_record(id)], false).unwrap();
        if id % 4 == 0 {
            engine
                .update(&[flow_record(id - 1).with_tag(LifecycleTag::Delete)], false)
                .unwrap();
        }
        if checkpoint_at == Some(id) {
            engine.checkpoint().unwrap();
        }
    }
}

#[test]
fn checkpoint_then_recover_equals_replay() {
    let checkpointed = Store::empty();
    let replayed = Store::empty();
    {
        let (engine, _) = checkpointed.encrypted("K1");
        workload(&engine, Some(30));
    }
    {
        let (engine, _) = replayed.encrypted("K1");
        workload(&engine, None);
    }

    let (_, a) = checkpointed.encrypted("K1");
    let (_, b) = replayed.encrypted("K1");
    assert_eq!(a, b);
    assert_eq!(a.len(), 45);
}

#[test]
fn checkpoint_removes_covered_journal_segments() {
    let store = Store::empty();
    let (engine, _) = store.encrypted("K1");
    engine.update(&[flow_record(1)], true).unwrap();

    let meta = engine.checkpoint().unwrap();

    assert_eq!(
        store.layout().journal_generations().unwrap(),
        vec![meta.generation]
    );
    assert!(store.layout().checkpoint_path(meta.generation).exists());
    assert!(store.layout().partial_files().unwrap().is_empty());
}

#[test]
fn hundred_thousand_records_with_checkpoints() {
    let store = Store::with_config(WalConfig::default().with_max_journal_records(40_000));
    let total = 100_000u64;
    {
        let (engine, _) = store.encrypted("K1");
        let ids: Vec<u64> = (1..=total).collect();
        for chunk in ids.chunks(1000) {
            let batch: Vec<Record> = chunk.iter().map(|id| flow_record(*id)).collect();
            engine.update(&batch, false).unwrap();
        }
        assert_eq!(engine.stats().checkpoints_taken, 2);
        engine.shutdown().unwrap();
    }

    let (engine, records) = store.encrypted("K1");

    assert_eq!(records.len() as u64, total);
    assert_eq!(records.first().map(|r| r.id), Some(RecordId(1)));
    assert_eq!(records.last().map(|r| r.id), Some(RecordId(total)));
    assert_eq!(records[41_999], flow_record(42_000).as_current_state());
    assert_eq!(engine.recovery_report().unwrap().checkpoint_records, 80_000);
}
