// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash recovery specs
//!
//! Verify recovery after torn writes and interrupted checkpoints.

use crate::prelude::*;
use similar_asserts::assert_eq;
use std::io::Write;

#[test]
fn torn_final_write_is_discarded_and_appends_continue() {
    let store = Store::empty();
    {
        let (engine, _) = store.encrypted("K1");
        engine.update(&[flow_record(1), flow_record(2)], true).unwrap();
        engine.update(&[flow_record(3)], true).unwrap();
    }
    // Simulate a crash halfway through writing the last entry
    let journal = store.active_journal();
    let frames = {
        let engine = store.open_encrypted("K1").unwrap();
        entry_frames(&journal, engine.serde())
    };
    let (start, end) = frames[1];
    let bytes = std::fs::read(&journal).unwrap();
    std::fs::write(&journal, &bytes[..start + (end - start) / 2]).unwrap();

    {
        let (engine, records) = store.encrypted("K1");
        assert_eq!(ids(&records), vec![1, 2]);
        assert_eq!(std::fs::metadata(&journal).unwrap().len(), start as u64);
        engine.update(&[flow_record(4)], true).unwrap();
    }

    let (_, records) = store.encrypted("K1");
    assert_eq!(ids(&records), vec![1, 2, 4]);
}

#[test]
fn garbage_after_last_entry_is_truncated() {
    let store = Store::empty();
    {
        let (engine, _) = store.encrypted("K1");
        engine.update(&[flow_record(1)], true).unwrap();
    }
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(store.active_journal())
        .unwrap();
    file.write_all(&[0xde, 0xad]).unwrap();
    drop(file);

    let (engine, records) = store.encrypted("K1");

    assert_eq!(ids(&records), vec![1]);
    assert_eq!(engine.recovery_report().unwrap().truncated_bytes, 2);
}

#[test]
fn interrupted_checkpoint_falls_back_to_previous_state() {
    let store = Store::empty();
    {
        let (engine, _) = store.encrypted("K1");
        engine.update(&[flow_record(1)], true).unwrap();
        engine.checkpoint().unwrap();
        engine.update(&[flow_record(2)], true).unwrap();
    }
    // A checkpoint that crashed before its rename
    let layout = store.layout();
    let next = layout.max_generation().unwrap().unwrap() + 1;
    std::fs::write(layout.partial_checkpoint_path(next), b"partially written").unwrap();

    let (_, records) = store.encrypted("K1");

    assert_eq!(ids(&records), vec![1, 2]);
    assert!(layout.partial_files().unwrap().is_empty());
}

#[test]
fn unsynced_updates_are_flushed_by_shutdown() {
    let store = Store::empty();
    {
        let (engine, _) = store.plain();
        for id in 1..=5 {
            engine.update(&[flow_record(id)], false).unwrap();
        }
        engine.shutdown().unwrap();
    }

    let (_, records) = store.plain();
    assert_eq!(ids(&records), vec![1, 2, 3, 4, 5]);
}
