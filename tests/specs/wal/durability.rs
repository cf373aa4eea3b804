// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durability specs
//!
//! Verify that acknowledged updates survive shutdown and reopen.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn empty_store_recovers_nothing() {
    let store = Store::empty();
    let (engine, records) = store.encrypted("K1");

    assert!(records.is_empty());
    assert_eq!(engine.state(), EngineState::Open);
    assert_eq!(engine.max_record_id(), None);
}

#[test]
fn synced_updates_survive_reopen() {
    let store = Store::empty();
    let written: Vec<Record> = (1..=20).map(flow_record).collect();
    {
        let (engine, _) = store.encrypted("K1");
        for chunk in written.chunks(7) {
            engine.update(chunk, true).unwrap();
        }
        engine.shutdown().unwrap();
    }

    let (_, recovered) = store.encrypted("K1");

    let expected: Vec<Record> = written.iter().map(Record::as_current_state).collect();
    assert_eq!(recovered, expected);
}

#[test]
fn recovered_records_are_tagged_update() {
    let store = Store::empty();
    {
        let (engine, _) = store.encrypted("K1");
        engine.update(&[flow_record(1)], true).unwrap();
        engine
            .update(&[flow_record(2).with_tag(LifecycleTag::Update)], true)
            .unwrap();
        engine
            .update(
                &[flow_record(3)
                    .with_tag(LifecycleTag::SwapIn)
                    .with_swap_location("/swap/3")],
                true,
            )
            .unwrap();
    }

    let (_, records) = store.encrypted("K1");

    assert_eq!(ids(&records), vec![1, 2, 3]);
    for record in &records {
        assert_eq!(record.tag, LifecycleTag::Update);
        assert_eq!(record.swap_location, None);
    }
}

#[test]
fn deleted_and_swapped_out_records_stay_gone() {
    let store = Store::empty();
    {
        let (engine, _) = store.encrypted("K1");
        engine
            .update(&[flow_record(1), flow_record(2), flow_record(3)], true)
            .unwrap();
        engine
            .update(
                &[
                    flow_record(1).with_tag(LifecycleTag::Delete),
                    flow_record(3)
                        .with_tag(LifecycleTag::SwapOut)
                        .with_swap_location("/swap/batch-7"),
                ],
                true,
            )
            .unwrap();
    }

    let (engine, records) = store.encrypted("K1");

    assert_eq!(ids(&records), vec![2]);
    assert!(engine.recovered_swap_locations().contains("/swap/batch-7"));
    assert_eq!(engine.max_record_id(), Some(RecordId(3)));
}

#[test]
fn shutdown_twice_is_harmless() {
    let store = Store::empty();
    let (engine, _) = store.encrypted("K1");
    engine.update(&[flow_record(1)], true).unwrap();

    engine.shutdown().unwrap();
    engine.shutdown().unwrap();

    assert_eq!(engine.state(), EngineState::Closed);
}

#[test]
fn directory_is_exclusive_while_open() {
    let store = Store::empty();
    let (engine, _) = store.encrypted("K1");

    assert!(matches!(store.open_encrypted("K1"), Err(WalError::Locked(_))));

    engine.shutdown().unwrap();
    assert!(store.open_encrypted("K1").is_ok());
}

#[test]
fn plaintext_store_cannot_be_opened_encrypted() {
    let store = Store::empty();
    {
        let (engine, _) = store.plain();
        engine.update(&[flow_record(1)], true).unwrap();
    }

    let engine = store.open_encrypted("K1").unwrap();
    assert!(matches!(
        engine.recover_records(),
        Err(WalError::EncodingMismatch { .. })
    ));
}
