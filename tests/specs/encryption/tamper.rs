// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tamper detection specs
//!
//! Verify that modified bytes never come back as valid records.

use crate::prelude::*;
use similar_asserts::assert_eq;

/// Three single-record entries in one journal, returning its path and frames
fn three_entries(store: &Store) -> (PathBuf, Vec<(usize, usize)>) {
    {
        let (engine, _) = store.encrypted("K1");
        for id in 1..=3 {
            engine.update(&[flow_record(id)], true).unwrap();
        }
    }
    let journal = store.active_journal();
    let engine = store.open_encrypted("K1").unwrap();
    let frames = entry_frames(&journal, engine.serde());
    (journal, frames)
}

#[test]
fn stored_bytes_contain_no_plaintext() {
    let store = Store::empty();
    {
        let (engine, _) = store.encrypted("K1");
        engine.update(&[flow_record(1)], true).unwrap();
        engine.checkpoint().unwrap();
        engine.update(&[flow_record(2)], true).unwrap();
    }

    let bytes = store.all_bytes();
    for needle in [&b"invoice-1.pdf"[..], b"invoice-2.pdf", b"claim-1", b"queue-a"] {
        assert!(
            !bytes.windows(needle.len()).any(|w| w == needle),
            "found {:?} on disk",
            String::from_utf8_lossy(needle)
        );
    }
}

#[test]
fn flipped_bit_in_final_entry_drops_only_that_entry() {
    let store = Store::empty();
    let (journal, frames) = three_entries(&store);
    let mut bytes = std::fs::read(&journal).unwrap();
    let (_, end) = frames[2];
    bytes[end - 1] ^= 0x01;
    std::fs::write(&journal, bytes).unwrap();

    let (_, records) = store.encrypted("K1");

    assert_eq!(ids(&records), vec![1, 2]);
}

#[test]
fn flipped_bit_in_middle_entry_fails_recovery() {
    let store = Store::empty();
    let (journal, frames) = three_entries(&store);
    let mut bytes = std::fs::read(&journal).unwrap();
    let (start, end) = frames[1];
    bytes[(start + end) / 2] ^= 0x01;
    std::fs::write(&journal, bytes).unwrap();

    let engine = store.open_encrypted("K1").unwrap();
    let err = engine.recover_records().unwrap_err();

    assert!(
        matches!(err, WalError::ChecksumMismatch { offset, .. } if offset == start as u64),
        "unexpected error: {err}"
    );
}

#[test]
fn resealed_ciphertext_fails_authentication() {
    let store = Store::empty();
    let (journal, frames) = three_entries(&store);
    let mut bytes = std::fs::read(&journal).unwrap();
    let frame = frames[1];
    bytes[frame.1 - 1] ^= 0x01;
    reseal_frame(&mut bytes, frame);
    std::fs::write(&journal, bytes).unwrap();

    let engine = store.open_encrypted("K1").unwrap();
    let err = engine.recover_records().unwrap_err();

    assert!(err.is_authentication_failure(), "unexpected error: {err}");
}

#[test]
fn resealed_final_entry_still_fails_authentication() {
    let store = Store::empty();
    let (journal, frames) = three_entries(&store);
    let mut bytes = std::fs::read(&journal).unwrap();
    let frame = frames[2];
    bytes[frame.1 - 1] ^= 0x01;
    reseal_frame(&mut bytes, frame);
    std::fs::write(&journal, bytes).unwrap();

    let engine = store.open_encrypted("K1").unwrap();
    let err = engine.recover_records().unwrap_err();

    assert!(err.is_authentication_failure(), "unexpected error: {err}");
}

#[test]
fn resealed_checkpoint_fails_authentication() {
    let store = Store::empty();
    let generation = {
        let (engine, _) = store.encrypted("K1");
        engine.update(&[flow_record(1), flow_record(2)], true).unwrap();
        engine.checkpoint().unwrap().generation
    };

    let path = store.layout().checkpoint_path(generation);
    let mut bytes = std::fs::read(&path).unwrap();
    let serde = store.open_encrypted("K1").unwrap();
    let header_len = FileHeader::for_serde(FileKind::Checkpoint, serde.serde()).encoded_len().unwrap() as usize;
    drop(serde);
    // header, summary, one record batch, footer
    let frames = frame_ranges(&bytes, header_len);
    assert_eq!(frames.len(), 3);
    let batch = frames[1];
    bytes[batch.1 - 1] ^= 0x01;
    reseal_frame(&mut bytes, batch);
    std::fs::write(&path, bytes).unwrap();

    let engine = store.open_encrypted("K1").unwrap();
    let err = engine.recover_records().unwrap_err();

    assert!(err.is_authentication_failure(), "unexpected error: {err}");
}

#[test]
fn flipped_length_in_first_entry_fails_recovery_and_keeps_later_entries() {
    let store = Store::empty();
    let (journal, frames) = three_entries(&store);
    let mut bytes = std::fs::read(&journal).unwrap();
    let (start, _) = frames[0];
    bytes[start] ^= 0x80;
    std::fs::write(&journal, &bytes).unwrap();

    let engine = store.open_encrypted("K1").unwrap();
    let err = engine.recover_records().unwrap_err();
    drop(engine);

    assert!(
        matches!(err, WalError::Corruption { offset, .. } if offset == start as u64),
        "unexpected error: {err}"
    );
    assert_eq!(std::fs::read(&journal).unwrap(), bytes);
}
