// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key management specs
//!
//! Verify key rotation, missing keys and file-based configuration.

use crate::prelude::*;
use similar_asserts::assert_eq;

/// Key id recorded in the first encrypted record of a journal entry frame
fn key_id_of(bytes: &[u8], (start, _): (usize, usize)) -> String {
    // frame header (8), record count (4), key id length (2)
    let payload = start + 8 + 4;
    let len = u16::from_be_bytes([bytes[payload], bytes[payload + 1]]) as usize;
    String::from_utf8(bytes[payload + 2..payload + 2 + len].to_vec()).unwrap()
}

#[test]
fn rotating_active_key_keeps_old_entries_readable() {
    let store = Store::empty();
    {
        let (engine, _) = store.encrypted("K1");
        engine.update(&[flow_record(1)], true).unwrap();
    }
    {
        let (engine, records) = store.encrypted("K2");
        assert_eq!(ids(&records), vec![1]);
        engine.update(&[flow_record(2)], true).unwrap();
    }

    let journal = store.active_journal();
    let bytes = std::fs::read(&journal).unwrap();
    let engine = store.open_encrypted("K2").unwrap();
    let frames = entry_frames(&journal, engine.serde());
    assert_eq!(key_id_of(&bytes, frames[0]), "K1");
    assert_eq!(key_id_of(&bytes, frames[1]), "K2");

    let records = engine.recover_records().unwrap();
    assert_eq!(records, vec![
        flow_record(1).as_current_state(),
        flow_record(2).as_current_state(),
    ]);
}

#[test]
fn entry_under_unknown_key_fails_recovery() {
    let store = Store::empty();
    {
        let (engine, _) = store.encrypted("K2");
        engine.update(&[flow_record(1)], true).unwrap();
    }

    let only_k1 = EncryptionConfig::with_static_keys("K1", [("K1", KEY_1)]);
    let engine = store.open_encrypted_with(only_k1).unwrap();
    let err = engine.recover_records().unwrap_err();

    assert!(err.is_authentication_failure(), "unexpected error: {err}");
}

#[test]
fn missing_active_key_fails_open() {
    let store = Store::empty();
    let config = EncryptionConfig::with_static_keys("K9", [("K1", KEY_1)]);

    assert!(matches!(
        store.open_encrypted_with(config),
        Err(WalError::Serde(_))
    ));
}

#[test]
fn toml_config_with_key_file() {
    let store = Store::empty();
    let config_dir = tempfile::TempDir::new().unwrap();
    let key_file = config_dir.path().join("wal.keys");
    std::fs::write(&key_file, format!("# rotated 2026-10\nK1={KEY_1}\nK2={KEY_2}\n")).unwrap();
    let config_path = config_dir.path().join("wal.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
key_provider_implementation = "file"
key_provider_location = "{}"
active_key_id = "K2"
target_repository_implementation = "encrypted-sequential-wal"
"#,
            key_file.display()
        ),
    )
    .unwrap();

    let config = EncryptionConfig::load(&config_path).unwrap();
    {
        let engine = store.open_encrypted_with(config.clone()).unwrap();
        engine.recover_records().unwrap();
        engine.update(&[flow_record(7)], true).unwrap();
    }

    let engine = store.open_encrypted_with(config).unwrap();
    assert_eq!(ids(&engine.recover_records().unwrap()), vec![7]);

    // The same store is readable through static keys holding K2
    drop(engine);
    let (_, records) = store.encrypted("K1");
    assert_eq!(ids(&records), vec![7]);
}
