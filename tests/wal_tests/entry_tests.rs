//! Tests for WAL Entry serialization and deserialization
//!
//! These tests verify:
//! - A batch survives serialization intact, in order
//! - CRC32 corruption detection
//! - Edge cases (truncation, malformed data, large values)

use rawkv::wal::{Operation, WalEntry, HEADER_SIZE};
use rawkv::KvError;

fn put(key: &[u8], value: &[u8]) -> Operation {
    Operation::Put {
        key: key.to_vec(),
        value: value.to_vec(),
    }
}

// =============================================================================
// Serialization Tests
// =============================================================================

#[test]
fn test_batch_preserves_order() {
    let entry = WalEntry::new(
        7,
        vec![
            put(b"a", b"1"),
            Operation::Delete { key: b"a".to_vec() },
            put(b"a", b"2"),
        ],
    );

    let bytes = entry.serialize().unwrap();
    let recovered = WalEntry::deserialize(&bytes).unwrap();

    assert_eq!(recovered, entry);
    assert_eq!(recovered.operations.len(), 3);
    assert!(matches!(recovered.operations[1], Operation::Delete { .. }));
}

#[test]
fn test_empty_key_and_value() {
    let entry = WalEntry::new(100, vec![put(b"", b""), put(b"k", b"")]);

    let bytes = entry.serialize().unwrap();
    assert_eq!(WalEntry::deserialize(&bytes).unwrap(), entry);
}

#[test]
fn test_header_layout() {
    let entry = WalEntry::new(0x0102_0304, vec![put(b"key", b"value")]);
    let bytes = entry.serialize().unwrap();

    assert_eq!(&bytes[0..8], &0x0102_0304u64.to_le_bytes());
    let body_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    assert_eq!(bytes.len(), HEADER_SIZE + body_len);
}

#[test]
fn test_large_value() {
    let large_value = vec![0xAB; 1024 * 1024]; // 1 MB value
    let entry = WalEntry::new(999, vec![put(b"big_key", &large_value)]);

    let bytes = entry.serialize().unwrap();
    let recovered = WalEntry::deserialize(&bytes).unwrap();

    match &recovered.operations[0] {
        Operation::Put { key, value } => {
            assert_eq!(key, b"big_key");
            assert_eq!(value, &large_value);
        }
        other => panic!("Expected Put operation, got {:?}", other),
    }
}

#[test]
fn test_lsn_preserved() {
    for lsn in [0, 1, u64::MAX, 12345678901234] {
        let entry = WalEntry::new(lsn, vec![Operation::Delete { key: b"key".to_vec() }]);
        let bytes = entry.serialize().unwrap();
        assert_eq!(WalEntry::deserialize(&bytes).unwrap().lsn, lsn);
    }
}

// =============================================================================
// Corruption Detection Tests
// =============================================================================

#[test]
fn test_crc_corruption_detected() {
    let entry = WalEntry::new(1, vec![put(b"key", b"value")]);
    let mut bytes = entry.serialize().unwrap();

    // Corrupt a byte in the data section
    if let Some(byte) = bytes.last_mut() {
        *byte ^= 0xFF;
    }

    let result = WalEntry::deserialize(&bytes);
    assert!(matches!(result, Err(KvError::WalCorruption(_))));
}

#[test]
fn test_crc_field_corruption_detected() {
    let entry = WalEntry::new(1, vec![put(b"key", b"value")]);
    let mut bytes = entry.serialize().unwrap();

    // CRC lives in bytes 8-11
    bytes[8] ^= 0xFF;

    assert!(matches!(
        WalEntry::deserialize(&bytes),
        Err(KvError::WalCorruption(_))
    ));
}

#[test]
fn test_lsn_mismatch_detected() {
    let entry = WalEntry::new(5, vec![put(b"key", b"value")]);
    let mut bytes = entry.serialize().unwrap();

    // Header LSN no longer matches the one inside the body
    bytes[0] = 6;

    assert!(matches!(
        WalEntry::deserialize(&bytes),
        Err(KvError::WalCorruption(_))
    ));
}

#[test]
fn test_truncated_entry() {
    let entry = WalEntry::new(1, vec![Operation::Delete { key: b"key".to_vec() }]);
    let bytes = entry.serialize().unwrap();

    assert!(WalEntry::deserialize(&bytes[..HEADER_SIZE + 2]).is_err());
}

#[test]
fn test_header_too_small() {
    assert!(WalEntry::deserialize(&[0u8; 10]).is_err());
    assert!(WalEntry::deserialize(&[]).is_err());
}

// =============================================================================
// Operation Helpers
// =============================================================================

#[test]
fn test_operation_key_and_size() {
    let op = put(b"key", b"value");
    assert_eq!(op.key(), b"key");
    assert_eq!(op.size(), 8);

    let op = Operation::Delete { key: b"gone".to_vec() };
    assert_eq!(op.key(), b"gone");
    assert_eq!(op.size(), 4);
}
