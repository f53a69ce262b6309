//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Recovery from a clean WAL (no corruption)
//! - Recovery from an empty WAL
//! - Recovery with partial writes (truncated tail, file is cut back)
//! - Recovery with corrupted entries (CRC mismatch, skipped and counted)
//! - Verify mode (stats only, file untouched)

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use rawkv::config::WalSyncStrategy;
use rawkv::wal::{Operation, WalEntry, WalRecovery, WalWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

/// Write batches using WalWriter (produces a well-formed WAL)
fn write_entries_via_writer(path: &PathBuf, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer
            .append(vec![Operation::Put {
                key: format!("key{}", i).into_bytes(),
                value: format!("value{}", i).into_bytes(),
            }])
            .unwrap();
    }
}

fn entry(lsn: u64) -> WalEntry {
    WalEntry::new(
        lsn,
        vec![Operation::Put {
            key: format!("k{}", lsn).into_bytes(),
            value: format!("v{}", lsn).into_bytes(),
        }],
    )
}

fn write_raw(path: &PathBuf, chunks: &[&[u8]]) {
    let mut file = File::create(path).unwrap();
    for chunk in chunks {
        file.write_all(chunk).unwrap();
    }
    file.sync_all().unwrap();
}

// =============================================================================
// Clean WAL Tests
// =============================================================================

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_multiple_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 10);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 10);
    assert_eq!(result.entries_recovered, 10);
    assert_eq!(result.last_lsn, 10);
    assert!(!result.was_truncated);

    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.lsn, (i + 1) as u64);
    }
}

#[test]
fn test_recover_keeps_batches_whole() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer
            .append(vec![
                Operation::Put { key: b"k1".to_vec(), value: b"v1".to_vec() },
                Operation::Delete { key: b"k1".to_vec() },
                Operation::Put { key: b"k2".to_vec(), value: b"v2".to_vec() },
            ])
            .unwrap();
    }

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 1);
    assert_eq!(entries[0].operations.len(), 3);
    assert!(matches!(entries[0].operations[1], Operation::Delete { .. }));
}

// =============================================================================
// Partial Write Tests
// =============================================================================

#[test]
fn test_recover_partial_header_cuts_file() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = entry(1).serialize().unwrap();
    write_raw(&wal_path, &[good.as_slice(), [0u8; 8].as_slice()]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(result.last_lsn, 1);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), good.len() as u64);
}

#[test]
fn test_recover_partial_data_cuts_file() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = entry(1).serialize().unwrap();
    let mut bad = entry(2).serialize().unwrap();
    bad.truncate(20); // Header is 16 bytes, only 4 bytes of data
    write_raw(&wal_path, &[good.as_slice(), bad.as_slice()]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), good.len() as u64);

    // A second recovery finds a clean file
    let (_, again) = WalRecovery::recover(&wal_path).unwrap();
    assert!(!again.was_truncated);
    assert_eq!(again.entries_recovered, 1);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_recover_skips_corrupted_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let first = entry(1).serialize().unwrap();
    let mut second = entry(2).serialize().unwrap();
    let third = entry(3).serialize().unwrap();
    let last = second.len() - 1;
    second[last] ^= 0xFF;
    write_raw(&wal_path, &[first.as_slice(), second.as_slice(), third.as_slice()]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    let lsns: Vec<u64> = entries.iter().map(|e| e.lsn).collect();
    assert_eq!(lsns, vec![1, 3]);
    assert_eq!(result.entries_recovered, 2);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 3);
    assert!(!result.was_truncated);
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_leaves_file_alone() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = entry(1).serialize().unwrap();
    write_raw(&wal_path, &[good.as_slice(), [0u8; 5].as_slice()]);

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 1);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), good.len() as u64 + 5);
}

#[test]
fn test_recover_and_verify_agree() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 20);

    let verify_result = WalRecovery::verify(&wal_path).unwrap();
    let (entries, recover_result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), recover_result.entries_recovered as usize);
    assert_eq!(recover_result.entries_recovered, verify_result.entries_recovered);
    assert_eq!(recover_result.entries_corrupted, verify_result.entries_corrupted);
    assert_eq!(recover_result.last_lsn, verify_result.last_lsn);
    assert_eq!(recover_result.was_truncated, verify_result.was_truncated);
}
