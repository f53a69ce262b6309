//! Tests for the value log

use rawkv::engine::vlog::{ValueLog, ValuePointer, POINTER_SIZE};
use rawkv::KvError;
use tempfile::TempDir;

fn setup_temp_vlog() -> (TempDir, ValueLog) {
    let temp_dir = TempDir::new().unwrap();
    let vlog = ValueLog::open(&temp_dir.path().join("values.vlog")).unwrap();
    (temp_dir, vlog)
}

#[test]
fn test_append_and_read() {
    let (_temp, vlog) = setup_temp_vlog();
    assert!(vlog.is_empty());

    let p1 = vlog.append(b"first value").unwrap();
    let p2 = vlog.append(b"").unwrap();
    let p3 = vlog.append(&[7u8; 10_000]).unwrap();

    assert_eq!(p1.offset, 0);
    assert_eq!(p1.len, 11);
    assert!(p2.offset > p1.offset);
    assert!(p3.offset > p2.offset);

    assert_eq!(vlog.read(p1).unwrap(), b"first value".to_vec());
    assert_eq!(vlog.read(p2).unwrap(), Vec::<u8>::new());
    assert_eq!(vlog.read(p3).unwrap(), vec![7u8; 10_000]);
    assert!(!vlog.is_empty());
}

#[test]
fn test_reopen_keeps_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("values.vlog");

    let ptr = {
        let vlog = ValueLog::open(&path).unwrap();
        let ptr = vlog.append(b"durable").unwrap();
        vlog.sync().unwrap();
        ptr
    };

    let vlog = ValueLog::open(&path).unwrap();
    assert_eq!(vlog.read(ptr).unwrap(), b"durable".to_vec());

    // New appends go after the existing records
    let next = vlog.append(b"more").unwrap();
    assert!(next.offset > ptr.offset);
    assert_eq!(vlog.path(), path.as_path());
}

#[test]
fn test_pointer_beyond_end_is_corruption() {
    let (_temp, vlog) = setup_temp_vlog();
    let ptr = vlog.append(b"abc").unwrap();

    let bogus = ValuePointer {
        offset: ptr.offset,
        len: 1000,
    };
    assert!(matches!(vlog.read(bogus), Err(KvError::Corruption(_))));
}

#[test]
fn test_length_mismatch_is_corruption() {
    let (_temp, vlog) = setup_temp_vlog();
    vlog.append(b"abcdef").unwrap();

    let shorter = ValuePointer { offset: 0, len: 2 };
    assert!(matches!(vlog.read(shorter), Err(KvError::Corruption(_))));
}

#[test]
fn test_checksum_mismatch_is_corruption() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("values.vlog");

    let ptr = {
        let vlog = ValueLog::open(&path).unwrap();
        vlog.append(b"important").unwrap()
    };

    // Corrupt the last value byte
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&path, bytes).unwrap();

    let vlog = ValueLog::open(&path).unwrap();
    assert!(matches!(vlog.read(ptr), Err(KvError::Corruption(_))));
}

#[test]
fn test_pointer_encoding() {
    let ptr = ValuePointer {
        offset: 0x0102_0304_0506,
        len: 42,
    };
    let bytes = ptr.encode();
    assert_eq!(bytes.len(), POINTER_SIZE);
    assert_eq!(ValuePointer::decode(&bytes).unwrap(), ptr);

    assert!(matches!(
        ValuePointer::decode(&bytes[..5]),
        Err(KvError::Corruption(_))
    ));
}
