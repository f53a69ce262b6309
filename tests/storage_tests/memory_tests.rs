//! Tests for MemoryStorage

use rawkv::config::StorageKind;
use rawkv::storage::{
    open_storage, MemoryStorage, Modify, RequestContext, Storage, WriteBatch, CF_DEFAULT, CF_LOCK,
};
use rawkv::{Config, KvError};

fn ctx() -> RequestContext {
    RequestContext::default()
}

fn started() -> MemoryStorage {
    let storage = MemoryStorage::new();
    storage.start().unwrap();
    storage
}

#[test]
fn test_lifecycle() {
    let storage = MemoryStorage::new();
    assert!(matches!(storage.reader(&ctx()), Err(KvError::NotStarted)));

    storage.start().unwrap();
    assert!(matches!(storage.start(), Err(KvError::AlreadyStarted)));

    storage.stop().unwrap();
    storage.stop().unwrap();
    assert!(matches!(storage.reader(&ctx()), Err(KvError::Stopped)));
}

#[test]
fn test_put_get_delete() {
    let storage = started();
    storage
        .write(&ctx(), Modify::put(CF_DEFAULT, "k", "v").into())
        .unwrap();
    assert_eq!(storage.len(), 1);

    let reader = storage.reader(&ctx()).unwrap();
    assert_eq!(reader.get_cf(CF_DEFAULT, b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(reader.get_cf(CF_LOCK, b"k").unwrap(), None);

    storage
        .write(&ctx(), Modify::delete(CF_DEFAULT, "k").into())
        .unwrap();
    assert!(storage.is_empty());

    // Existing reader still sees its snapshot
    assert_eq!(reader.get_cf(CF_DEFAULT, b"k").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_failed_batch_is_atomic() {
    let storage = started();

    let batch = WriteBatch::from(vec![
        Modify::put(CF_DEFAULT, "a", "1"),
        Modify::put(CF_DEFAULT, vec![0u8; 70_000], "2"),
        Modify::put(CF_DEFAULT, "c", "3"),
    ]);
    assert!(matches!(
        storage.write(&ctx(), batch),
        Err(KvError::KeyTooLarge { .. })
    ));
    assert!(storage.is_empty());
}

#[test]
fn test_scan_within_column_family() {
    let storage = started();
    let mut batch = WriteBatch::new();
    batch
        .put("a", "2", "a2")
        .put("a", "1", "a1")
        .put("a_b", "0", "ab0")
        .put("b", "0", "b0");
    storage.write(&ctx(), batch).unwrap();

    let reader = storage.reader(&ctx()).unwrap();
    let mut iter = reader.iter_cf("a").unwrap();
    iter.seek(b"");

    let mut pairs = Vec::new();
    while let Some(item) = iter.item() {
        pairs.push((item.key().to_vec(), item.value().unwrap()));
        iter.next();
    }
    assert_eq!(
        pairs,
        vec![
            (b"1".to_vec(), b"a1".to_vec()),
            (b"2".to_vec(), b"a2".to_vec()),
        ]
    );
    assert!(!iter.valid());
}

#[test]
fn test_closed_reader() {
    let storage = started();
    let mut reader = storage.reader(&ctx()).unwrap();
    reader.close();
    reader.close();

    assert!(matches!(reader.get_cf(CF_DEFAULT, b"k"), Err(KvError::ReaderClosed)));
}

#[test]
fn test_stop_discards_data() {
    let storage = started();
    storage
        .write(&ctx(), Modify::put(CF_DEFAULT, "k", "v").into())
        .unwrap();

    storage.stop().unwrap();
    assert!(storage.is_empty());
}

#[test]
fn test_selected_by_config() {
    let config = Config::builder().storage(StorageKind::Memory).build();
    let storage = open_storage(&config);
    storage.start().unwrap();

    storage
        .write(&ctx(), Modify::put(CF_DEFAULT, "k", "v").into())
        .unwrap();
    let reader = storage.reader(&ctx()).unwrap();
    assert_eq!(reader.get_cf(CF_DEFAULT, b"k").unwrap(), Some(b"v".to_vec()));
}
