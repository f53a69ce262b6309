//! Tests for StandaloneStorage
//!
//! These tests verify:
//! - Lifecycle (start creates or opens, stop is idempotent)
//! - Atomic batches and absent-key semantics
//! - Reader snapshot isolation for get and scan
//! - Column family isolation
//! - Persistence across restarts and value separation

use std::sync::Arc;
use std::thread;

use rawkv::config::WalSyncStrategy;
use rawkv::storage::{
    open_storage, DbIterator, Modify, RequestContext, StandaloneStorage, Storage, StorageReader, WriteBatch,
    CF_DEFAULT, CF_LOCK, CF_WRITE,
};
use rawkv::{Config, KvError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config_for(dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(dir.path().join("db"))
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .build()
}

fn setup_storage() -> (TempDir, StandaloneStorage) {
    let temp_dir = TempDir::new().unwrap();
    let storage = StandaloneStorage::new(config_for(&temp_dir));
    storage.start().unwrap();
    (temp_dir, storage)
}

fn ctx() -> RequestContext {
    RequestContext::default()
}

fn put(storage: &dyn Storage, cf: &str, key: &[u8], value: &[u8]) {
    storage.write(&ctx(), Modify::put(cf, key, value).into()).unwrap();
}

fn get(storage: &dyn Storage, cf: &str, key: &[u8]) -> Option<Vec<u8>> {
    storage.reader(&ctx()).unwrap().get_cf(cf, key).unwrap()
}

/// Every (key, value) a reader sees in `cf`, starting at `start`
fn scan(reader: &dyn StorageReader, cf: &str, start: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut iter = reader.iter_cf(cf).unwrap();
    iter.seek(start);
    let mut out = Vec::new();
    while let Some(item) = iter.item() {
        out.push((item.key().to_vec(), item.value().unwrap()));
        iter.next();
    }
    iter.close();
    out
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_start_creates_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(&temp_dir);
    assert!(!config.data_dir.exists());

    let storage = StandaloneStorage::new(config.clone());
    storage.start().unwrap();

    assert!(config.data_dir.is_dir());
    assert_eq!(storage.config().data_dir, config.data_dir);
    storage.stop().unwrap();
}

#[test]
fn test_start_twice_rejected() {
    let (_temp, storage) = setup_storage();
    assert!(matches!(storage.start(), Err(KvError::AlreadyStarted)));
}

#[test]
fn test_stop_twice_is_noop() {
    let (_temp, storage) = setup_storage();
    put(&storage, CF_DEFAULT, b"k", b"v");

    storage.stop().unwrap();
    storage.stop().unwrap();

    assert!(matches!(storage.start(), Err(KvError::Stopped)));
    assert!(matches!(storage.reader(&ctx()), Err(KvError::Stopped)));
    assert!(matches!(
        storage.write(&ctx(), Modify::put(CF_DEFAULT, "a", "b").into()),
        Err(KvError::Stopped)
    ));
}

#[test]
fn test_use_before_start_fails() {
    let temp_dir = TempDir::new().unwrap();
    let storage = StandaloneStorage::new(config_for(&temp_dir));

    assert!(matches!(storage.reader(&ctx()), Err(KvError::NotStarted)));
    assert!(matches!(storage.engine(), Err(KvError::NotStarted)));
    // Stopping a never-started storage is harmless
    storage.stop().unwrap();
}

#[test]
fn test_start_on_file_path_is_startup_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("not_a_dir");
    std::fs::write(&path, b"plain file").unwrap();

    let storage = StandaloneStorage::new(Config::builder().data_dir(&path).build());
    assert!(matches!(storage.start(), Err(KvError::Startup(_))));

    // Failed start leaves the storage unstarted
    assert!(matches!(storage.reader(&ctx()), Err(KvError::NotStarted)));
}

#[test]
fn test_reopen_persists_data() {
    let temp_dir = TempDir::new().unwrap();

    {
        let storage = StandaloneStorage::new(config_for(&temp_dir));
        storage.start().unwrap();
        put(&storage, CF_DEFAULT, b"k1", b"v1");
        put(&storage, CF_WRITE, b"k2", b"v2");
        storage.stop().unwrap();
    }

    let storage = StandaloneStorage::new(config_for(&temp_dir));
    storage.start().unwrap();
    assert_eq!(get(&storage, CF_DEFAULT, b"k1"), Some(b"v1".to_vec()));
    assert_eq!(get(&storage, CF_WRITE, b"k2"), Some(b"v2".to_vec()));
}

#[test]
fn test_open_storage_selects_backend() {
    let temp_dir = TempDir::new().unwrap();
    let storage = open_storage(&config_for(&temp_dir));
    storage.start().unwrap();

    put(storage.as_ref(), CF_DEFAULT, b"k", b"v");
    assert_eq!(get(storage.as_ref(), CF_DEFAULT, b"k"), Some(b"v".to_vec()));
    assert!(temp_dir.path().join("db").join("wal.log").exists());
    storage.stop().unwrap();
}

// =============================================================================
// Read/Write Tests
// =============================================================================

#[test]
fn test_never_written_key_is_absent() {
    let (_temp, storage) = setup_storage();
    assert_eq!(get(&storage, CF_DEFAULT, b"never"), None);
}

#[test]
fn test_put_get_delete() {
    let (_temp, storage) = setup_storage();

    put(&storage, CF_DEFAULT, b"k", b"v");
    assert_eq!(get(&storage, CF_DEFAULT, b"k"), Some(b"v".to_vec()));

    storage
        .write(&ctx(), Modify::delete(CF_DEFAULT, "k").into())
        .unwrap();
    assert_eq!(get(&storage, CF_DEFAULT, b"k"), None);
}

#[test]
fn test_batch_last_write_wins() {
    let (_temp, storage) = setup_storage();

    let mut batch = WriteBatch::new();
    batch
        .put(CF_DEFAULT, "k", "1")
        .put(CF_DEFAULT, "k", "2")
        .put(CF_DEFAULT, "gone", "x")
        .delete(CF_DEFAULT, "gone");
    assert_eq!(batch.len(), 4);
    storage.write(&ctx(), batch).unwrap();

    assert_eq!(get(&storage, CF_DEFAULT, b"k"), Some(b"2".to_vec()));
    assert_eq!(get(&storage, CF_DEFAULT, b"gone"), None);
}

#[test]
fn test_empty_batch_is_noop() {
    let (_temp, storage) = setup_storage();
    storage.write(&ctx(), WriteBatch::new()).unwrap();
}

#[test]
fn test_failed_batch_leaves_nothing_visible() {
    let (_temp, storage) = setup_storage();
    let big_key = vec![b'k'; 70_000];

    let batch = WriteBatch::from(vec![
        Modify::put(CF_DEFAULT, "a", "1"),
        Modify::put(CF_DEFAULT, big_key.clone(), "2"),
        Modify::put(CF_DEFAULT, "c", "3"),
    ]);
    let result = storage.write(&ctx(), batch);

    assert!(matches!(result, Err(KvError::KeyTooLarge { .. })));
    assert_eq!(get(&storage, CF_DEFAULT, b"a"), None);
    assert_eq!(get(&storage, CF_DEFAULT, &big_key), None);
    assert_eq!(get(&storage, CF_DEFAULT, b"c"), None);
}

#[test]
fn test_invalid_column_family() {
    let (_temp, storage) = setup_storage();
    let long_cf = "x".repeat(256);

    let result = storage.write(&ctx(), Modify::put(long_cf.as_str(), "k", "v").into());
    assert!(matches!(result, Err(KvError::InvalidColumnFamily(_))));

    let reader = storage.reader(&ctx()).unwrap();
    assert!(matches!(reader.get_cf(&long_cf, b"k"), Err(KvError::InvalidColumnFamily(_))));
    assert!(reader.iter_cf(&long_cf).is_err());

    // 255 bytes is the longest accepted name
    put(&storage, &"y".repeat(255), b"k", b"v");
}

// =============================================================================
// Column Family Tests
// =============================================================================

#[test]
fn test_column_families_are_isolated() {
    let (_temp, storage) = setup_storage();

    put(&storage, CF_DEFAULT, b"k", b"default");
    put(&storage, CF_LOCK, b"k", b"lock");
    put(&storage, "a", b"1", b"a1");
    put(&storage, "a_b", b"1", b"ab1");

    assert_eq!(get(&storage, CF_DEFAULT, b"k"), Some(b"default".to_vec()));
    assert_eq!(get(&storage, CF_LOCK, b"k"), Some(b"lock".to_vec()));
    assert_eq!(get(&storage, CF_WRITE, b"k"), None);

    let reader = storage.reader(&ctx()).unwrap();
    assert_eq!(scan(reader.as_ref(), "a", b""), vec![(b"1".to_vec(), b"a1".to_vec())]);
    assert_eq!(scan(reader.as_ref(), "a_b", b""), vec![(b"1".to_vec(), b"ab1".to_vec())]);
    assert!(scan(reader.as_ref(), CF_WRITE, b"").is_empty());
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_scan_order_and_start() {
    let (_temp, storage) = setup_storage();
    for key in ["c", "a", "b", "d"] {
        put(&storage, CF_DEFAULT, key.as_bytes(), key.as_bytes());
    }

    let reader = storage.reader(&ctx()).unwrap();
    let keys: Vec<Vec<u8>> = scan(reader.as_ref(), CF_DEFAULT, b"b")
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);

    assert!(scan(reader.as_ref(), CF_DEFAULT, b"e").is_empty());
}

#[test]
fn test_reader_isolated_from_later_writes() {
    let (_temp, storage) = setup_storage();
    put(&storage, CF_DEFAULT, b"a", b"1");

    let reader = storage.reader(&ctx()).unwrap();
    put(&storage, CF_DEFAULT, b"a", b"2");
    put(&storage, CF_DEFAULT, b"b", b"new");

    assert_eq!(reader.get_cf(CF_DEFAULT, b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(reader.get_cf(CF_DEFAULT, b"b").unwrap(), None);
    assert_eq!(scan(reader.as_ref(), CF_DEFAULT, b""), vec![(b"a".to_vec(), b"1".to_vec())]);

    // A fresh reader sees the new state
    assert_eq!(get(&storage, CF_DEFAULT, b"b"), Some(b"new".to_vec()));
}

#[test]
fn test_reader_isolated_across_flush() {
    let (_temp, storage) = setup_storage();
    put(&storage, CF_DEFAULT, b"a", b"1");

    let reader = storage.reader(&ctx()).unwrap();
    put(&storage, CF_DEFAULT, b"b", b"2");
    storage.engine().unwrap().flush().unwrap();

    assert_eq!(reader.get_cf(CF_DEFAULT, b"b").unwrap(), None);
    assert_eq!(scan(reader.as_ref(), CF_DEFAULT, b"").len(), 1);
}

#[test]
fn test_reader_close_is_idempotent() {
    let (_temp, storage) = setup_storage();
    put(&storage, CF_DEFAULT, b"a", b"1");

    let mut reader = storage.reader(&ctx()).unwrap();
    reader.close();
    reader.close();

    assert!(matches!(reader.get_cf(CF_DEFAULT, b"a"), Err(KvError::ReaderClosed)));
    assert!(matches!(reader.iter_cf(CF_DEFAULT), Err(KvError::ReaderClosed)));

    // Closing a reader that never read anything is fine too
    let mut unused = storage.reader(&ctx()).unwrap();
    unused.close();
}

#[test]
fn test_iterator_next_past_end_stays_invalid() {
    let (_temp, storage) = setup_storage();
    put(&storage, CF_DEFAULT, b"only", b"1");
    put(&storage, CF_LOCK, b"other", b"2");

    let reader = storage.reader(&ctx()).unwrap();
    let mut iter = reader.iter_cf(CF_DEFAULT).unwrap();
    iter.seek(b"");
    assert!(iter.valid());

    iter.next();
    assert!(!iter.valid());
    iter.next();
    assert!(!iter.valid());
    assert!(iter.take_error().is_none());
}

// =============================================================================
// Value Separation Tests
// =============================================================================

#[test]
fn test_separate_values_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path().join("db"))
        .separate_values(true)
        .build();
    assert_eq!(config.effective_value_threshold(), 0);

    let storage = StandaloneStorage::new(config);
    storage.start().unwrap();
    put(&storage, CF_DEFAULT, b"k", b"small value");

    let engine = storage.engine().unwrap();
    engine.flush().unwrap();
    assert!(engine.value_log_size() > 0);

    assert_eq!(get(&storage, CF_DEFAULT, b"k"), Some(b"small value".to_vec()));
    let reader = storage.reader(&ctx()).unwrap();
    assert_eq!(
        scan(reader.as_ref(), CF_DEFAULT, b""),
        vec![(b"k".to_vec(), b"small value".to_vec())]
    );
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_batches_are_atomic() {
    let (_temp, storage) = setup_storage();
    let storage = Arc::new(storage);

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                for i in 0..25 {
                    let value = format!("{}-{}", t, i);
                    let mut batch = WriteBatch::new();
                    batch
                        .put(CF_DEFAULT, "x", value.clone())
                        .put(CF_WRITE, "x", value);
                    storage.write(&RequestContext::new(t), batch).unwrap();
                }
            })
        })
        .collect();

    for _ in 0..50 {
        // Both CFs always come from the same batch
        let reader = storage.reader(&ctx()).unwrap();
        assert_eq!(
            reader.get_cf(CF_DEFAULT, b"x").unwrap(),
            reader.get_cf(CF_WRITE, b"x").unwrap()
        );
    }

    for handle in writers {
        handle.join().unwrap();
    }
}
