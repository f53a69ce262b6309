//! MemTable implementation
//!
//! Versioned BTreeMap-based memtable with RwLock for concurrency.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::MemTableEntry;

/// Per-entry bookkeeping overhead counted towards `size()`
const ENTRY_OVERHEAD: usize = 16;

/// `(user key, commit seq)` ordered by key ascending, then seq descending
#[derive(Debug, Clone, PartialEq, Eq)]
struct VersionedKey {
    key: Vec<u8>,
    seq: Reverse<u64>,
}

impl VersionedKey {
    fn new(key: Vec<u8>, seq: u64) -> Self {
        Self {
            key,
            seq: Reverse(seq),
        }
    }
}

impl Ord for VersionedKey {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for VersionedKey {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// In-memory table for recent writes
pub struct MemTable {
    data: RwLock<BTreeMap<VersionedKey, MemTableEntry>>,
    /// Approximate size in bytes
    size: AtomicUsize,
    entry_count: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
            entry_count: AtomicUsize::new(0),
        }
    }

    /// Put a key-value pair at `seq`; returns the new approximate size
    ///
    /// Writing the same key twice at the same seq keeps the later write.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>, seq: u64) -> usize {
        let added = key.len() + value.len() + ENTRY_OVERHEAD;
        self.insert(VersionedKey::new(key, seq), MemTableEntry::Value(value), added)
    }

    /// Record a tombstone at `seq`; returns the new approximate size
    pub fn delete(&self, key: Vec<u8>, seq: u64) -> usize {
        let added = key.len() + ENTRY_OVERHEAD;
        self.insert(VersionedKey::new(key, seq), MemTableEntry::Tombstone, added)
    }

    fn insert(&self, vkey: VersionedKey, entry: MemTableEntry, added: usize) -> usize {
        let mut data = self.data.write();
        if data.insert(vkey, entry).is_none() {
            self.entry_count.fetch_add(1, Ordering::Relaxed);
        }
        self.size.fetch_add(added, Ordering::Relaxed) + added
    }

    /// Newest version of `key` with seq <= `read_seq`
    pub fn get(&self, key: &[u8], read_seq: u64) -> Option<MemTableEntry> {
        let data = self.data.read();
        let start = VersionedKey::new(key.to_vec(), read_seq);
        data.range((Bound::Included(start), Bound::Unbounded))
            .next()
            .filter(|(vkey, _)| vkey.key == key)
            .map(|(_, entry)| entry.clone())
    }

    /// First user key >= `key` that has a version visible at `read_seq`,
    /// with that version (tombstones included)
    pub fn seek(&self, key: &[u8], read_seq: u64) -> Option<(Vec<u8>, MemTableEntry)> {
        let data = self.data.read();
        let start = VersionedKey::new(key.to_vec(), u64::MAX);
        data.range((Bound::Included(start), Bound::Unbounded))
            .find(|(vkey, _)| vkey.seq.0 <= read_seq)
            .map(|(vkey, entry)| (vkey.key.clone(), entry.clone()))
    }

    /// Newest version of every key, in key order (for flush)
    pub fn latest_entries(&self) -> Vec<(Vec<u8>, MemTableEntry)> {
        let data = self.data.read();
        let mut out: Vec<(Vec<u8>, MemTableEntry)> = Vec::new();
        for (vkey, entry) in data.iter() {
            // Versions of one key are adjacent, newest first
            if out.last().map(|(k, _)| k == &vkey.key).unwrap_or(false) {
                continue;
            }
            out.push((vkey.key.clone(), entry.clone()));
        }
        out
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Get entry count (all versions)
    pub fn entry_count(&self) -> usize {
        self.entry_count.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// Check if should flush (size >= limit)
    pub fn should_flush(&self, size_limit: usize) -> bool {
        self.size() >= size_limit
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}
