//! Snapshots
//!
//! A snapshot pins a [`Version`] (the memtable and SSTable list current when
//! it was taken) together with the last committed sequence number. Reads
//! through it ignore every write committed afterwards, including writes that
//! a later flush moves into new SSTables.

use std::sync::Arc;

use crate::error::{KvError, Result};
use crate::memtable::{MemTable, MemTableEntry};

use super::sstable::{SSTableReader, TableValue};
use super::vlog::{ValueLog, ValuePointer};

/// The set of data sources live at one point in time
#[derive(Clone)]
pub(crate) struct Version {
    pub memtable: Arc<MemTable>,
    /// Newest → oldest
    pub sstables: Arc<Vec<Arc<SSTableReader>>>,
}

/// A live value as found in the data sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoredValue {
    Inline(Vec<u8>),
    Pointer(ValuePointer),
}

/// Point-in-time read view of the engine
#[derive(Clone)]
pub struct Snapshot {
    version: Version,
    read_seq: u64,
    vlog: Arc<ValueLog>,
}

impl Snapshot {
    pub(crate) fn new(version: Version, read_seq: u64, vlog: Arc<ValueLog>) -> Self {
        Self {
            version,
            read_seq,
            vlog,
        }
    }

    /// Sequence number this snapshot reads at
    pub fn read_seq(&self) -> u64 {
        self.read_seq
    }

    /// Read a key; a missing or deleted key is `Err(KeyNotFound)`
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        match self.lookup(key)? {
            Some(StoredValue::Inline(v)) => Ok(v),
            Some(StoredValue::Pointer(ptr)) => self.vlog.read(ptr),
            None => Err(KvError::KeyNotFound),
        }
    }

    /// Search order: memtable (versions <= read_seq), then SSTables newest → oldest
    pub(crate) fn lookup(&self, key: &[u8]) -> Result<Option<StoredValue>> {
        if let Some(entry) = self.version.memtable.get(key, self.read_seq) {
            return Ok(match entry {
                MemTableEntry::Value(v) => Some(StoredValue::Inline(v)),
                MemTableEntry::Tombstone => None,
            });
        }

        for table in self.version.sstables.iter() {
            if !table.might_contain(key) {
                continue;
            }
            match table.get(key)? {
                Some(TableValue::Inline(v)) => return Ok(Some(StoredValue::Inline(v))),
                Some(TableValue::Pointer(ptr)) => return Ok(Some(StoredValue::Pointer(ptr))),
                Some(TableValue::Tombstone) => return Ok(None),
                None => continue,
            }
        }

        Ok(None)
    }

    /// First live key >= `start` with its value
    ///
    /// Each source reports its smallest key >= target. The smallest of those
    /// wins, and among equal keys the newest source wins. Tombstones move the
    /// target just past the deleted key.
    pub(crate) fn seek_visible(&self, start: &[u8]) -> Result<Option<(Vec<u8>, StoredValue)>> {
        let mut target = start.to_vec();

        loop {
            let mut best: Option<(Vec<u8>, TableValue)> = self
                .version
                .memtable
                .seek(&target, self.read_seq)
                .map(|(key, entry)| match entry {
                    MemTableEntry::Value(v) => (key, TableValue::Inline(v)),
                    MemTableEntry::Tombstone => (key, TableValue::Tombstone),
                });

            for table in self.version.sstables.iter() {
                if table.max_key().map_or(true, |max| max < target.as_slice()) {
                    continue;
                }
                if let Some((key, value)) = table.seek(&target)? {
                    let smaller = best.as_ref().map_or(true, |(b, _)| key < *b);
                    if smaller {
                        best = Some((key, value));
                    }
                }
            }

            match best {
                None => return Ok(None),
                Some((key, TableValue::Inline(v))) => return Ok(Some((key, StoredValue::Inline(v)))),
                Some((key, TableValue::Pointer(p))) => return Ok(Some((key, StoredValue::Pointer(p)))),
                Some((mut key, TableValue::Tombstone)) => {
                    key.push(0);
                    target = key;
                }
            }
        }
    }

    pub(crate) fn vlog(&self) -> &ValueLog {
        &self.vlog
    }
}
