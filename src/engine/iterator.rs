//! Engine Iterator
//!
//! Forward cursor over the whole engine keyspace, bound to one snapshot.
//! Positioning and value retrieval are separate steps: an [`Item`] whose
//! value lives in the value log is only read when [`Item::value`] is called.

use crate::error::{KvError, Result};

use super::snapshot::{Snapshot, StoredValue};
use super::vlog::{ValueLog, ValuePointer};

/// Reference to an entry's value
#[derive(Clone, Copy)]
pub enum ValueRef<'a> {
    /// Value bytes are already in memory
    Inline(&'a [u8]),

    /// Value must be fetched from the value log
    Pointer { ptr: ValuePointer, vlog: &'a ValueLog },
}

/// Entry under an iterator's cursor
#[derive(Clone, Copy)]
pub struct Item<'a> {
    key: &'a [u8],
    value: ValueRef<'a>,
}

impl<'a> Item<'a> {
    pub fn new(key: &'a [u8], value: ValueRef<'a>) -> Self {
        Self { key, value }
    }

    /// Item for an in-memory value
    pub fn inline(key: &'a [u8], value: &'a [u8]) -> Self {
        Self::new(key, ValueRef::Inline(value))
    }

    pub fn key(&self) -> &'a [u8] {
        self.key
    }

    /// Retrieve the value; fails if an out-of-line value cannot be read
    pub fn value(&self) -> Result<Vec<u8>> {
        match self.value {
            ValueRef::Inline(v) => Ok(v.to_vec()),
            ValueRef::Pointer { ptr, vlog } => vlog.read(ptr),
        }
    }

    /// Value length without reading it
    pub fn value_size(&self) -> usize {
        match self.value {
            ValueRef::Inline(v) => v.len(),
            ValueRef::Pointer { ptr, .. } => ptr.len as usize,
        }
    }

    /// Same value under a different key (e.g. with a prefix stripped)
    pub fn with_key(self, key: &'a [u8]) -> Self {
        Self { key, ..self }
    }
}

/// Forward iterator over a snapshot
pub struct EngineIterator {
    snapshot: Snapshot,
    current: Option<(Vec<u8>, StoredValue)>,
    error: Option<KvError>,
}

impl EngineIterator {
    pub(crate) fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            current: None,
            error: None,
        }
    }

    /// Position at the first key >= `key`
    pub fn seek(&mut self, key: &[u8]) {
        self.position(key);
    }

    /// Position at the first key
    pub fn rewind(&mut self) {
        self.position(&[]);
    }

    pub fn valid(&self) -> bool {
        self.current.is_some()
    }

    pub fn item(&self) -> Option<Item<'_>> {
        let (key, value) = self.current.as_ref()?;
        let value = match value {
            StoredValue::Inline(v) => ValueRef::Inline(v),
            StoredValue::Pointer(ptr) => ValueRef::Pointer {
                ptr: *ptr,
                vlog: self.snapshot.vlog(),
            },
        };
        Some(Item::new(key, value))
    }

    /// Advance to the next key; no-op when invalid
    pub fn next(&mut self) {
        if let Some((mut key, _)) = self.current.take() {
            key.push(0);
            self.position(&key);
        }
    }

    /// Error that invalidated the cursor, if positioning failed
    pub fn error(&self) -> Option<&KvError> {
        self.error.as_ref()
    }

    /// Take the positioning error out, leaving the cursor error-free
    pub fn take_error(&mut self) -> Option<KvError> {
        self.error.take()
    }

    /// Release the cursor; the snapshot stays owned by the transaction
    pub fn close(&mut self) {
        self.current = None;
    }

    fn position(&mut self, key: &[u8]) {
        match self.snapshot.seek_visible(key) {
            Ok(found) => self.current = found,
            Err(e) => {
                tracing::warn!("Iterator positioning failed: {}", e);
                self.current = None;
                self.error = Some(e);
            }
        }
    }
}
