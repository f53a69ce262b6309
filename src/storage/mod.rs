//! Storage Module
//!
//! The abstraction every request handler talks to: a small set of atomic
//! read/write primitives over a keyspace split into column families.
//!
//! ## Responsibilities
//! - Lifecycle: start (create or open the backend), stop (exactly once)
//! - Atomic batched writes of [`Modify`] entries
//! - Snapshot-consistent readers with point gets and per-CF iteration
//!
//! ## Layout
//! ```text
//! ┌────────────────────────────────────────┐
//! │ dyn Storage                            │
//! │  ├── StandaloneStorage  (Engine)       │
//! │  └── MemoryStorage      (BTreeMap)     │
//! ├────────────────────────────────────────┤
//! │ dyn StorageReader  (one snapshot)      │
//! │  └── dyn DbIterator (one CF, forward)  │
//! └────────────────────────────────────────┘
//! ```

mod cf;
mod lifecycle;
mod memory;
mod standalone;

use std::sync::Arc;

use crate::config::{Config, StorageKind};
use crate::error::Result;

pub use crate::engine::Item;
pub use cf::{key_with_cf, CfIterator, CF_DEFAULT, CF_LOCK, CF_WRITE};
pub use lifecycle::Lifecycle;
pub use memory::{MemoryReader, MemoryStorage};
pub use standalone::{StandaloneReader, StandaloneStorage};

/// Per-request metadata, used for log correlation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: u64,
}

impl RequestContext {
    pub fn new(request_id: u64) -> Self {
        Self { request_id }
    }
}

/// A single write inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modify {
    Put {
        cf: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        cf: String,
        key: Vec<u8>,
    },
}

impl Modify {
    pub fn put(cf: impl Into<String>, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Modify::Put {
            cf: cf.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(cf: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        Modify::Delete {
            cf: cf.into(),
            key: key.into(),
        }
    }

    pub fn cf(&self) -> &str {
        match self {
            Modify::Put { cf, .. } | Modify::Delete { cf, .. } => cf,
        }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            Modify::Put { key, .. } | Modify::Delete { key, .. } => key,
        }
    }

    /// Value of a put; `None` for deletes
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Modify::Put { value, .. } => Some(value),
            Modify::Delete { .. } => None,
        }
    }
}

/// Ordered list of modifications committed as one unit
///
/// When several entries touch the same (cf, key), the last one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    modifies: Vec<Modify>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, modify: Modify) -> &mut Self {
        self.modifies.push(modify);
        self
    }

    pub fn put(
        &mut self,
        cf: impl Into<String>,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.push(Modify::put(cf, key, value))
    }

    pub fn delete(&mut self, cf: impl Into<String>, key: impl Into<Vec<u8>>) -> &mut Self {
        self.push(Modify::delete(cf, key))
    }

    pub fn len(&self) -> usize {
        self.modifies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifies.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Modify> {
        self.modifies.iter()
    }
}

impl From<Vec<Modify>> for WriteBatch {
    fn from(modifies: Vec<Modify>) -> Self {
        Self { modifies }
    }
}

impl From<Modify> for WriteBatch {
    fn from(modify: Modify) -> Self {
        Self {
            modifies: vec![modify],
        }
    }
}

impl IntoIterator for WriteBatch {
    type Item = Modify;
    type IntoIter = std::vec::IntoIter<Modify>;

    fn into_iter(self) -> Self::IntoIter {
        self.modifies.into_iter()
    }
}

/// A storage backend
///
/// Implementations are shared between connection threads behind an `Arc`.
pub trait Storage: Send + Sync {
    /// Create or open the backend. Fails if already started or stopped.
    fn start(&self) -> Result<()>;

    /// Release the backend. Only the first call does anything.
    fn stop(&self) -> Result<()>;

    /// Open a reader pinned to the current committed state
    fn reader(&self, ctx: &RequestContext) -> Result<Box<dyn StorageReader>>;

    /// Commit `batch` atomically: either every entry becomes visible or none
    fn write(&self, ctx: &RequestContext, batch: WriteBatch) -> Result<()>;
}

/// Snapshot-consistent read handle
///
/// Closing is idempotent and also happens on drop. Any read after close
/// fails with `ReaderClosed`.
pub trait StorageReader: Send {
    /// Point read; an absent key is `Ok(None)`
    fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Forward iterator over one column family
    fn iter_cf(&self, cf: &str) -> Result<Box<dyn DbIterator + '_>>;

    fn close(&mut self);
}

/// Forward cursor over one column family of a reader's snapshot
pub trait DbIterator {
    /// Position at the first key >= `key`
    fn seek(&mut self, key: &[u8]);

    fn valid(&self) -> bool;

    /// Entry under the cursor, keyed by the user key
    fn item(&self) -> Option<Item<'_>>;

    fn next(&mut self);

    /// Error that stopped the cursor early, if any
    fn take_error(&mut self) -> Option<crate::error::KvError>;

    fn close(&mut self);
}

/// Build the backend selected by `config.storage`; it still has to be started
pub fn open_storage(config: &Config) -> Arc<dyn Storage> {
    match config.storage {
        StorageKind::Standalone => Arc::new(StandaloneStorage::new(config.clone())),
        StorageKind::Memory => Arc::new(MemoryStorage::new()),
    }
}
