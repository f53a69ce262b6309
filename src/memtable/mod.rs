//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Multi-version entries so snapshots can read "as of" a sequence number
//! - Track size for flush triggers
//! - Ordered iteration for SSTable creation
//!
//! ## Data Structure Choice
//! BTreeMap keyed by `(user key ASC, seq DESC)` wrapped in RwLock:
//! - The first entry at or after `(key, snapshot_seq)` is the newest version
//!   visible to that snapshot
//! - Ordered keys (required for SSTable generation)

mod table;

pub use table::MemTable;

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq)]
pub enum MemTableEntry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone (deleted key)
    Tombstone,
}
