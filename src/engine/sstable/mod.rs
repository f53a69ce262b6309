//! SSTable Module
//!
//! Sorted String Table - immutable on-disk sorted key-value storage.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "RKVT" (4) | Version: u16 (2) | Count: u64 (8) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [KeyLen: u32][Kind: u8][ValLen: u32][Key][Value]      │
//! │   ... repeated for each entry ...                       │
//! │   Kind 0 = tombstone (no value bytes)                   │
//! │   Kind 1 = inline value                                 │
//! │   Kind 2 = value log pointer (offset u64 + len u32)     │
//! ├─────────────────────────────────────────────────────────┤
//! │ Index Block (variable)                                  │
//! │   [KeyLen: u32][Offset: u64][Key]                       │
//! │   ... repeated for each entry ...                       │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (16 bytes)                                       │
//! │   IndexOffset: u64 (8) | DataCRC: u32 (4) | Padding (4) │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod builder;
mod reader;

use std::path::PathBuf;

pub use builder::SSTableBuilder;
pub use reader::SSTableReader;

use super::vlog::ValuePointer;

// =============================================================================
// Shared Constants (used by builder and reader)
// =============================================================================

/// Magic bytes identifying a RawKV SSTable file
pub(crate) const MAGIC: &[u8; 4] = b"RKVT";

/// Current SSTable format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (8) = 14 bytes
pub(crate) const HEADER_SIZE: u64 = 14;

/// Footer size: IndexOffset (8) + DataCRC (4) + Padding (4) = 16 bytes
pub(crate) const FOOTER_SIZE: u64 = 16;

/// Entry header size: KeyLen (4) + Kind (1) + ValLen (4)
pub(crate) const ENTRY_HEADER_SIZE: usize = 9;

pub(crate) const KIND_TOMBSTONE: u8 = 0;
pub(crate) const KIND_INLINE: u8 = 1;
pub(crate) const KIND_POINTER: u8 = 2;

// =============================================================================
// Entry Values
// =============================================================================

/// What an SSTable stores for a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableValue {
    /// The key was deleted
    Tombstone,

    /// Value stored next to the key
    Inline(Vec<u8>),

    /// Value stored in the value log
    Pointer(ValuePointer),
}

// =============================================================================
// SSTable Metadata
// =============================================================================

/// SSTable metadata returned by the builder
#[derive(Debug, Clone)]
pub struct SSTable {
    /// Path to the SSTable file
    pub path: PathBuf,
    /// Number of entries in this SSTable
    pub entry_count: u64,
    /// Smallest key (for range filtering)
    pub min_key: Vec<u8>,
    /// Largest key (for range filtering)
    pub max_key: Vec<u8>,
    /// File size in bytes
    pub file_size: u64,
}

impl SSTable {
    /// Get the number of entries
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false if key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        key >= self.min_key.as_slice() && key <= self.max_key.as_slice()
    }
}
