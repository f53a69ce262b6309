//! Table Manager
//!
//! Owns the SSTable directory: discovers tables on startup and writes new
//! ones from MemTable flushes.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup, newest first
//! - Create new SSTables from MemTable flushes, moving large values to the value log
//! - Hand out shared readers; which tables are live is tracked by the engine's version

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::memtable::{MemTable, MemTableEntry};

use super::sstable::{SSTableBuilder, SSTableReader, TableValue};
use super::vlog::ValueLog;

/// Manages SSTable files
///
/// ## Concurrency:
/// - `next_sstable_id`: Atomic counter (lock-free)
/// - Builds are only issued by the engine while it holds its write lock
pub struct TableManager {
    /// Directory where SSTables are stored
    data_dir: PathBuf,

    /// Next ID for creating new SSTables
    next_sstable_id: AtomicU64,
}

impl TableManager {
    /// Open or create the table directory
    ///
    /// Returns the manager and the readers for every existing SSTable,
    /// ordered newest → oldest.
    pub fn open(path: &Path) -> Result<(Self, Vec<Arc<SSTableReader>>)> {
        fs::create_dir_all(path)?;

        let mut sstable_ids: Vec<u64> = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.is_file() {
                if let Some(id) = Self::parse_sstable_id(&file_path) {
                    sstable_ids.push(id);
                }
            }
        }

        // Newest first (highest ID first)
        sstable_ids.sort_unstable_by(|a, b| b.cmp(a));

        let mut tables = Vec::with_capacity(sstable_ids.len());
        for id in &sstable_ids {
            let reader = SSTableReader::open(&Self::sstable_path_with_dir(path, *id))?;
            tables.push(Arc::new(reader));
        }

        let next_id = sstable_ids.first().map(|&id| id + 1).unwrap_or(1);

        tracing::debug!(
            "Discovered {} SSTables in {}",
            tables.len(),
            path.display()
        );

        Ok((
            Self {
                data_dir: path.to_path_buf(),
                next_sstable_id: AtomicU64::new(next_id),
            },
            tables,
        ))
    }

    /// Write the newest version of every MemTable key into a new SSTable
    ///
    /// Values of at least `value_threshold` bytes go to the value log; the
    /// log is synced before the table is finished, so a table never points
    /// at values that are not durable.
    pub fn build(
        &self,
        memtable: &MemTable,
        vlog: &ValueLog,
        value_threshold: usize,
    ) -> Result<Arc<SSTableReader>> {
        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);

        let mut builder = SSTableBuilder::new(&path)?;
        let mut separated = 0usize;
        for (key, entry) in memtable.latest_entries() {
            let value = match entry {
                MemTableEntry::Tombstone => TableValue::Tombstone,
                MemTableEntry::Value(v) if v.len() >= value_threshold => {
                    separated += 1;
                    TableValue::Pointer(vlog.append(&v)?)
                }
                MemTableEntry::Value(v) => TableValue::Inline(v),
            };
            builder.add(&key, &value)?;
        }

        if separated > 0 {
            vlog.sync()?;
        }
        let metadata = builder.finish()?;

        tracing::debug!(
            "Built SSTable {} ({} entries, {} values in value log, {} bytes)",
            metadata.path.display(),
            metadata.entry_count,
            separated,
            metadata.file_size
        );

        Ok(Arc::new(SSTableReader::open(&path)?))
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the next SSTable ID (for testing/debugging)
    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn sstable_path(&self, id: u64) -> PathBuf {
        Self::sstable_path_with_dir(&self.data_dir, id)
    }

    fn sstable_path_with_dir(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("sstable_{:06}.sst", id))
    }

    /// "sstable_000042.sst" → Some(42)
    fn parse_sstable_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        let id_str = name.strip_prefix("sstable_")?;
        id_str.parse().ok()
    }
}
