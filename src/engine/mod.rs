//! Engine Module
//!
//! The embedded, ordered, persistent key-value store underneath the storage
//! layer.
//!
//! ## Responsibilities
//! - Create or open a database directory, recovering from the WAL
//! - Commit ordered batches of puts/deletes atomically
//! - Hand out snapshot transactions and iterators
//! - Flush the MemTable to SSTables, moving large values to the value log
//!
//! The engine knows nothing about column families: it is one flat, ordered
//! keyspace. The storage layer encodes column families into keys.

mod iterator;
mod manager;
mod snapshot;
mod txn;

pub mod sstable;
pub mod vlog;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::{Config, WalSyncStrategy};
use crate::error::{KvError, Result};
use crate::memtable::MemTable;
use crate::wal::{Operation, WalRecovery, WalWriter};

pub use iterator::{EngineIterator, Item, ValueRef};
pub use manager::TableManager;
pub use snapshot::Snapshot;
pub use txn::Txn;

use snapshot::Version;
use vlog::ValueLog;

/// Largest accepted key, in bytes
pub const MAX_KEY_SIZE: usize = 65000;

/// Largest accepted value, in bytes
pub const MAX_VALUE_SIZE: usize = 16 * 1024 * 1024;

/// Options the engine is opened with
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Values of at least this many bytes are stored in the value log on flush
    pub value_threshold: usize,

    /// How often the WAL is fsynced
    pub wal_sync_strategy: WalSyncStrategy,

    /// MemTable size that triggers a flush
    pub memtable_size_limit: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EngineOptions {
    /// Derive engine options from the service configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            value_threshold: config.effective_value_threshold(),
            wal_sync_strategy: config.wal_sync_strategy,
            memtable_size_limit: config.memtable_size_limit,
        }
    }
}

/// The embedded storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (batch commit/flush): Serialized by `write_lock`
///   - Must acquire: write_lock → WAL → memtable → publish `last_seq`
///
/// - **Reads**: lock-free apart from cloning the current `version`
///   - A snapshot pins the version and `last_seq`; memtable entries newer
///     than `last_seq` are invisible to it
///   - Flush swaps in a new version, old snapshots keep the old one alive
pub struct Engine {
    options: EngineOptions,

    /// Root directory of this database
    data_dir: PathBuf,

    /// Directory for SSTables
    storage_dir: PathBuf,

    /// Write-ahead log for durability (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// Out-of-line values
    vlog: Arc<ValueLog>,

    /// SSTable files
    tables: TableManager,

    /// Current memtable + SSTable list
    version: RwLock<Version>,

    /// Sequence of the newest committed batch
    last_seq: AtomicU64,

    /// Serializes write operations (commit/flush)
    write_lock: Mutex<()>,

    closed: AtomicBool,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const VLOG_FILENAME: &'static str = "values.vlog";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Create a new database at `path`, creating missing directories
    pub fn create(path: &Path, options: EngineOptions) -> Result<Self> {
        fs::create_dir_all(path)?;
        tracing::info!("Creating engine at {}", path.display());
        Self::open_dir(path, options)
    }

    /// Open an existing database directory
    ///
    /// On startup:
    /// 1. Load existing SSTables
    /// 2. Recover from WAL if it exists and flush recovered data
    /// 3. Ready to serve requests
    pub fn open(path: &Path, options: EngineOptions) -> Result<Self> {
        if !path.is_dir() {
            return Err(KvError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("database directory {} does not exist", path.display()),
            )));
        }
        tracing::info!("Opening engine at {}", path.display());
        Self::open_dir(path, options)
    }

    fn open_dir(path: &Path, options: EngineOptions) -> Result<Self> {
        let storage_dir = path.join(Self::SSTABLE_DIR);
        let wal_path = path.join(Self::WAL_FILENAME);

        let (tables, mut sstables) = TableManager::open(&storage_dir)?;
        let vlog = Arc::new(ValueLog::open(&path.join(Self::VLOG_FILENAME))?);

        if wal_path.exists() {
            let (entries, recovery_result) = WalRecovery::recover(&wal_path)?;

            if recovery_result.entries_recovered > 0 || recovery_result.entries_corrupted > 0 {
                tracing::info!(
                    "WAL recovery: {} entries recovered, {} corrupted, last_lsn={}",
                    recovery_result.entries_recovered,
                    recovery_result.entries_corrupted,
                    recovery_result.last_lsn
                );
            }

            // Replay into a scratch memtable and persist it right away, so the
            // WAL can start empty
            let recovered = MemTable::new();
            for entry in entries {
                apply(&recovered, &entry.operations, entry.lsn);
            }

            if !recovered.is_empty() {
                tracing::info!(
                    "Flushing {} recovered entries to SSTable",
                    recovered.entry_count()
                );
                let table = tables.build(&recovered, &vlog, options.value_threshold)?;
                sstables.insert(0, table);
            }
        }

        let mut wal = WalWriter::open(&wal_path, options.wal_sync_strategy)?;
        let last_seq = wal.current_lsn().saturating_sub(1);
        wal.truncate()?;

        Ok(Self {
            options,
            data_dir: path.to_path_buf(),
            storage_dir,
            wal: Mutex::new(wal),
            vlog,
            tables,
            version: RwLock::new(Version {
                memtable: Arc::new(MemTable::new()),
                sstables: Arc::new(sstables),
            }),
            last_seq: AtomicU64::new(last_seq),
            write_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Take a snapshot of the current committed state
    pub fn snapshot(&self) -> Result<Snapshot> {
        self.ensure_open()?;
        let version = self.version.read();
        let read_seq = self.last_seq.load(Ordering::Acquire);
        Ok(Snapshot::new(version.clone(), read_seq, Arc::clone(&self.vlog)))
    }

    /// Begin a transaction reading from a fresh snapshot
    pub fn begin_transaction(self: &Arc<Self>, writable: bool) -> Result<Txn> {
        let snapshot = self.snapshot()?;
        Ok(Txn::new(Arc::clone(self), snapshot, writable))
    }

    /// Commit an ordered batch atomically; returns its sequence number
    ///
    /// The whole batch is validated before anything is logged. Later
    /// operations on the same key win over earlier ones.
    pub fn write(&self, operations: &[Operation]) -> Result<u64> {
        self.ensure_open()?;
        validate_batch(operations)?;

        if operations.is_empty() {
            return Ok(self.last_seq.load(Ordering::Acquire));
        }

        let _write_guard = self.write_lock.lock();
        self.ensure_open()?;

        // Step 1: WAL first (durability guarantee)
        let seq = self.wal.lock().append(operations.to_vec())?;

        // Step 2: MemTable, then publish the sequence to new snapshots
        let memtable = Arc::clone(&self.version.read().memtable);
        apply(&memtable, operations, seq);
        self.last_seq.store(seq, Ordering::Release);

        tracing::trace!("Committed batch seq={} ops={}", seq, operations.len());

        // Step 3: Flush if needed. The batch is already committed, so a
        // failed flush must not be reported as a failed write.
        if memtable.should_flush(self.options.memtable_size_limit) {
            if let Err(e) = self.flush_internal() {
                tracing::warn!("MemTable flush after seq {} failed: {}", seq, e);
            }
        }

        Ok(seq)
    }

    /// Flush memtable to disk
    ///
    /// Forces a flush regardless of memtable size
    pub fn flush(&self) -> Result<()> {
        self.ensure_open()?;
        let _write_guard = self.write_lock.lock();
        self.flush_internal()
    }

    /// Internal flush implementation (called with write lock held)
    fn flush_internal(&self) -> Result<()> {
        let memtable = Arc::clone(&self.version.read().memtable);
        if memtable.is_empty() {
            return Ok(());
        }

        // Step 1: Write the SSTable (and value log records)
        let table = self
            .tables
            .build(&memtable, &self.vlog, self.options.value_threshold)?;

        // Step 2: Swap in the new version
        {
            let mut version = self.version.write();
            let mut sstables = Vec::with_capacity(version.sstables.len() + 1);
            sstables.push(table);
            sstables.extend(version.sstables.iter().cloned());
            *version = Version {
                memtable: Arc::new(MemTable::new()),
                sstables: Arc::new(sstables),
            };
        }

        // Step 3: Truncate WAL (entries are now durable in SSTable)
        self.wal.lock().truncate()?;

        tracing::debug!(
            "Flushed {} memtable entries, {} SSTables live",
            memtable.entry_count(),
            self.sstable_count()
        );

        Ok(())
    }

    /// Close the engine gracefully. Idempotent.
    ///
    /// Flushes any pending data and syncs to disk. Snapshots taken before
    /// close stay readable; new transactions and writes fail with
    /// `EngineClosed`.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let _write_guard = self.write_lock.lock();
        self.flush_internal()?;
        self.wal.lock().sync()?;
        self.vlog.sync()?;

        tracing::info!("Engine at {} closed", self.data_dir.display());
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(KvError::EngineClosed);
        }
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the storage directory path (where SSTables are stored)
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Get the current memtable size
    pub fn memtable_size(&self) -> usize {
        self.version.read().memtable.size()
    }

    /// Get the memtable entry count
    pub fn memtable_entry_count(&self) -> usize {
        self.version.read().memtable.entry_count()
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.version.read().sstables.len()
    }

    /// Size of the value log in bytes
    pub fn value_log_size(&self) -> u64 {
        self.vlog.len()
    }

    /// Sequence number of the newest committed batch
    pub fn last_seq(&self) -> u64 {
        self.last_seq.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get the options
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }
}

/// Apply a batch to a memtable at `seq`, in order; returns the new memtable size
fn apply(memtable: &MemTable, operations: &[Operation], seq: u64) {
    for op in operations {
        match op {
            Operation::Put { key, value } => memtable.put(key.clone(), value.clone(), seq),
            Operation::Delete { key } => memtable.delete(key.clone(), seq),
        };
    }
}

/// Reject the whole batch if any key or value exceeds the engine limits
pub(crate) fn validate_batch(operations: &[Operation]) -> Result<()> {
    for op in operations {
        let key_len = op.key().len();
        if key_len > MAX_KEY_SIZE {
            return Err(KvError::KeyTooLarge {
                len: key_len,
                max: MAX_KEY_SIZE,
            });
        }
        if let Operation::Put { value, .. } = op {
            if value.len() > MAX_VALUE_SIZE {
                return Err(KvError::ValueTooLarge {
                    len: value.len(),
                    max: MAX_VALUE_SIZE,
                });
            }
        }
    }
    Ok(())
}
