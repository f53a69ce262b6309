//! WAL Writer
//!
//! Handles appending entries to the WAL file.
//!
//! Every append either lands as one complete record or leaves the file
//! exactly as it was: a failed write is rolled back to the offset recorded
//! before it, so no rejected batch can resurface on recovery.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{KvError, Result};

use super::reader::{Record, WalReader};
use super::{Operation, WalEntry};

/// File operations the writer relies on beyond `Write`
pub trait LogFile: Write {
    /// Current length in bytes
    fn file_len(&self) -> io::Result<u64>;

    /// Cut or extend the file to `len` bytes
    fn set_file_len(&self, len: u64) -> io::Result<()>;

    /// Flush file contents to stable storage
    fn sync(&self) -> io::Result<()>;
}

impl LogFile for File {
    fn file_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn set_file_len(&self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Writes entries to the WAL file
pub struct WalWriter<F: LogFile = File> {
    path: PathBuf,
    file: F,
    /// Length of the log up to the last complete record
    len: u64,
    /// LSN assigned to the next appended entry
    next_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries written since the last fsync
    unsynced: usize,
    /// Set when a failed append could not be rolled back
    damaged: bool,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// An existing file is scanned so that numbering continues after its
    /// last valid entry.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Self::with_file(path, file, sync_strategy)
    }
}

impl<F: LogFile> WalWriter<F> {
    /// Wrap an already opened, append-mode handle to the log at `path`
    pub fn with_file(path: &Path, file: F, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let mut last_lsn = 0;
        if path.exists() {
            let mut reader = WalReader::open(path)?;
            loop {
                match reader.read_record()? {
                    Record::Entry(entry) => last_lsn = last_lsn.max(entry.lsn),
                    Record::Corrupt(_) => continue,
                    Record::Truncated | Record::End => break,
                }
            }
        }

        let len = file.file_len()?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
            next_lsn: last_lsn + 1,
            sync_strategy,
            unsynced: 0,
            damaged: false,
        })
    }

    /// Append a batch of operations as one entry; returns its LSN
    ///
    /// On error nothing of the entry remains in the file.
    pub fn append(&mut self, operations: Vec<Operation>) -> Result<u64> {
        if self.damaged {
            return Err(KvError::WalWrite(format!(
                "{} has a partial record that could not be removed",
                self.path.display()
            )));
        }

        let lsn = self.next_lsn;
        let entry = WalEntry::new(lsn, operations);
        let bytes = entry.serialize()?;

        if let Err(e) = self.file.write_all(&bytes).and_then(|_| self.file.flush()) {
            self.rollback();
            return Err(KvError::WalWrite(format!("append lsn {}: {}", lsn, e)));
        }

        self.len += bytes.len() as u64;
        self.next_lsn += 1;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count.max(1),
        };
        if due {
            self.sync()?;
        }

        Ok(lsn)
    }

    /// Drop whatever a failed append left past the last complete record
    fn rollback(&mut self) {
        if let Err(e) = self.file.set_file_len(self.len) {
            tracing::error!(
                "Could not roll back WAL {} to {} bytes: {}",
                self.path.display(),
                self.len,
                e
            );
            self.damaged = true;
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop all entries (they are durable elsewhere). LSNs keep increasing.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.set_file_len(0)?;
        self.file.sync()?;
        self.len = 0;
        self.unsynced = 0;
        self.damaged = false;
        Ok(())
    }

    /// Get the LSN the next entry will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
