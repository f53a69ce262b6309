//! Value Log
//!
//! Append-only file holding values too large to keep inline in SSTables.
//! SSTables store a [`ValuePointer`] instead; reading the value back is a
//! separate I/O step that can fail on its own.
//!
//! ## Record Format
//! ```text
//! ┌──────────┬──────────┬──────────────────┐
//! │ Len (4)  │ CRC (4)  │      Value       │
//! └──────────┴──────────┴──────────────────┘
//! ```

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{KvError, Result};

const RECORD_HEADER_SIZE: u64 = 8;

/// Encoded size of a pointer: offset (8) + len (4)
pub const POINTER_SIZE: usize = 12;

/// Location of a value inside the value log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValuePointer {
    /// Offset of the record header
    pub offset: u64,
    /// Value length in bytes
    pub len: u32,
}

impl ValuePointer {
    pub fn encode(&self) -> [u8; POINTER_SIZE] {
        let mut out = [0u8; POINTER_SIZE];
        out[0..8].copy_from_slice(&self.offset.to_le_bytes());
        out[8..12].copy_from_slice(&self.len.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != POINTER_SIZE {
            return Err(KvError::Corruption(format!(
                "value pointer must be {} bytes, got {}",
                POINTER_SIZE,
                bytes.len()
            )));
        }
        let mut offset = [0u8; 8];
        let mut len = [0u8; 4];
        offset.copy_from_slice(&bytes[0..8]);
        len.copy_from_slice(&bytes[8..12]);
        Ok(Self {
            offset: u64::from_le_bytes(offset),
            len: u32::from_le_bytes(len),
        })
    }
}

/// Append-only value log
pub struct ValueLog {
    path: PathBuf,
    /// (file, end offset)
    inner: Mutex<(File, u64)>,
}

impl ValueLog {
    /// Open or create the value log at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        let end = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new((file, end)),
        })
    }

    /// Append a value; returns where it was written
    pub fn append(&self, value: &[u8]) -> Result<ValuePointer> {
        let len = u32::try_from(value.len()).map_err(|_| KvError::ValueTooLarge {
            len: value.len(),
            max: u32::MAX as usize,
        })?;

        let mut guard = self.inner.lock();
        let (file, end) = &mut *guard;
        let offset = *end;

        let mut record = Vec::with_capacity(RECORD_HEADER_SIZE as usize + value.len());
        record.extend_from_slice(&len.to_le_bytes());
        record.extend_from_slice(&crc32fast::hash(value).to_le_bytes());
        record.extend_from_slice(value);

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&record)?;
        *end += record.len() as u64;

        Ok(ValuePointer { offset, len })
    }

    /// Read the value a pointer refers to, verifying length and checksum
    pub fn read(&self, ptr: ValuePointer) -> Result<Vec<u8>> {
        let mut guard = self.inner.lock();
        let (file, end) = &mut *guard;

        if ptr.offset + RECORD_HEADER_SIZE + ptr.len as u64 > *end {
            return Err(KvError::Corruption(format!(
                "value pointer {}+{} beyond end of {} ({} bytes)",
                ptr.offset,
                ptr.len,
                self.path.display(),
                end
            )));
        }

        file.seek(SeekFrom::Start(ptr.offset))?;
        let mut header = [0u8; RECORD_HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        let mut len = [0u8; 4];
        let mut crc = [0u8; 4];
        len.copy_from_slice(&header[0..4]);
        crc.copy_from_slice(&header[4..8]);

        if u32::from_le_bytes(len) != ptr.len {
            return Err(KvError::Corruption(format!(
                "value log length mismatch at offset {}",
                ptr.offset
            )));
        }

        let mut value = vec![0u8; ptr.len as usize];
        file.read_exact(&mut value)?;

        if crc32fast::hash(&value) != u32::from_le_bytes(crc) {
            return Err(KvError::Corruption(format!(
                "value log CRC mismatch at offset {}",
                ptr.offset
            )));
        }

        Ok(value)
    }

    /// Force appended values to disk
    pub fn sync(&self) -> Result<()> {
        let guard = self.inner.lock();
        guard.0.sync_data()?;
        Ok(())
    }

    /// Current size of the log in bytes
    pub fn len(&self) -> u64 {
        self.inner.lock().1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
