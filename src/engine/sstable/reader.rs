//! SSTable Reader
//!
//! Opens SSTable files and provides O(log n) key lookups via in-memory index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Bound;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::engine::vlog::ValuePointer;
use crate::error::{KvError, Result};

use super::{
    TableValue, ENTRY_HEADER_SIZE, FOOTER_SIZE, HEADER_SIZE, KIND_INLINE, KIND_POINTER,
    KIND_TOMBSTONE, MAGIC, VERSION,
};

/// Reader for SSTable files with in-memory index for O(log n) lookups
///
/// The file handle sits behind a Mutex so one reader can be shared by every
/// snapshot that references this table.
pub struct SSTableReader {
    path: PathBuf,
    /// File handle for reading entries
    file: Mutex<BufReader<File>>,
    /// In-memory index: key → file offset
    index: BTreeMap<Vec<u8>, u64>,
    entry_count: u64,
}

impl SSTableReader {
    /// Open an SSTable for reading
    ///
    /// Validates header and data CRC, then loads the index into memory.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(KvError::Corruption(format!(
                "SSTable {} too small: {} bytes",
                path.display(),
                file_size
            )));
        }

        // Header
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(KvError::Corruption(format!(
                "Invalid SSTable magic: expected RKVT, got {:?}",
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(KvError::Storage(format!(
                "Unsupported SSTable version: {}",
                version
            )));
        }

        let entry_count = read_u64(&header[6..14]);

        // Footer
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let index_offset = read_u64(&footer[0..8]);
        let data_crc = read_u32(&footer[8..12]);

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(KvError::Corruption(format!(
                "SSTable {} has invalid index offset {}",
                path.display(),
                index_offset
            )));
        }

        // Data block CRC
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut data = vec![0u8; (index_offset - HEADER_SIZE) as usize];
        file.read_exact(&mut data)?;
        let actual_crc = crc32fast::hash(&data);
        if actual_crc != data_crc {
            return Err(KvError::Corruption(format!(
                "SSTable {} data CRC mismatch: expected {:08x}, got {:08x}",
                path.display(),
                data_crc,
                actual_crc
            )));
        }
        drop(data);

        // Index block: [key_len(4)][offset(8)][key]
        let index_block_size = file_size - FOOTER_SIZE - index_offset;
        let mut index_data = vec![0u8; index_block_size as usize];
        file.read_exact(&mut index_data)?;

        let mut index = BTreeMap::new();
        let mut pos = 0;
        while pos < index_data.len() {
            if pos + 12 > index_data.len() {
                return Err(KvError::Corruption("truncated SSTable index".to_string()));
            }
            let key_len = read_u32(&index_data[pos..pos + 4]) as usize;
            let offset = read_u64(&index_data[pos + 4..pos + 12]);
            pos += 12;

            if pos + key_len > index_data.len() {
                return Err(KvError::Corruption("truncated SSTable index key".to_string()));
            }
            index.insert(index_data[pos..pos + key_len].to_vec(), offset);
            pos += key_len;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufReader::new(file)),
            index,
            entry_count,
        })
    }

    /// Get the stored value for a key — O(log n) lookup via in-memory index
    ///
    /// Returns `Ok(None)` if the key is not in this SSTable. A deleted key is
    /// `Ok(Some(TableValue::Tombstone))`.
    pub fn get(&self, key: &[u8]) -> Result<Option<TableValue>> {
        let offset = match self.index.get(key) {
            Some(&off) => off,
            None => return Ok(None),
        };

        let (_, value) = self.read_entry(offset)?;
        Ok(Some(value))
    }

    /// First entry whose key is >= `key`
    pub fn seek(&self, key: &[u8]) -> Result<Option<(Vec<u8>, TableValue)>> {
        let offset = match self
            .index
            .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
            .next()
        {
            Some((_, &off)) => off,
            None => return Ok(None),
        };

        self.read_entry(offset).map(Some)
    }

    fn read_entry(&self, offset: u64) -> Result<(Vec<u8>, TableValue)> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; ENTRY_HEADER_SIZE];
        file.read_exact(&mut header)?;

        let key_len = read_u32(&header[0..4]) as usize;
        let kind = header[4];
        let val_len = read_u32(&header[5..9]) as usize;

        let mut key = vec![0u8; key_len];
        file.read_exact(&mut key)?;

        let value = match kind {
            KIND_TOMBSTONE => TableValue::Tombstone,
            KIND_INLINE => {
                let mut v = vec![0u8; val_len];
                file.read_exact(&mut v)?;
                TableValue::Inline(v)
            }
            KIND_POINTER => {
                let mut v = vec![0u8; val_len];
                file.read_exact(&mut v)?;
                TableValue::Pointer(ValuePointer::decode(&v)?)
            }
            other => {
                return Err(KvError::Corruption(format!(
                    "Unknown entry kind {} in {}",
                    other,
                    self.path.display()
                )))
            }
        };

        Ok((key, value))
    }

    /// Get entry count
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the minimum key in this SSTable (for range filtering)
    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    /// Get the maximum key in this SSTable (for range filtering)
    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false,
        }
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
