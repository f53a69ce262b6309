//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log records. One record holds one
//! committed write batch, so a batch is either fully replayed or not at all.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{KvError, Result};

/// Record header: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Upper bound on a single record body; anything larger is treated as garbage
pub const MAX_RECORD_SIZE: usize = 64 * 1024 * 1024;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing, doubles as commit seq
    pub lsn: u64,

    /// Operations of the batch, in commit order
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

impl Operation {
    /// Key targeted by this operation
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }

    /// Approximate in-memory footprint, used for memtable accounting
    pub fn size(&self) -> usize {
        match self {
            Operation::Put { key, value } => key.len() + value.len(),
            Operation::Delete { key } => key.len(),
        }
    }
}

impl WalEntry {
    /// Create a new entry stamped with the current time
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operations,
            timestamp,
        }
    }

    /// Serialize to the on-disk record format
    ///
    /// ```text
    /// [LSN: u64 LE][CRC32 of body: u32 LE][body len: u32 LE][body (bincode)]
    /// ```
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)?;
        if body.len() > MAX_RECORD_SIZE {
            return Err(KvError::WalWrite(format!(
                "record of {} bytes exceeds max {}",
                body.len(),
                MAX_RECORD_SIZE
            )));
        }

        let crc = crc32fast::hash(&body);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Deserialize a complete record (header + body)
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let header = RecordHeader::parse(bytes)?;

        let body_end = HEADER_SIZE + header.len as usize;
        if bytes.len() < body_end {
            return Err(KvError::WalCorruption(format!(
                "truncated record: expected {} body bytes, got {}",
                header.len,
                bytes.len() - HEADER_SIZE
            )));
        }

        Self::decode_body(&header, &bytes[HEADER_SIZE..body_end])
    }

    /// Validate and decode a record body against its header
    pub(crate) fn decode_body(header: &RecordHeader, body: &[u8]) -> Result<Self> {
        let actual = crc32fast::hash(body);
        if actual != header.crc {
            return Err(KvError::WalCorruption(format!(
                "CRC mismatch at lsn {}: expected {:08x}, got {:08x}",
                header.lsn, header.crc, actual
            )));
        }

        let entry: WalEntry = bincode::deserialize(body)
            .map_err(|e| KvError::WalCorruption(format!("undecodable record: {}", e)))?;

        if entry.lsn != header.lsn {
            return Err(KvError::WalCorruption(format!(
                "LSN mismatch: header {} body {}",
                header.lsn, entry.lsn
            )));
        }

        Ok(entry)
    }
}

/// Parsed fixed-size record header
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecordHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl RecordHeader {
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(KvError::WalCorruption(format!(
                "incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        lsn.copy_from_slice(&bytes[0..8]);
        crc.copy_from_slice(&bytes[8..12]);
        len.copy_from_slice(&bytes[12..16]);

        Ok(Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            len: u32::from_le_bytes(len),
        })
    }
}
