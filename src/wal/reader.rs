//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{KvError, Result};

use super::entry::{RecordHeader, HEADER_SIZE, MAX_RECORD_SIZE};
use super::WalEntry;

/// Outcome of reading one record
pub(crate) enum Record {
    /// A valid entry
    Entry(WalEntry),

    /// A complete record whose body failed validation; the reader has moved past it
    Corrupt(KvError),

    /// The file ends in the middle of a record (partial write)
    Truncated,

    /// Clean end of file
    End,
}

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// Offset just past the last complete record
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at end of file or at a partially written tail.
    /// A corrupted record is reported as `WalCorruption`.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.read_record()? {
            Record::Entry(entry) => Ok(Some(entry)),
            Record::Corrupt(e) => Err(e),
            Record::Truncated | Record::End => Ok(None),
        }
    }

    /// Offset just past the last complete record
    pub fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn read_record(&mut self) -> Result<Record> {
        let mut header_bytes = [0u8; HEADER_SIZE];
        let n = read_full(&mut self.reader, &mut header_bytes)?;
        if n == 0 {
            return Ok(Record::End);
        }
        if n < HEADER_SIZE {
            return Ok(Record::Truncated);
        }

        let header = RecordHeader::parse(&header_bytes)?;
        let len = header.len as usize;
        if len > MAX_RECORD_SIZE {
            // A garbage length cannot be skipped reliably
            return Ok(Record::Truncated);
        }

        let mut body = vec![0u8; len];
        let n = read_full(&mut self.reader, &mut body)?;
        if n < len {
            return Ok(Record::Truncated);
        }

        self.position += (HEADER_SIZE + len) as u64;

        match WalEntry::decode_body(&header, &body) {
            Ok(entry) => Ok(Record::Entry(entry)),
            Err(e) => Ok(Record::Corrupt(e)),
        }
    }
}

/// Read until `buf` is full or EOF; returns the number of bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
