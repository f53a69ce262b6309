//! Engine Transactions
//!
//! A transaction reads from the snapshot taken when it began. Writable
//! transactions buffer their writes and hand them to the engine as one
//! atomic batch on commit.

use std::sync::Arc;

use crate::error::{KvError, Result};
use crate::wal::Operation;

use super::iterator::EngineIterator;
use super::snapshot::Snapshot;
use super::Engine;

/// A read-only or read-write transaction
pub struct Txn {
    engine: Arc<Engine>,
    snapshot: Snapshot,
    /// Buffered writes; `None` for read-only transactions
    pending: Option<Vec<Operation>>,
    discarded: bool,
}

impl Txn {
    pub(crate) fn new(engine: Arc<Engine>, snapshot: Snapshot, writable: bool) -> Self {
        Self {
            engine,
            snapshot,
            pending: writable.then(Vec::new),
            discarded: false,
        }
    }

    /// Read a key
    ///
    /// Buffered writes of this transaction win over the snapshot. A missing
    /// or deleted key is `Err(KeyNotFound)`.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.ensure_active()?;

        if let Some(pending) = &self.pending {
            if let Some(op) = pending.iter().rev().find(|op| op.key() == key) {
                return match op {
                    Operation::Put { value, .. } => Ok(value.clone()),
                    Operation::Delete { .. } => Err(KvError::KeyNotFound),
                };
            }
        }

        self.snapshot.get(key)
    }

    /// Buffer a put
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.buffer(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    /// Buffer a delete
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.buffer(Operation::Delete { key: key.to_vec() })
    }

    /// Iterator over the transaction's snapshot (buffered writes are not included)
    pub fn iter(&self) -> Result<EngineIterator> {
        self.ensure_active()?;
        Ok(EngineIterator::new(self.snapshot.clone()))
    }

    /// Commit buffered writes atomically; a read-only commit is a no-op
    pub fn commit(mut self) -> Result<()> {
        self.ensure_active()?;
        self.discarded = true;
        match self.pending.take() {
            Some(ops) if !ops.is_empty() => self.engine.write(&ops).map(|_| ()),
            _ => Ok(()),
        }
    }

    /// Drop buffered writes and release the snapshot. Idempotent.
    pub fn discard(&mut self) {
        if let Some(pending) = self.pending.as_mut() {
            pending.clear();
        }
        self.discarded = true;
    }

    pub fn is_writable(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded
    }

    /// Sequence number of the snapshot this transaction reads at
    pub fn read_seq(&self) -> u64 {
        self.snapshot.read_seq()
    }

    fn buffer(&mut self, op: Operation) -> Result<()> {
        self.ensure_active()?;
        let pending = self.pending.as_mut().ok_or(KvError::ReadOnlyTransaction)?;
        pending.push(op);
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.discarded {
            return Err(KvError::Storage("transaction already finished".to_string()));
        }
        Ok(())
    }
}
