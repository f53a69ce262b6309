//! Memory Storage
//!
//! Volatile backend over a copy-on-write `BTreeMap`. A reader clones the
//! current `Arc`; a write copies the map only while readers still hold the
//! old one. Column families use the same key encoding as the engine.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::engine::{validate_batch, Item};
use crate::error::{KvError, Result};
use crate::wal::Operation;

use super::cf::{cf_prefix, encode_modify, key_with_cf};
use super::lifecycle::Lifecycle;
use super::{DbIterator, RequestContext, Storage, StorageReader, WriteBatch};

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory storage; contents are lost on stop
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<Lifecycle<()>>,
    data: RwLock<Arc<Map>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys across all column families
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn start(&self) -> Result<()> {
        self.state.lock().start_with(|| Ok(()))?;
        tracing::info!("Memory storage started");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        if self.state.lock().stop().is_some() {
            *self.data.write() = Arc::new(Map::new());
            tracing::info!("Memory storage stopped");
        }
        Ok(())
    }

    fn reader(&self, ctx: &RequestContext) -> Result<Box<dyn StorageReader>> {
        self.state.lock().running()?;
        let snapshot = self.data.read().clone();
        tracing::trace!("request {}: memory reader opened", ctx.request_id);
        Ok(Box::new(MemoryReader {
            data: Some(snapshot),
        }))
    }

    fn write(&self, ctx: &RequestContext, batch: WriteBatch) -> Result<()> {
        let state = self.state.lock();
        state.running()?;

        let ops = batch
            .into_iter()
            .map(encode_modify)
            .collect::<Result<Vec<_>>>()?;
        validate_batch(&ops)?;

        let mut data = self.data.write();
        let map = Arc::make_mut(&mut *data);
        for op in &ops {
            match op {
                Operation::Put { key, value } => {
                    map.insert(key.clone(), value.clone());
                }
                Operation::Delete { key } => {
                    map.remove(key);
                }
            }
        }

        tracing::debug!(
            "request {}: applied {} modifications in memory",
            ctx.request_id,
            ops.len()
        );
        Ok(())
    }
}

/// Reader over a frozen copy of the map
pub struct MemoryReader {
    data: Option<Arc<Map>>,
}

impl MemoryReader {
    fn data(&self) -> Result<&Arc<Map>> {
        self.data.as_ref().ok_or(KvError::ReaderClosed)
    }
}

impl StorageReader for MemoryReader {
    fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data()?.get(&key_with_cf(cf, key)?).cloned())
    }

    fn iter_cf(&self, cf: &str) -> Result<Box<dyn DbIterator + '_>> {
        Ok(Box::new(MemoryIterator {
            data: self.data()?,
            prefix: cf_prefix(cf)?,
            current: None,
        }))
    }

    fn close(&mut self) {
        self.data = None;
    }
}

struct MemoryIterator<'a> {
    data: &'a Map,
    prefix: Vec<u8>,
    /// Full (prefixed) key under the cursor
    current: Option<&'a [u8]>,
}

impl<'a> MemoryIterator<'a> {
    fn position(&mut self, from: Bound<&[u8]>) {
        let data: &'a Map = self.data;
        self.current = data
            .range::<[u8], _>((from, Bound::Unbounded))
            .next()
            .map(|(k, _)| k.as_slice())
            .filter(|k| k.starts_with(&self.prefix));
    }
}

impl DbIterator for MemoryIterator<'_> {
    fn seek(&mut self, key: &[u8]) {
        let mut target = self.prefix.clone();
        target.extend_from_slice(key);
        self.position(Bound::Included(target.as_slice()));
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn item(&self) -> Option<Item<'_>> {
        let (key, value) = self.data.get_key_value(self.current?)?;
        Some(Item::inline(&key[self.prefix.len()..], value))
    }

    fn next(&mut self) {
        if let Some(key) = self.current {
            self.position(Bound::Excluded(key));
        }
    }

    fn take_error(&mut self) -> Option<KvError> {
        None
    }

    fn close(&mut self) {
        self.current = None;
    }
}
