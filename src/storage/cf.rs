//! Column Families
//!
//! Column families share the engine's single keyspace. Every engine key is
//! prefixed with its CF name:
//!
//! ```text
//! ┌──────────┬────────────┬──────────┐
//! │ CfLen(1) │  CF bytes  │ User key │
//! └──────────┴────────────┴──────────┘
//! ```
//!
//! The length byte keeps each CF a contiguous key range that no other CF
//! overlaps, so a CF iterator can stop at the first key without its prefix.

use crate::engine::{EngineIterator, Item};
use crate::error::{KvError, Result};
use crate::wal::Operation;

use super::{DbIterator, Modify};

pub const CF_DEFAULT: &str = "default";
pub const CF_LOCK: &str = "lock";
pub const CF_WRITE: &str = "write";

/// Engine key prefix for `cf`
pub(crate) fn cf_prefix(cf: &str) -> Result<Vec<u8>> {
    let len = u8::try_from(cf.len()).map_err(|_| {
        KvError::InvalidColumnFamily(format!("name is {} bytes (max 255)", cf.len()))
    })?;

    let mut prefix = Vec::with_capacity(1 + cf.len());
    prefix.push(len);
    prefix.extend_from_slice(cf.as_bytes());
    Ok(prefix)
}

/// Engine key for `key` in column family `cf`
pub fn key_with_cf(cf: &str, key: &[u8]) -> Result<Vec<u8>> {
    let mut encoded = cf_prefix(cf)?;
    encoded.extend_from_slice(key);
    Ok(encoded)
}

/// Translate a modification into the engine operation it stands for
pub(crate) fn encode_modify(modify: Modify) -> Result<Operation> {
    Ok(match modify {
        Modify::Put { cf, key, value } => Operation::Put {
            key: key_with_cf(&cf, &key)?,
            value,
        },
        Modify::Delete { cf, key } => Operation::Delete {
            key: key_with_cf(&cf, &key)?,
        },
    })
}

/// Engine iterator restricted to one column family
///
/// Keys are reported without the CF prefix.
pub struct CfIterator {
    inner: EngineIterator,
    prefix: Vec<u8>,
}

impl CfIterator {
    pub fn new(inner: EngineIterator, cf: &str) -> Result<Self> {
        Ok(Self {
            inner,
            prefix: cf_prefix(cf)?,
        })
    }
}

impl DbIterator for CfIterator {
    fn seek(&mut self, key: &[u8]) {
        let mut target = self.prefix.clone();
        target.extend_from_slice(key);
        self.inner.seek(&target);
    }

    fn valid(&self) -> bool {
        self.item().is_some()
    }

    fn item(&self) -> Option<Item<'_>> {
        let item = self.inner.item()?;
        let user_key = item.key().strip_prefix(self.prefix.as_slice())?;
        Some(item.with_key(user_key))
    }

    fn next(&mut self) {
        if self.valid() {
            self.inner.next();
        }
    }

    fn take_error(&mut self) -> Option<KvError> {
        self.inner.take_error()
    }

    fn close(&mut self) {
        self.inner.close();
    }
}
