//! Standalone Storage
//!
//! Single-node storage backed by the embedded [`Engine`].

use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::engine::{Engine, EngineOptions, Txn};
use crate::error::{KvError, Result};

use super::cf::{encode_modify, key_with_cf, CfIterator};
use super::lifecycle::Lifecycle;
use super::{DbIterator, RequestContext, Storage, StorageReader, WriteBatch};

/// Storage over one engine directory (`config.data_dir`)
pub struct StandaloneStorage {
    config: Config,
    state: Mutex<Lifecycle<Arc<Engine>>>,
}

impl StandaloneStorage {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: Mutex::new(Lifecycle::default()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The running engine (for tests and debugging)
    pub fn engine(&self) -> Result<Arc<Engine>> {
        self.state.lock().running().cloned()
    }

    /// Create the database if the directory is missing, open it otherwise
    fn open_engine(&self) -> Result<Engine> {
        let path = &self.config.data_dir;
        let options = EngineOptions::from_config(&self.config);

        let engine = match fs::metadata(path) {
            Ok(_) => Engine::open(path, options),
            Err(e) if e.kind() == ErrorKind::NotFound => Engine::create(path, options),
            Err(e) => {
                return Err(KvError::Startup(format!(
                    "cannot access {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        engine.map_err(|e| KvError::Startup(format!("{}: {}", path.display(), e)))
    }
}

impl Storage for StandaloneStorage {
    fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.start_with(|| self.open_engine().map(Arc::new))?;

        tracing::info!(
            "Standalone storage started at {} (value threshold {})",
            self.config.data_dir.display(),
            self.config.effective_value_threshold()
        );
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.stop() {
            Some(engine) => {
                engine.close()?;
                tracing::info!("Standalone storage stopped");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn reader(&self, ctx: &RequestContext) -> Result<Box<dyn StorageReader>> {
        let engine = self.engine()?;
        let txn = engine.begin_transaction(false)?;
        tracing::trace!(
            "request {}: reader opened at seq {}",
            ctx.request_id,
            txn.read_seq()
        );
        Ok(Box::new(StandaloneReader::new(txn, ctx.request_id)))
    }

    fn write(&self, ctx: &RequestContext, batch: WriteBatch) -> Result<()> {
        let engine = self.engine()?;
        let ops = batch
            .into_iter()
            .map(encode_modify)
            .collect::<Result<Vec<_>>>()?;

        let seq = engine.write(&ops)?;
        tracing::debug!(
            "request {}: committed {} modifications at seq {}",
            ctx.request_id,
            ops.len(),
            seq
        );
        Ok(())
    }
}

/// Reader holding one read-only engine transaction
pub struct StandaloneReader {
    txn: Option<Txn>,
    request_id: u64,
}

impl StandaloneReader {
    fn new(txn: Txn, request_id: u64) -> Self {
        Self {
            txn: Some(txn),
            request_id,
        }
    }

    fn txn(&self) -> Result<&Txn> {
        self.txn.as_ref().ok_or(KvError::ReaderClosed)
    }
}

impl StorageReader for StandaloneReader {
    fn get_cf(&self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let txn = self.txn()?;
        match txn.get(&key_with_cf(cf, key)?) {
            Ok(value) => Ok(Some(value)),
            Err(KvError::KeyNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn iter_cf(&self, cf: &str) -> Result<Box<dyn DbIterator + '_>> {
        let txn = self.txn()?;
        Ok(Box::new(CfIterator::new(txn.iter()?, cf)?))
    }

    fn close(&mut self) {
        if let Some(mut txn) = self.txn.take() {
            txn.discard();
            tracing::trace!("request {}: reader closed", self.request_id);
        }
    }
}

impl Drop for StandaloneReader {
    fn drop(&mut self) {
        self.close();
    }
}
