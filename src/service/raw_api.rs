//! Raw API
//!
//! Request handlers that map each raw request onto a storage reader or a
//! write batch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{KvError, Result};
use crate::storage::{Modify, RequestContext, Storage, StorageReader};

// =============================================================================
// Requests / Responses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawGetRequest {
    pub cf: String,
    pub key: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawGetResponse {
    pub value: Vec<u8>,
    pub not_found: bool,
    /// Empty on success
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPutRequest {
    pub cf: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPutResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDeleteRequest {
    pub cf: String,
    pub key: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDeleteResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawScanRequest {
    pub cf: String,
    pub start_key: Vec<u8>,
    /// Maximum number of pairs returned
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawScanResponse {
    /// Ascending by key
    pub kvs: Vec<KvPair>,
    pub error: String,
}

/// A rendered response together with the error that produced it, if any
#[derive(Debug)]
pub struct Reply<T> {
    pub response: T,
    pub error: Option<KvError>,
}

impl<T> Reply<T> {
    fn ok(response: T) -> Self {
        Self {
            response,
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Collapse into a `Result`, dropping the response on error
    pub fn into_result(self) -> Result<T> {
        match self.error {
            None => Ok(self.response),
            Some(e) => Err(e),
        }
    }
}

/// Render the outcome of a put
pub fn render_put(result: Result<()>) -> Reply<RawPutResponse> {
    match result {
        Ok(()) => Reply::ok(RawPutResponse::default()),
        Err(e) => Reply {
            response: RawPutResponse {
                error: e.to_string(),
            },
            error: Some(e),
        },
    }
}

/// Render the outcome of a delete
pub fn render_delete(result: Result<()>) -> Reply<RawDeleteResponse> {
    match result {
        Ok(()) => Reply::ok(RawDeleteResponse::default()),
        Err(e) => Reply {
            response: RawDeleteResponse {
                error: e.to_string(),
            },
            error: Some(e),
        },
    }
}

// =============================================================================
// Service
// =============================================================================

/// Raw key-value request handler over a started [`Storage`]
pub struct RawKvService {
    storage: Arc<dyn Storage>,
    next_request_id: AtomicU64,
}

impl RawKvService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn context(&self) -> RequestContext {
        RequestContext::new(self.next_request_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Point read
    ///
    /// A missing key sets `not_found` without an error. A read error also
    /// sets `not_found`, and is reported in `error` and on the reply.
    pub fn raw_get(&self, req: RawGetRequest) -> Reply<RawGetResponse> {
        let ctx = self.context();
        let result = self
            .storage
            .reader(&ctx)
            .and_then(|mut reader| {
                let value = reader.get_cf(&req.cf, &req.key);
                reader.close();
                value
            });

        match result {
            Ok(Some(value)) => Reply::ok(RawGetResponse {
                value,
                ..Default::default()
            }),
            Ok(None) => Reply::ok(RawGetResponse {
                not_found: true,
                ..Default::default()
            }),
            Err(e) => {
                tracing::warn!("request {}: raw_get failed: {}", ctx.request_id, e);
                Reply {
                    response: RawGetResponse {
                        not_found: true,
                        error: e.to_string(),
                        ..Default::default()
                    },
                    error: Some(e),
                }
            }
        }
    }

    /// Single-entry put
    pub fn raw_put(&self, req: RawPutRequest) -> Reply<RawPutResponse> {
        let ctx = self.context();
        let modify = Modify::put(req.cf, req.key, req.value);
        let result = self.storage.write(&ctx, modify.into());
        if let Err(e) = &result {
            tracing::warn!("request {}: raw_put failed: {}", ctx.request_id, e);
        }
        render_put(result)
    }

    /// Single-entry delete
    pub fn raw_delete(&self, req: RawDeleteRequest) -> Reply<RawDeleteResponse> {
        let ctx = self.context();
        let modify = Modify::delete(req.cf, req.key);
        let result = self.storage.write(&ctx, modify.into());
        if let Err(e) = &result {
            tracing::warn!("request {}: raw_delete failed: {}", ctx.request_id, e);
        }
        render_delete(result)
    }

    /// Up to `limit` pairs with key >= `start_key`, ascending
    ///
    /// Any error discards the pairs collected so far.
    pub fn raw_scan(&self, req: RawScanRequest) -> Reply<RawScanResponse> {
        let ctx = self.context();
        let result = self.storage.reader(&ctx).and_then(|mut reader| {
            let kvs = scan(reader.as_ref(), &req);
            reader.close();
            kvs
        });

        match result {
            Ok(kvs) => Reply::ok(RawScanResponse {
                kvs,
                ..Default::default()
            }),
            Err(e) => {
                tracing::warn!("request {}: raw_scan failed: {}", ctx.request_id, e);
                Reply {
                    response: RawScanResponse {
                        kvs: Vec::new(),
                        error: e.to_string(),
                    },
                    error: Some(e),
                }
            }
        }
    }
}

fn scan(reader: &dyn StorageReader, req: &RawScanRequest) -> Result<Vec<KvPair>> {
    let mut kvs = Vec::new();
    if req.limit == 0 {
        return Ok(kvs);
    }

    let mut iter = reader.iter_cf(&req.cf)?;
    iter.seek(&req.start_key);

    let mut collected = Ok(());
    while kvs.len() < req.limit as usize {
        let Some(item) = iter.item() else { break };
        match item.value() {
            Ok(value) => kvs.push(KvPair {
                key: item.key().to_vec(),
                value,
            }),
            Err(e) => {
                collected = Err(e);
                break;
            }
        }
        iter.next();
    }

    if collected.is_ok() {
        if let Some(e) = iter.take_error() {
            collected = Err(e);
        }
    }
    iter.close();

    collected.map(|()| kvs)
}
