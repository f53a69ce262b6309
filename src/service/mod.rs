//! Service Module
//!
//! Translates raw-access requests (Get/Put/Delete/Scan) into storage
//! primitives and renders their responses.
//!
//! Every call returns a [`Reply`]: the rendered response, which carries
//! errors as text for the wire, plus the error itself for the caller.

mod raw_api;

pub use raw_api::{
    render_delete, render_put, KvPair, RawDeleteRequest, RawDeleteResponse, RawGetRequest,
    RawGetResponse, RawKvService, RawPutRequest, RawPutResponse, RawScanRequest,
    RawScanResponse, Reply,
};
