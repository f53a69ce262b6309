//! Response definitions
//!
//! Represents responses to clients.

use crate::error::Result;
use crate::service::KvPair;

use super::codec::{decode_kv_pairs, encode_kv_pairs, kv_pairs_that_fit};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (value for GET, pairs for SCAN, message for ERROR)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create an OK response carrying scan results
    ///
    /// Pairs past the frame size limit are left out; the client resumes the
    /// scan after the last key it received.
    pub fn scan(pairs: &[KvPair]) -> Self {
        let fit = kv_pairs_that_fit(pairs);
        if fit < pairs.len() {
            tracing::debug!(
                "Scan response holds {} of {} pairs to stay within one frame",
                fit,
                pairs.len()
            );
        }
        match encode_kv_pairs(&pairs[..fit]) {
            Ok(payload) => Self::ok(Some(payload)),
            Err(e) => Self::error(&e.to_string()),
        }
    }

    /// Decode the pairs of a scan response
    pub fn kv_pairs(&self) -> Result<Vec<KvPair>> {
        decode_kv_pairs(self.payload.as_deref().unwrap_or_default())
    }

    /// Error message of an ERROR response
    pub fn error_message(&self) -> Option<String> {
        match self.status {
            Status::Error => Some(
                self.payload
                    .as_deref()
                    .map(|p| String::from_utf8_lossy(p).into_owned())
                    .unwrap_or_default(),
            ),
            _ => None,
        }
    }
}
