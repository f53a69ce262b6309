//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! Every `bytes` field is `len (4 bytes BE) + bytes`.
//! - RAW_GET:    cf + key
//! - RAW_PUT:    cf + key + value
//! - RAW_DELETE: cf + key
//! - PING:       empty
//! - RAW_SCAN:   cf + start_key + limit (4 bytes BE)
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! A scan response payload is `count (4 bytes BE)` followed by `count`
//! key/value `bytes` fields.
//!
//! No payload may exceed [`MAX_PAYLOAD_SIZE`]. Encoding an oversized frame is
//! an error rather than a silently wrapped length.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::engine::{MAX_KEY_SIZE, MAX_VALUE_SIZE};
use crate::error::{KvError, Result};
use crate::service::KvPair;

use super::{Command, CommandType, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (32 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 32 * 1024 * 1024;

// The largest put the engine accepts must fit in one command frame
const _: () = assert!(MAX_PAYLOAD_SIZE as usize > MAX_KEY_SIZE + MAX_VALUE_SIZE + 255 + 12);

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    let mut payload = BytesMut::new();
    match command {
        Command::RawGet { cf, key } | Command::RawDelete { cf, key } => {
            put_field(&mut payload, cf.as_bytes())?;
            put_field(&mut payload, key)?;
        }
        Command::RawPut { cf, key, value } => {
            put_field(&mut payload, cf.as_bytes())?;
            put_field(&mut payload, key)?;
            put_field(&mut payload, value)?;
        }
        Command::Ping => {}
        Command::RawScan {
            cf,
            start_key,
            limit,
        } => {
            put_field(&mut payload, cf.as_bytes())?;
            put_field(&mut payload, start_key)?;
            payload.put_u32(*limit);
        }
    }

    frame(command.command_type() as u8, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, mut payload) = split_frame(bytes, "command")?;

    let cmd_type = CommandType::try_from(cmd_type).map_err(|byte| {
        KvError::Protocol(format!("Unknown command type: 0x{:02x}", byte))
    })?;

    let command = match cmd_type {
        CommandType::RawGet => Command::RawGet {
            cf: get_cf(&mut payload, "RAW_GET")?,
            key: get_field(&mut payload, "RAW_GET key")?,
        },
        CommandType::RawPut => Command::RawPut {
            cf: get_cf(&mut payload, "RAW_PUT")?,
            key: get_field(&mut payload, "RAW_PUT key")?,
            value: get_field(&mut payload, "RAW_PUT value")?,
        },
        CommandType::RawDelete => Command::RawDelete {
            cf: get_cf(&mut payload, "RAW_DELETE")?,
            key: get_field(&mut payload, "RAW_DELETE key")?,
        },
        CommandType::Ping => Command::Ping,
        CommandType::RawScan => {
            let cf = get_cf(&mut payload, "RAW_SCAN")?;
            let start_key = get_field(&mut payload, "RAW_SCAN start key")?;
            if payload.remaining() < 4 {
                return Err(KvError::Protocol(
                    "RAW_SCAN command: missing limit".to_string(),
                ));
            }
            Command::RawScan {
                cf,
                start_key,
                limit: payload.get_u32(),
            }
        }
    };

    if payload.has_remaining() {
        return Err(KvError::Protocol(format!(
            "{:?} command: {} unexpected trailing bytes",
            cmd_type,
            payload.remaining()
        )));
    }

    Ok(command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    frame(
        response.status as u8,
        response.payload.as_deref().unwrap_or_default(),
    )
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::Error,
        _ => {
            return Err(KvError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let payload = (!payload.is_empty()).then(|| payload.to_vec());

    Ok(Response { status, payload })
}

/// Encode scan results: count (4) + (key, value) fields
pub fn encode_kv_pairs(pairs: &[KvPair]) -> Result<Vec<u8>> {
    let mut buf = BytesMut::new();
    buf.put_u32(wire_len(pairs.len())?);
    for pair in pairs {
        put_field(&mut buf, &pair.key)?;
        put_field(&mut buf, &pair.value)?;
    }
    Ok(buf.to_vec())
}

/// Number of leading pairs whose encoding fits in one response payload
pub fn kv_pairs_that_fit(pairs: &[KvPair]) -> usize {
    let mut size = 4;
    pairs
        .iter()
        .take_while(|pair| {
            size += 8 + pair.key.len() + pair.value.len();
            size <= MAX_PAYLOAD_SIZE as usize
        })
        .count()
}

/// Decode scan results produced by [`encode_kv_pairs`]
pub fn decode_kv_pairs(mut bytes: &[u8]) -> Result<Vec<KvPair>> {
    if bytes.remaining() < 4 {
        return Err(KvError::Protocol(
            "Scan response: missing pair count".to_string(),
        ));
    }
    let count = bytes.get_u32() as usize;

    // Each pair takes at least 8 bytes
    let mut pairs = Vec::with_capacity(count.min(bytes.remaining() / 8));
    for _ in 0..count {
        let key = get_field(&mut bytes, "scan key")?;
        let value = get_field(&mut bytes, "scan value")?;
        pairs.push(KvPair { key, value });
    }

    if bytes.has_remaining() {
        return Err(KvError::Protocol(format!(
            "Scan response: {} unexpected trailing bytes",
            bytes.remaining()
        )));
    }

    Ok(pairs)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command)?)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response)?)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn frame(type_byte: u8, payload: &[u8]) -> Result<Vec<u8>> {
    let len = wire_len(payload.len())?;
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(type_byte);
    message.put_u32(len);
    message.put_slice(payload);
    Ok(message.to_vec())
}

/// A length that is valid on the wire
fn wire_len(len: usize) -> Result<u32> {
    match u32::try_from(len) {
        Ok(len) if len <= MAX_PAYLOAD_SIZE => Ok(len),
        _ => Err(KvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        ))),
    }
}

/// Split a frame into its type byte and payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(KvError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let type_byte = header.get_u8();
    let payload_len = check_payload_len(header.get_u32())?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(KvError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((type_byte, &bytes[HEADER_SIZE..total_len]))
}

/// Read header + payload from a stream, returning the whole frame
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = check_payload_len((&header[1..]).get_u32())?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut message[HEADER_SIZE..])?;
    Ok(message)
}

fn check_payload_len(len: u32) -> Result<usize> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(KvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

fn put_field(buf: &mut BytesMut, bytes: &[u8]) -> Result<()> {
    buf.put_u32(wire_len(bytes.len())?);
    buf.put_slice(bytes);
    Ok(())
}

fn get_field(buf: &mut &[u8], what: &str) -> Result<Vec<u8>> {
    if buf.remaining() < 4 {
        return Err(KvError::Protocol(format!("{}: missing length", what)));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(KvError::Protocol(format!(
            "{}: incomplete (expected {}, got {})",
            what,
            len,
            buf.remaining()
        )));
    }
    let field = buf[..len].to_vec();
    buf.advance(len);
    Ok(field)
}

fn get_cf(buf: &mut &[u8], command: &str) -> Result<String> {
    let cf = get_field(buf, &format!("{} command: column family", command))?;
    String::from_utf8(cf).map_err(|_| {
        KvError::Protocol(format!("{} command: column family is not UTF-8", command))
    })
}
