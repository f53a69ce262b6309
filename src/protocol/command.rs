//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    RawGet = 0x01,
    RawPut = 0x02,
    RawDelete = 0x03,
    Ping = 0x04,
    RawScan = 0x05,
}

impl TryFrom<u8> for CommandType {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        match byte {
            0x01 => Ok(CommandType::RawGet),
            0x02 => Ok(CommandType::RawPut),
            0x03 => Ok(CommandType::RawDelete),
            0x04 => Ok(CommandType::Ping),
            0x05 => Ok(CommandType::RawScan),
            other => Err(other),
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    RawGet { cf: String, key: Vec<u8> },

    /// Put a key-value pair
    RawPut {
        cf: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Delete a key
    RawDelete { cf: String, key: Vec<u8> },

    /// Ping (health check)
    Ping,

    /// Up to `limit` pairs starting at `start_key`
    RawScan {
        cf: String,
        start_key: Vec<u8>,
        limit: u32,
    },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::RawGet { .. } => CommandType::RawGet,
            Command::RawPut { .. } => CommandType::RawPut,
            Command::RawDelete { .. } => CommandType::RawDelete,
            Command::Ping => CommandType::Ping,
            Command::RawScan { .. } => CommandType::RawScan,
        }
    }
}
