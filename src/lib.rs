//! # RawKV
//!
//! A single-node raw key-value service with:
//! - Column families over one ordered keyspace
//! - Atomic write batches and snapshot-consistent readers
//! - Write-Ahead Logging (WAL) with crash recovery
//! - An embedded LSM engine with a value log for large values
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (thread per client)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  RawKvService                                │
//! │            (Get / Put / Delete / Scan)                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                dyn Storage                                   │
//! │     (WriteBatch, StorageReader, per-CF iterators)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │         Engine          │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append)   │          │ (versioned) │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ flush
//!                                   ▼
//!                     ┌──────────────────────────┐
//!                     │  SSTables  +  Value log  │
//!                     └──────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod memtable;
pub mod engine;
pub mod storage;
pub mod service;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::{Config, StorageKind};
pub use engine::Engine;
pub use storage::{Modify, RequestContext, Storage, StorageReader, WriteBatch};
pub use service::RawKvService;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of RawKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
