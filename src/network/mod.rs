//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread (non-blocking accept, polls the shutdown flag)
//! - One thread per connection, bounded by `max_connections`
//! - Commands routed through the raw KV service

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
