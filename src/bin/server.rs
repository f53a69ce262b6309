//! RawKV Server Binary
//!
//! Starts the storage backend and the TCP server.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use rawkv::config::StorageKind;
use rawkv::network::Server;
use rawkv::service::RawKvService;
use rawkv::storage::open_storage;
use rawkv::Config;
use tracing_subscriber::{fmt, EnvFilter};

/// RawKV Server
#[derive(Parser, Debug)]
#[command(name = "rawkv-server")]
#[command(about = "Single-node raw key-value service")]
#[command(version)]
struct Args {
    /// Data directory (created if missing)
    #[arg(short, long, default_value = "./rawkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:20160")]
    listen: String,

    /// Storage backend
    #[arg(short, long, value_enum, default_value_t = Backend::Standalone)]
    storage: Backend,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// MemTable size limit in MB before flush
    #[arg(short = 'M', long, default_value = "64")]
    memtable_mb: usize,

    /// Values of at least this many bytes go to the value log
    #[arg(long, default_value = "1024")]
    value_threshold: usize,

    /// Store every value in the value log
    #[arg(long)]
    separate_values: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Backend {
    Standalone,
    Memory,
}

impl From<Backend> for StorageKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Standalone => StorageKind::Standalone,
            Backend::Memory => StorageKind::Memory,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rawkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("RawKV Server v{}", rawkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .storage(args.storage.into())
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .memtable_size_limit(args.memtable_mb * 1024 * 1024)
        .value_threshold(args.value_threshold)
        .separate_values(args.separate_values)
        .build();

    let storage = open_storage(&config);
    if let Err(e) = storage.start() {
        tracing::error!("Failed to start storage: {}", e);
        std::process::exit(1);
    }

    let service = Arc::new(RawKvService::new(Arc::clone(&storage)));

    let server = match Server::bind(config, service) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind server: {}", e);
            let _ = storage.stop();
            std::process::exit(1);
        }
    };

    let result = server.run();

    if let Err(e) = storage.stop() {
        tracing::error!("Failed to stop storage cleanly: {}", e);
    }

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
