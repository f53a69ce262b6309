//! RawKV CLI Client
//!
//! Command-line interface for interacting with a RawKV server.

use std::net::TcpStream;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rawkv::protocol::{read_response, write_command, Command, Response, Status};
use rawkv::storage::CF_DEFAULT;

/// RawKV CLI
#[derive(Parser, Debug)]
#[command(name = "rawkv-cli")]
#[command(about = "CLI for the RawKV key-value service")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:20160")]
    server: String,

    /// Column family
    #[arg(long, default_value = CF_DEFAULT)]
    cf: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// List pairs starting at a key
    Scan {
        /// First key to return (inclusive)
        #[arg(default_value = "")]
        start: String,

        /// Maximum number of pairs
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Ping the server
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let is_scan = matches!(args.command, Commands::Scan { .. });

    let command = match args.command {
        Commands::Get { key } => Command::RawGet {
            cf: args.cf,
            key: key.into_bytes(),
        },
        Commands::Put { key, value } => Command::RawPut {
            cf: args.cf,
            key: key.into_bytes(),
            value: value.into_bytes(),
        },
        Commands::Del { key } => Command::RawDelete {
            cf: args.cf,
            key: key.into_bytes(),
        },
        Commands::Scan { start, limit } => Command::RawScan {
            cf: args.cf,
            start_key: start.into_bytes(),
            limit,
        },
        Commands::Ping => Command::Ping,
    };

    match send(&args.server, &command) {
        Ok(response) => print_response(&response, is_scan),
        Err(e) => {
            eprintln!("(error) {}", e);
            ExitCode::FAILURE
        }
    }
}

fn send(server: &str, command: &Command) -> rawkv::Result<Response> {
    let mut stream = TcpStream::connect(server)?;
    write_command(&mut stream, command)?;
    read_response(&mut stream)
}

fn print_response(response: &Response, is_scan: bool) -> ExitCode {
    match response.status {
        Status::Ok if is_scan => match response.kv_pairs() {
            Ok(pairs) => {
                for (i, pair) in pairs.iter().enumerate() {
                    println!(
                        "{}) {} => {}",
                        i + 1,
                        String::from_utf8_lossy(&pair.key),
                        String::from_utf8_lossy(&pair.value)
                    );
                }
                if pairs.is_empty() {
                    println!("(empty)");
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("(error) {}", e);
                ExitCode::FAILURE
            }
        },
        Status::Ok => {
            match &response.payload {
                Some(value) => println!("{}", String::from_utf8_lossy(value)),
                None => println!("OK"),
            }
            ExitCode::SUCCESS
        }
        Status::NotFound => {
            println!("(nil)");
            ExitCode::SUCCESS
        }
        Status::Error => {
            eprintln!("(error) {}", response.error_message().unwrap_or_default());
            ExitCode::FAILURE
        }
    }
}
