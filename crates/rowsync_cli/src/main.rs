//! rowsync CLI
//!
//! Command-line tools for a rowsync store kept in a JSON snapshot file.
//!
//! # Commands
//!
//! - `init` - Create an empty snapshot
//! - `pull` - Answer a pull request body against the snapshot
//! - `push` - Apply a push request body to the snapshot
//! - `inspect` - Display client groups, clients and row counts

mod commands;
mod error;

use clap::{Parser, Subcommand, ValueEnum};
use commands::Context;
use rowsync_server::ServerConfig;
use rowsync_store::{OwnedByGroup, StoreConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// rowsync command-line tools.
#[derive(Parser)]
#[command(name = "rowsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the snapshot file
    #[arg(global = true, short, long, default_value = "rowsync.json")]
    path: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Row visibility between client groups
    #[arg(global = true, long, value_enum, default_value_t = Policy::All)]
    policy: Policy,

    /// Schema version clients must declare
    #[arg(global = true, long)]
    schema_version: Option<String>,

    /// Maximum mutations per push
    #[arg(global = true, long, default_value_t = 100)]
    max_push_batch: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Policy {
    /// Every group sees every row
    All,
    /// Groups see system rows and rows they created
    Owned,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty snapshot
    Init {
        /// Overwrite an existing snapshot
        #[arg(short, long)]
        force: bool,
    },

    /// Answer a pull request
    Pull {
        /// File holding the JSON request body ("-" for stdin)
        #[arg(short, long)]
        request: PathBuf,

        /// Value of the X-Replicache-RequestID header
        #[arg(long)]
        request_id: Option<String>,
    },

    /// Apply a push request
    Push {
        /// File holding the JSON request body ("-" for stdin)
        #[arg(short, long)]
        request: PathBuf,

        /// Value of the X-Replicache-RequestID header
        #[arg(long)]
        request_id: Option<String>,
    },

    /// Display client groups, clients and row counts
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut server_config = ServerConfig::new().with_max_push_batch(cli.max_push_batch);
    if let Some(version) = cli.schema_version {
        server_config = server_config.with_schema_version(version);
    }
    let store_config = match cli.policy {
        Policy::All => StoreConfig::new(),
        Policy::Owned => StoreConfig::new().policy(OwnedByGroup),
    };
    let ctx = Context::new(cli.path, store_config, server_config);

    match cli.command {
        Commands::Init { force } => commands::init::run(&ctx, force)?,
        Commands::Pull {
            request,
            request_id,
        } => {
            let reply = commands::sync::run_pull(&ctx, &request, request_id.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Commands::Push {
            request,
            request_id,
        } => {
            let reply = commands::sync::run_push(&ctx, &request, request_id.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Commands::Inspect { format } => {
            let result = commands::inspect::run(&ctx)?;
            commands::inspect::print(&result, &format)?;
        }
        Commands::Version => {
            println!("rowsync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("rowsync protocol v{}", rowsync_protocol::PROTOCOL_VERSION);
        }
    }

    Ok(())
}
