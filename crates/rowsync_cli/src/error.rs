//! CLI errors.

use rowsync_store::StoreError;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// `init` would overwrite a snapshot.
    #[error("snapshot already exists at {} (use --force to overwrite)", .0.display())]
    SnapshotExists(PathBuf),

    /// A command needs a snapshot that is not there.
    #[error("no snapshot at {}; run `rowsync init` first", .0.display())]
    MissingSnapshot(PathBuf),

    /// The server answered with an error envelope.
    #[error("request failed with status {status}: {body}")]
    RequestFailed {
        /// Status code.
        status: u16,
        /// Error envelope.
        body: Value,
    },

    /// Unknown output format.
    #[error("unknown format \"{0}\" (expected text or json)")]
    UnknownFormat(String),

    /// Snapshot load or save failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading the request failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON output failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;
