//! Error types for the store.

use rowsync_protocol::ObjectId;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The transaction scope may not modify this row.
    #[error("access denied to row {id}")]
    AccessDenied {
        /// The row that was written.
        id: ObjectId,
    },

    /// A write was attempted on a read-only store.
    #[error("store is read-only")]
    ReadOnly,

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// Snapshot file could not be parsed or written.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Creates an access denied error.
    pub fn access_denied(id: &ObjectId) -> Self {
        Self::AccessDenied { id: id.clone() }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
