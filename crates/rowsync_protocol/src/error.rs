//! Error types for protocol encoding and validation.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while decoding or validating protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Malformed JSON or a body that does not match the envelope.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The stored CVR blob could not be encoded.
    #[error("cvr encoding failed: {0}")]
    CvrEncode(String),

    /// The stored CVR blob could not be decoded.
    #[error("cvr decoding failed: {0}")]
    CvrDecode(String),

    /// The request declares a pull/push version this server does not speak.
    #[error("unsupported {field}: expected {expected}, got {actual}")]
    UnsupportedVersion {
        /// Name of the version field.
        field: &'static str,
        /// Version this server accepts.
        expected: u32,
        /// Version found in the request.
        actual: u32,
    },
}

impl ProtocolError {
    /// Creates an unsupported version error.
    pub fn unsupported_version(field: &'static str, expected: u32, actual: u32) -> Self {
        Self::UnsupportedVersion {
            field,
            expected,
            actual,
        }
    }
}
