//! Error types for the sync server.

use crate::mutators::MutatorError;
use rowsync_protocol::{ClientGroupId, ClientId, ErrorKind, ErrorResponse, ProtocolError};
use rowsync_store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
///
/// Any error returned while a request is being processed has already rolled
/// back that request's transaction.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Push body does not match the request envelope.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Pull body does not match the envelope, or the version is unsupported.
    #[error("version not supported: {0}")]
    VersionNotSupported(String),

    /// A mutation skipped ahead of the next expected id.
    #[error("mutation {actual} from client {client_id} is from the future, expected {expected}")]
    MutationGap {
        /// Client that sent the mutation.
        client_id: ClientId,
        /// Next id the server expected.
        expected: u64,
        /// Id found in the push.
        actual: u64,
    },

    /// A schema-valid mutation has no handler registered.
    #[error("no mutator registered for \"{name}\"")]
    MissingMutator {
        /// Mutation name.
        name: String,
    },

    /// A client id is already registered under a different client group.
    #[error("client {client_id} belongs to group {registered}, not {requested}")]
    ClientGroupMismatch {
        /// The client.
        client_id: ClientId,
        /// Group the client is registered under.
        registered: ClientGroupId,
        /// Group named by the push.
        requested: ClientGroupId,
    },

    /// A mutation handler failed.
    #[error("mutator \"{name}\" failed: {source}")]
    Mutator {
        /// Mutation name.
        name: String,
        /// Handler error.
        #[source]
        source: MutatorError,
    },

    /// Store or transaction failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Encoding failure while building a response.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_) | ServerError::VersionNotSupported(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// HTTP status code a transport should answer with.
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }

    /// Error body sent to the client.
    ///
    /// Processing failures are deliberately generic; the client retries the
    /// whole request later.
    pub fn to_response(&self) -> ErrorResponse {
        let kind = match self {
            ServerError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ServerError::VersionNotSupported(_) => ErrorKind::VersionNotSupported,
            _ => ErrorKind::InternalError,
        };
        ErrorResponse::new(kind)
    }
}
