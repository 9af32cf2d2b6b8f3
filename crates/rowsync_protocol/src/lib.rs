//! # rowsync Protocol
//!
//! Wire types and the client view record engine for rowsync.
//!
//! This crate provides:
//! - Identifier newtypes (`ClientGroupId`, `ClientId`, `ObjectId`, `RowVersion`)
//! - `ClientViewRecord` construction and diffing
//! - Pull and push request/response messages (JSON)
//! - Parsing of the `X-Replicache-RequestID` header
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod cvr;
mod error;
mod ids;
mod messages;
mod request_id;

pub use cvr::{ClientViewRecord, CvrDiff, DEFAULT_CVR_VERSION};
pub use error::{ProtocolError, ProtocolResult};
pub use ids::{ClientGroupId, ClientId, ObjectId, RowVersion};
pub use messages::{
    Cookie, ErrorKind, ErrorResponse, PatchOperation, PullRequest, PullResponse, PushRequest,
    PushResponse, RawMutation, PULL_VERSION, PUSH_VERSION,
};
pub use request_id::RequestId;

/// Protocol version of this crate's wire format.
pub const PROTOCOL_VERSION: u32 = 1;
