//! # rowsync Server
//!
//! Pull and push processing for row-versioned offline sync.
//!
//! This crate provides:
//! - The pull processor, which diffs Client View Records into patches
//! - The push processor, which applies client mutations exactly once
//! - A registry of mutation schemas and handlers
//! - A transport-neutral server with JSON entry points
//!
//! # Protocol
//!
//! Clients are grouped into client groups that share one replica:
//! 1. A push carries mutations, each numbered per client; the server applies
//!    the next expected id, skips ids it has already seen and aborts on gaps
//! 2. A pull carries the cookie of the client's last pull; the server
//!    answers with the rows that changed since then, the new cookie and the
//!    `last_mutation_id` of every client in the group
//!
//! Every request runs in one store transaction and either commits entirely
//! or leaves the store untouched.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod mutators;
mod pull;
mod push;
mod registry;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler, ServerStats};
pub use mutators::{
    Mutation, MutationContext, Mutator, MutatorError, MutatorRegistry, MutatorResult,
    SchemaViolation,
};
pub use pull::{PullOutcome, PullProcessor};
pub use push::{PushProcessor, PushSummary};
pub use server::{JsonReply, SyncServer, REQUEST_ID_HEADER};
