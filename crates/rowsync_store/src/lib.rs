//! # rowsync Store
//!
//! Reference versioned object store and client registry for rowsync.
//!
//! This crate provides:
//! - Rows stamped with a per-row version on every committed write
//! - Client group and client records used by pull and push
//! - Buffered transactions with commit/abort and a single-writer lock
//! - Pluggable row visibility per client group
//! - JSON snapshots for carrying state between process runs
//!
//! The sync server only relies on the [`Transaction`] API; everything else
//! here is a convenient in-process implementation of it.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod policy;
mod snapshot;
mod store;
mod tables;
mod transaction;
mod types;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use policy::{AllVisible, OwnedByGroup, VisibilityPolicy};
pub use snapshot::{StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use store::Store;
pub use transaction::{PendingWrite, Transaction};
pub use types::{
    Client, ClientGroup, Scope, StoredObject, TransactionId, ID_FIELD, VERSION_FIELD,
};
