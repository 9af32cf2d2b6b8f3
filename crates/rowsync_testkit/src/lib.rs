//! # rowsync Testkit
//!
//! Test utilities for rowsync.
//!
//! This crate provides:
//! - A test server fixture with a seeded store
//! - Builders for pull and push requests
//! - Property-based test generators using proptest
//! - Concurrent stress helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rowsync_testkit::prelude::*;
//!
//! #[test]
//! fn pulls_seeded_rows() {
//!     let server = TestServer::todos().seed_todo("todo/1", "milk");
//!     let response = server.pull("g1", None);
//!     assert_eq!(response.patch.len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
