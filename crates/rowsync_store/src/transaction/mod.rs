//! Transaction management.
//!
//! This module provides:
//! - `Transaction` - a buffered read/write view of the store
//! - `PendingWrite` - a row write waiting for commit

mod state;

pub use state::{PendingWrite, Transaction};
