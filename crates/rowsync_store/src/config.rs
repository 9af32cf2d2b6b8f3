//! Store configuration.

use crate::policy::{AllVisible, VisibilityPolicy};
use std::sync::Arc;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Policy applied to every read inside a transaction.
    pub policy: Arc<dyn VisibilityPolicy>,

    /// Whether commits that carry writes are refused.
    pub read_only: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            policy: Arc::new(AllVisible),
            read_only: false,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the visibility policy.
    #[must_use]
    pub fn policy(mut self, policy: impl VisibilityPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Sets whether the store refuses writes.
    #[must_use]
    pub fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }
}
