//! Request handlers for the pull and push endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::mutators::MutatorRegistry;
use crate::pull::{PullOutcome, PullProcessor};
use crate::push::{PushProcessor, PushSummary};
use parking_lot::RwLock;
use rowsync_protocol::{PullRequest, PullResponse, PushRequest, PushResponse};
use rowsync_store::Store;
use std::sync::Arc;

/// Counters kept by a running server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Pulls answered.
    pub pulls: u64,
    /// Pulls answered without changes.
    pub unchanged_pulls: u64,
    /// Pushes committed.
    pub pushes: u64,
    /// Mutations whose handler ran.
    pub mutations_applied: u64,
    /// Mutations skipped as duplicates or schema-invalid.
    pub mutations_skipped: u64,
    /// Requests that failed.
    pub failed_requests: u64,
}

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Backing store (shared across all handlers).
    pub store: Arc<Store>,
    /// Registered mutators.
    pub mutators: MutatorRegistry,
    stats: RwLock<ServerStats>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<Store>, mutators: MutatorRegistry) -> Self {
        Self {
            config,
            store,
            mutators,
            stats: RwLock::new(ServerStats::default()),
        }
    }

    /// Returns a copy of the current counters.
    pub fn stats(&self) -> ServerStats {
        self.stats.read().clone()
    }

    pub(crate) fn record_failure(&self) {
        self.stats.write().failed_requests += 1;
    }

    fn record_pull(&self, outcome: &PullOutcome) {
        let mut stats = self.stats.write();
        stats.pulls += 1;
        if matches!(outcome, PullOutcome::Unchanged) {
            stats.unchanged_pulls += 1;
        }
    }

    fn record_push(&self, summary: &PushSummary) {
        let mut stats = self.stats.write();
        stats.pushes += 1;
        stats.mutations_applied += summary.applied as u64;
        stats.mutations_skipped += (summary.duplicates + summary.invalid) as u64;
    }

    fn check_schema_version(&self, declared: &str) -> ServerResult<()> {
        match &self.config.schema_version {
            Some(required) if required != declared => Err(ServerError::VersionNotSupported(
                format!("schema version {declared:?}, expected {required:?}"),
            )),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("mutators", &self.mutators)
            .finish_non_exhaustive()
    }
}

/// Handler for sync requests.
#[derive(Debug)]
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles a pull request.
    pub fn handle_pull(&self, request: PullRequest) -> ServerResult<PullResponse> {
        request
            .validate()
            .map_err(|e| ServerError::VersionNotSupported(e.to_string()))?;
        self.context.check_schema_version(&request.schema_version)?;

        let outcome = PullProcessor::new(&self.context.store).process(&request)?;
        self.context.record_pull(&outcome);
        Ok(outcome.into_response(request.cookie))
    }

    /// Handles a push request.
    pub fn handle_push(&self, request: PushRequest) -> ServerResult<PushResponse> {
        request
            .validate()
            .map_err(|e| ServerError::InvalidRequest(e.to_string()))?;
        self.context.check_schema_version(&request.schema_version)?;

        let max = self.context.config.max_push_batch;
        if request.mutations.len() > max {
            return Err(ServerError::InvalidRequest(format!(
                "too many mutations: {} > {}",
                request.mutations.len(),
                max
            )));
        }

        let summary = PushProcessor::new(&self.context.store, &self.context.mutators)
            .consume_invalid(self.context.config.consume_invalid_mutations)
            .process(&request)?;
        self.context.record_push(&summary);
        Ok(PushResponse::success())
    }
}
