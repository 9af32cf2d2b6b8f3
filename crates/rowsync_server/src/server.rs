//! Main sync server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler, ServerStats};
use crate::mutators::MutatorRegistry;
use rowsync_protocol::{
    ProtocolError, PullRequest, PullResponse, PushRequest, PushResponse, RequestId,
};
use rowsync_store::Store;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, info_span, warn};

/// Header carrying the client's request id.
pub const REQUEST_ID_HEADER: &str = "X-Replicache-RequestID";

/// A transport-neutral reply: status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Value,
}

impl JsonReply {
    /// Returns true for 2xx replies.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn from_result<T: Serialize>(result: ServerResult<T>) -> Self {
        match result {
            Ok(response) => Self::ok(&response),
            Err(e) => Self::error(&e),
        }
    }

    fn ok<T: Serialize>(response: &T) -> Self {
        match serde_json::to_value(response) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::error(&ServerError::from(ProtocolError::from(e))),
        }
    }

    fn error(err: &ServerError) -> Self {
        let body = serde_json::to_value(err.to_response()).unwrap_or(Value::Null);
        Self {
            status: err.status_code(),
            body,
        }
    }
}

/// The sync server.
///
/// Answers pull and push requests for any number of client groups against a
/// shared [`Store`]. Requests are serialized by the store's writer lock, so
/// a server can be shared between threads behind an `Arc`.
///
/// # Example
///
/// ```
/// use rowsync_server::{MutatorRegistry, ServerConfig, SyncServer};
/// use rowsync_protocol::PullRequest;
/// use rowsync_store::Store;
/// use std::sync::Arc;
///
/// let server = SyncServer::new(
///     ServerConfig::default(),
///     Arc::new(Store::in_memory()),
///     MutatorRegistry::new(),
/// );
///
/// let response = server.handle_pull(PullRequest::new("group-1", None)).unwrap();
/// assert_eq!(response.cookie.map(|c| c.order), Some(1));
/// ```
#[derive(Debug)]
pub struct SyncServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SyncServer {
    /// Creates a new sync server.
    pub fn new(config: ServerConfig, store: Arc<Store>, mutators: MutatorRegistry) -> Self {
        let missing = mutators.missing_handlers();
        if !missing.is_empty() {
            warn!(?missing, "mutations declared without a handler will fail every push");
        }

        let context = Arc::new(HandlerContext::new(config, store, mutators));
        let handler = RequestHandler::new(Arc::clone(&context));
        Self { handler, context }
    }

    /// Handles a pull request.
    pub fn handle_pull(&self, request: PullRequest) -> ServerResult<PullResponse> {
        let span = info_span!("pull", client_group_id = %request.client_group_id);
        let _enter = span.enter();

        let result = self.handler.handle_pull(request);
        self.finish("pull", result)
    }

    /// Handles a push request.
    pub fn handle_push(&self, request: PushRequest) -> ServerResult<PushResponse> {
        let span = info_span!(
            "push",
            client_group_id = %request.client_group_id,
            mutations = request.mutations.len()
        );
        let _enter = span.enter();

        let result = self.handler.handle_push(request);
        self.finish("push", result)
    }

    /// Handles a JSON pull body.
    ///
    /// `request_id` is the raw value of [`REQUEST_ID_HEADER`], if any.
    pub fn pull_json(&self, body: &[u8], request_id: Option<&str>) -> JsonReply {
        let request_id = RequestId::from_header(request_id);
        let span = info_span!("pull_json", %request_id);
        let _enter = span.enter();

        let request = self
            .check_body_size(body, ServerError::VersionNotSupported)
            .and_then(|()| {
                PullRequest::from_json(body)
                    .map_err(|e| ServerError::VersionNotSupported(e.to_string()))
            });
        match request {
            Ok(request) => JsonReply::from_result(self.handle_pull(request)),
            Err(e) => self.reject_body("pull", &e),
        }
    }

    /// Handles a JSON push body.
    ///
    /// `request_id` is the raw value of [`REQUEST_ID_HEADER`], if any.
    pub fn push_json(&self, body: &[u8], request_id: Option<&str>) -> JsonReply {
        let request_id = RequestId::from_header(request_id);
        let span = info_span!("push_json", %request_id);
        let _enter = span.enter();

        let request = self
            .check_body_size(body, ServerError::InvalidRequest)
            .and_then(|()| {
                PushRequest::from_json(body).map_err(|e| ServerError::InvalidRequest(e.to_string()))
            });
        match request {
            Ok(request) => JsonReply::from_result(self.handle_push(request)),
            Err(e) => self.reject_body("push", &e),
        }
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Returns the backing store.
    pub fn store(&self) -> &Arc<Store> {
        &self.context.store
    }

    /// Returns the registered mutators.
    pub fn mutators(&self) -> &MutatorRegistry {
        &self.context.mutators
    }

    /// Returns a copy of the request counters.
    pub fn stats(&self) -> ServerStats {
        self.context.stats()
    }

    fn check_body_size(
        &self,
        body: &[u8],
        reject: fn(String) -> ServerError,
    ) -> ServerResult<()> {
        let max = self.context.config.max_body_bytes;
        if body.len() > max {
            return Err(reject(format!("body of {} bytes exceeds {max}", body.len())));
        }
        Ok(())
    }

    fn finish<T>(&self, endpoint: &str, result: ServerResult<T>) -> ServerResult<T> {
        match &result {
            Ok(_) => info!(endpoint, "request completed"),
            Err(e) => {
                self.context.record_failure();
                if e.is_client_error() {
                    warn!(endpoint, error = %e, "request rejected");
                } else {
                    error!(endpoint, error = %e, "request failed");
                }
            }
        }
        result
    }

    fn reject_body(&self, endpoint: &str, err: &ServerError) -> JsonReply {
        self.context.record_failure();
        warn!(endpoint, error = %err, "unreadable request body");
        JsonReply::error(err)
    }
}
