//! Test fixtures and server helpers.
//!
//! Provides a [`TestServer`] wrapping a [`SyncServer`] over an in-memory
//! store, plus builders for the requests tests send most often.

use rowsync_protocol::{
    ClientGroupId, ClientId, Cookie, ObjectId, PullRequest, PullResponse, PushRequest, RawMutation,
};
use rowsync_server::{MutatorRegistry, ServerConfig, ServerResult, SyncServer};
use rowsync_store::{Scope, Store, StoreConfig, StoredObject, VisibilityPolicy};
use rowsync_todo::{todo_mutators, CREATE_TODO, DELETE_TODO, UPDATE_TODO};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A sync server over a fresh store.
pub struct TestServer {
    /// The server instance.
    pub server: SyncServer,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestServer {
    /// Creates a server with the todo mutators and default configuration.
    pub fn todos() -> Self {
        Self::build(ServerConfig::default(), StoreConfig::default(), todo_mutators())
    }

    /// Creates a todo server whose store applies `policy`.
    pub fn with_policy(policy: impl VisibilityPolicy + 'static) -> Self {
        Self::build(
            ServerConfig::default(),
            StoreConfig::new().policy(policy),
            todo_mutators(),
        )
    }

    /// Creates a server from its parts.
    pub fn build(config: ServerConfig, store: StoreConfig, mutators: MutatorRegistry) -> Self {
        Self {
            server: SyncServer::new(config, Arc::new(Store::new(store)), mutators),
            temp_dir: None,
        }
    }

    /// Attaches a temporary directory for snapshot files.
    pub fn with_temp_dir(mut self) -> Self {
        self.temp_dir = Some(TempDir::new().expect("Failed to create temp directory"));
        self
    }

    /// Path of `store.json` inside the temporary directory, if one is attached.
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(|d| d.path().join("store.json"))
    }

    /// Returns the store.
    pub fn store(&self) -> &Store {
        self.server.store()
    }

    /// Writes a row as the system, outside any client group.
    pub fn seed(self, id: &str, fields: Value) -> Self {
        let Value::Object(fields) = fields else {
            panic!("seed fields must be a JSON object");
        };
        self.store()
            .transaction(Scope::System, |txn| txn.put_object(ObjectId::from(id), fields))
            .expect("Failed to seed row");
        self
    }

    /// Writes a todo row as the system.
    pub fn seed_todo(self, id: &str, content: &str) -> Self {
        self.seed(
            id,
            json!({
                "content": content,
                "complete": false,
                "created_at": "2024-01-01T00:00:00.000Z",
            }),
        )
    }

    /// Writes a row owned by `group`.
    pub fn seed_owned(self, group: &str, id: &str, fields: Map<String, Value>) -> Self {
        self.store()
            .transaction(ClientGroupId::from(group), |txn| {
                txn.put_object(ObjectId::from(id), fields)
            })
            .expect("Failed to seed owned row");
        self
    }

    /// Deletes a row as the system.
    pub fn remove(&self, id: &str) {
        self.store()
            .transaction(Scope::System, |txn| txn.delete_object(&ObjectId::from(id)))
            .expect("Failed to delete row");
    }

    /// Reads a row as the system.
    pub fn row(&self, id: &str) -> Option<StoredObject> {
        self.store().begin(Scope::System).get_object(&ObjectId::from(id))
    }

    /// Pulls, panicking on failure.
    pub fn pull(&self, group: &str, cookie: Option<u64>) -> PullResponse {
        self.try_pull(group, cookie).expect("pull failed")
    }

    /// Pulls.
    pub fn try_pull(&self, group: &str, cookie: Option<u64>) -> ServerResult<PullResponse> {
        self.server.handle_pull(pull_request(group, cookie))
    }

    /// Pushes, panicking on failure.
    pub fn push(&self, group: &str, mutations: Vec<RawMutation>) {
        self.try_push(group, mutations).expect("push failed");
    }

    /// Pushes.
    pub fn try_push(&self, group: &str, mutations: Vec<RawMutation>) -> ServerResult<()> {
        self.server
            .handle_push(PushRequest::new(group, mutations))
            .map(|_| ())
    }

    /// `last_mutation_id` of a client, or `None` if the server never saw it.
    pub fn last_mutation_id(&self, client: &str) -> Option<u64> {
        self.store()
            .begin(Scope::System)
            .client(&ClientId::from(client))
            .map(|c| c.last_mutation_id)
    }
}

impl std::ops::Deref for TestServer {
    type Target = SyncServer;

    fn deref(&self) -> &Self::Target {
        &self.server
    }
}

/// Builds a pull request.
pub fn pull_request(group: &str, cookie: Option<u64>) -> PullRequest {
    PullRequest::new(group, cookie.map(Cookie::new))
}

/// Builds a `createTodo` mutation.
pub fn create_todo(client: &str, id: u64, todo: &str, content: &str) -> RawMutation {
    RawMutation::new(
        client,
        id,
        CREATE_TODO,
        json!({
            "replicache_id": todo,
            "content": content,
            "complete": false,
            "created_at": "2024-01-01T00:00:00.000Z",
        }),
    )
}

/// Builds an `updateTodo` mutation that sets `complete`.
pub fn complete_todo(client: &str, id: u64, todo: &str, complete: bool) -> RawMutation {
    RawMutation::new(
        client,
        id,
        UPDATE_TODO,
        json!({ "replicache_id": todo, "complete": complete }),
    )
}

/// Builds a `deleteTodo` mutation.
pub fn delete_todo(client: &str, id: u64, todo: &str) -> RawMutation {
    RawMutation::new(client, id, DELETE_TODO, json!({ "replicache_id": todo }))
}

/// Keys of the put operations in a patch, in order.
pub fn put_keys(response: &PullResponse) -> Vec<String> {
    response
        .patch
        .iter()
        .filter(|op| !op.is_del())
        .map(|op| op.key().to_string())
        .collect()
}

/// Keys of the del operations in a patch, in order.
pub fn del_keys(response: &PullResponse) -> Vec<String> {
    response
        .patch
        .iter()
        .filter(|op| op.is_del())
        .map(|op| op.key().to_string())
        .collect()
}

/// Cookie order of a response; panics if it carries none.
pub fn cookie_order(response: &PullResponse) -> u64 {
    response.cookie.expect("response has no cookie").order
}
