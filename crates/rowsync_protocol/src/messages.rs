//! Protocol messages for pull and push.
//!
//! Field names follow the JSON wire format spoken by Replicache clients, so
//! the Rust names are mapped explicitly with `serde(rename)`.

use crate::error::{ProtocolError, ProtocolResult};
use crate::ids::{ClientGroupId, ClientId, ObjectId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The only pull version this server accepts.
pub const PULL_VERSION: u32 = 1;

/// The only push version this server accepts.
pub const PUSH_VERSION: u32 = 1;

/// Client-held sync token.
///
/// `order` is the CVR version the client's replica was last brought up to.
/// Cookies are totally ordered per client group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cookie {
    /// CVR version the patch was generated against.
    pub order: u64,
}

impl Cookie {
    /// Creates a cookie for the given CVR version.
    #[must_use]
    pub const fn new(order: u64) -> Self {
        Self { order }
    }
}

/// Pull request from a client group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Client group that is pulling.
    #[serde(rename = "clientGroupID")]
    pub client_group_id: ClientGroupId,
    /// Cookie returned by the previous pull, `null` on the first one. The
    /// field itself is required.
    #[serde(deserialize_with = "Option::deserialize")]
    pub cookie: Option<Cookie>,
    /// Profile (browser profile / device) identifier.
    #[serde(rename = "profileID")]
    pub profile_id: String,
    /// Pull protocol version.
    #[serde(rename = "pullVersion")]
    pub pull_version: u32,
    /// Application schema version of the client.
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
}

impl PullRequest {
    /// Creates a pull request with the current pull version.
    pub fn new(client_group_id: impl Into<ClientGroupId>, cookie: Option<Cookie>) -> Self {
        Self {
            client_group_id: client_group_id.into(),
            cookie,
            profile_id: String::new(),
            pull_version: PULL_VERSION,
            schema_version: String::new(),
        }
    }

    /// Parses a pull request body.
    pub fn from_json(body: &[u8]) -> ProtocolResult<Self> {
        let request: Self = serde_json::from_slice(body)?;
        request.validate()?;
        Ok(request)
    }

    /// Checks envelope fields serde cannot express.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.pull_version != PULL_VERSION {
            return Err(ProtocolError::unsupported_version(
                "pullVersion",
                PULL_VERSION,
                self.pull_version,
            ));
        }
        Ok(())
    }
}

/// One operation of a pull patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum PatchOperation {
    /// Insert or replace a row in the client replica.
    #[serde(rename = "put")]
    Put {
        /// Row id.
        key: ObjectId,
        /// Full serialized row.
        value: Value,
    },
    /// Remove a row from the client replica.
    #[serde(rename = "del")]
    Del {
        /// Row id.
        key: ObjectId,
    },
}

impl PatchOperation {
    /// Returns the key this operation affects.
    #[must_use]
    pub fn key(&self) -> &ObjectId {
        match self {
            PatchOperation::Put { key, .. } | PatchOperation::Del { key } => key,
        }
    }

    /// Returns true for delete operations.
    #[must_use]
    pub fn is_del(&self) -> bool {
        matches!(self, PatchOperation::Del { .. })
    }
}

/// Pull response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    /// Operations that bring the replica up to date.
    pub patch: Vec<PatchOperation>,
    /// Last applied mutation id of every client in the group.
    #[serde(rename = "lastMutationIDChanges")]
    pub last_mutation_id_changes: BTreeMap<ClientId, u64>,
    /// Cookie to echo on the next pull.
    pub cookie: Option<Cookie>,
}

impl PullResponse {
    /// A response that changes nothing and hands back the client's cookie.
    #[must_use]
    pub fn unchanged(cookie: Option<Cookie>) -> Self {
        Self {
            patch: Vec::new(),
            last_mutation_id_changes: BTreeMap::new(),
            cookie,
        }
    }
}

/// A mutation as it arrives in a push request.
///
/// Only the envelope fields are typed. `name`, `args` and anything else the
/// client sends are kept verbatim and validated per mutation later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMutation {
    /// Client that created the mutation.
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Per-client mutation id, starting at 1.
    pub id: u64,
    /// Client timestamp in milliseconds.
    pub timestamp: f64,
    /// Passthrough fields (`name`, `args`, ...).
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl RawMutation {
    /// Creates a mutation with the given name and arguments.
    pub fn new(client_id: impl Into<ClientId>, id: u64, name: &str, args: Value) -> Self {
        let mut rest = Map::new();
        rest.insert("name".to_string(), Value::String(name.to_string()));
        rest.insert("args".to_string(), args);
        Self {
            client_id: client_id.into(),
            id,
            timestamp: 0.0,
            rest,
        }
    }

    /// Returns the mutation name if present and a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.rest.get("name").and_then(Value::as_str)
    }

    /// Returns the raw mutation arguments, if present.
    #[must_use]
    pub fn args(&self) -> Option<&Value> {
        self.rest.get("args")
    }
}

/// Push request from a client group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    /// Profile identifier.
    #[serde(rename = "profileID")]
    pub profile_id: String,
    /// Client group that is pushing.
    #[serde(rename = "clientGroupID")]
    pub client_group_id: ClientGroupId,
    /// Push protocol version.
    #[serde(rename = "pushVersion")]
    pub push_version: u32,
    /// Application schema version of the client.
    #[serde(rename = "schemaVersion")]
    pub schema_version: String,
    /// Mutations in client order.
    pub mutations: Vec<RawMutation>,
}

impl PushRequest {
    /// Creates a push request with the current push version.
    pub fn new(client_group_id: impl Into<ClientGroupId>, mutations: Vec<RawMutation>) -> Self {
        Self {
            profile_id: String::new(),
            client_group_id: client_group_id.into(),
            push_version: PUSH_VERSION,
            schema_version: String::new(),
            mutations,
        }
    }

    /// Parses a push request body.
    pub fn from_json(body: &[u8]) -> ProtocolResult<Self> {
        let request: Self = serde_json::from_slice(body)?;
        request.validate()?;
        Ok(request)
    }

    /// Checks envelope fields serde cannot express.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.push_version != PUSH_VERSION {
            return Err(ProtocolError::unsupported_version(
                "pushVersion",
                PUSH_VERSION,
                self.push_version,
            ));
        }
        Ok(())
    }
}

/// Push response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    /// Always true; failures are reported with an [`ErrorResponse`].
    pub success: bool,
}

impl PushResponse {
    /// A successful push.
    #[must_use]
    pub const fn success() -> Self {
        Self { success: true }
    }
}

/// Error identifiers understood by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The push body did not match the envelope.
    InvalidRequest,
    /// The pull body did not match the envelope or has the wrong version.
    VersionNotSupported,
    /// Processing aborted; the client should retry later.
    InternalError,
}

/// Error body returned instead of a pull or push response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// What went wrong.
    pub error: ErrorKind,
}

impl ErrorResponse {
    /// Creates an error body.
    #[must_use]
    pub const fn new(error: ErrorKind) -> Self {
        Self { error }
    }
}
