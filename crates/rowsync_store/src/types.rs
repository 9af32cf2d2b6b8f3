//! Records held by the store.

use rowsync_protocol::{ClientGroupId, ClientId, ObjectId, RowVersion, DEFAULT_CVR_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Field name carrying the row id in serialized rows.
pub const ID_FIELD: &str = "replicache_id";

/// Field name carrying the row version in serialized rows.
pub const VERSION_FIELD: &str = "replicache_version";

/// Unique identifier for a transaction, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Who a transaction runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A client group; reads are filtered by the visibility policy.
    Group(ClientGroupId),
    /// Administrative access (seeding, inspection); sees every row.
    System,
}

impl Scope {
    /// Returns the client group, if this is a group scope.
    #[must_use]
    pub fn group(&self) -> Option<&ClientGroupId> {
        match self {
            Scope::Group(id) => Some(id),
            Scope::System => None,
        }
    }
}

impl From<ClientGroupId> for Scope {
    fn from(id: ClientGroupId) -> Self {
        Scope::Group(id)
    }
}

impl From<&ClientGroupId> for Scope {
    fn from(id: &ClientGroupId) -> Self {
        Scope::Group(id.clone())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Group(id) => write!(f, "group:{id}"),
            Scope::System => f.write_str("system"),
        }
    }
}

/// A synced row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    /// Stable external id.
    #[serde(rename = "replicache_id")]
    pub id: ObjectId,
    /// Version stamped by the store.
    #[serde(rename = "replicache_version")]
    pub version: RowVersion,
    /// Client group that created the row; `None` for system rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<ClientGroupId>,
    /// Domain fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StoredObject {
    /// Serializes the row the way clients see it: domain fields plus id and
    /// version, without ownership metadata.
    #[must_use]
    pub fn to_patch_value(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert(ID_FIELD.to_string(), Value::String(self.id.to_string()));
        map.insert(VERSION_FIELD.to_string(), Value::from(self.version.as_u64()));
        Value::Object(map)
    }

    /// Returns a domain field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Server-side state of a client group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientGroup {
    /// Client-generated group id.
    pub id: ClientGroupId,
    /// Version of the last CVR handed out; only ever increases.
    pub cvr_version: u64,
    /// Last persisted CVR as an opaque blob; `None` until the first pull.
    #[serde(default)]
    pub cvr: Option<Vec<u8>>,
}

impl ClientGroup {
    /// A group that has never been pulled.
    pub fn new(id: ClientGroupId) -> Self {
        Self {
            id,
            cvr_version: DEFAULT_CVR_VERSION,
            cvr: None,
        }
    }
}

/// Server-side state of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Client-generated id.
    pub id: ClientId,
    /// Group the client belongs to.
    pub group_id: ClientGroupId,
    /// Id of the last mutation applied for this client; 0 if none.
    pub last_mutation_id: u64,
}

impl Client {
    /// A client that has not had any mutation applied.
    pub fn new(id: ClientId, group_id: ClientGroupId) -> Self {
        Self {
            id,
            group_id,
            last_mutation_id: 0,
        }
    }
}
