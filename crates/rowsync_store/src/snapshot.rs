//! JSON snapshots of a store.
//!
//! The store itself lives in memory; snapshots are how the command-line tool
//! carries state between invocations.

use crate::error::{StoreError, StoreResult};
use crate::types::{Client, ClientGroup, StoredObject};
use rowsync_protocol::{ObjectId, RowVersion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Current snapshot format version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Serializable copy of the committed store contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Format version of this snapshot.
    pub format_version: u32,
    /// Live rows.
    pub objects: Vec<StoredObject>,
    /// Last versions of deleted rows.
    #[serde(default)]
    pub retired: BTreeMap<ObjectId, RowVersion>,
    /// Client groups.
    #[serde(default)]
    pub client_groups: Vec<ClientGroup>,
    /// Clients.
    #[serde(default)]
    pub clients: Vec<Client>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            objects: Vec::new(),
            retired: BTreeMap::new(),
            client_groups: Vec::new(),
            clients: Vec::new(),
        }
    }
}

impl StoreSnapshot {
    /// Reads a snapshot file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let bytes = fs::read(path)?;
        let snapshot: Self = serde_json::from_slice(&bytes)?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::invalid_operation(format!(
                "unsupported snapshot format v{}, expected v{}",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(snapshot)
    }

    /// Writes the snapshot, replacing `path` only once the new file is complete.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
