//! Committed store contents.

use crate::snapshot::{StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
use crate::types::{Client, ClientGroup, StoredObject};
use rowsync_protocol::{ClientGroupId, ClientId, ObjectId, RowVersion};
use std::collections::BTreeMap;

/// Everything visible to new transactions.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    /// Live rows.
    pub objects: BTreeMap<ObjectId, StoredObject>,
    /// Last version of deleted rows, so a recreated row keeps counting up.
    pub retired: BTreeMap<ObjectId, RowVersion>,
    /// Client groups.
    pub groups: BTreeMap<ClientGroupId, ClientGroup>,
    /// Clients of all groups.
    pub clients: BTreeMap<ClientId, Client>,
}

impl Tables {
    /// Version the next committed write of `id` will carry.
    pub fn next_version(&self, id: &ObjectId) -> RowVersion {
        self.objects
            .get(id)
            .map(|object| object.version)
            .or_else(|| self.retired.get(id).copied())
            .map_or(RowVersion::INITIAL, RowVersion::next)
    }

    pub fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            objects: self.objects.values().cloned().collect(),
            retired: self.retired.clone(),
            client_groups: self.groups.values().cloned().collect(),
            clients: self.clients.values().cloned().collect(),
        }
    }
}

impl From<StoreSnapshot> for Tables {
    fn from(snapshot: StoreSnapshot) -> Self {
        Self {
            objects: snapshot
                .objects
                .into_iter()
                .map(|object| (object.id.clone(), object))
                .collect(),
            retired: snapshot.retired,
            groups: snapshot
                .client_groups
                .into_iter()
                .map(|group| (group.id.clone(), group))
                .collect(),
            clients: snapshot
                .clients
                .into_iter()
                .map(|client| (client.id.clone(), client))
                .collect(),
        }
    }
}
