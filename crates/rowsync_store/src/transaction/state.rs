//! Transaction state.

use crate::error::{StoreError, StoreResult};
use crate::policy::VisibilityPolicy;
use crate::tables::Tables;
use crate::types::{Client, ClientGroup, Scope, StoredObject, TransactionId, ID_FIELD, VERSION_FIELD};
use parking_lot::MutexGuard;
use rowsync_protocol::{ClientGroupId, ClientId, ObjectId, RowVersion};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::trace;

/// Represents a pending row write in a transaction.
#[derive(Debug, Clone)]
pub enum PendingWrite {
    /// Insert or replace a row; the version is already stamped.
    Put(StoredObject),
    /// Delete a row.
    Delete,
}

/// An active transaction.
///
/// A transaction holds the store's writer lock for its whole lifetime, so
/// everything it reads stays valid until it commits or is dropped. Writes
/// are buffered and only become visible to other transactions on
/// [`Transaction::commit`]; dropping the transaction discards them.
pub struct Transaction<'a> {
    id: TransactionId,
    scope: Scope,
    tables: MutexGuard<'a, Tables>,
    policy: &'a dyn VisibilityPolicy,
    read_only: bool,
    /// Pending row writes.
    objects: BTreeMap<ObjectId, PendingWrite>,
    /// Pending client group upserts.
    groups: BTreeMap<ClientGroupId, ClientGroup>,
    /// Pending client upserts.
    clients: BTreeMap<ClientId, Client>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(
        id: TransactionId,
        scope: Scope,
        tables: MutexGuard<'a, Tables>,
        policy: &'a dyn VisibilityPolicy,
        read_only: bool,
    ) -> Self {
        Self {
            id,
            scope,
            tables,
            policy,
            read_only,
            objects: BTreeMap::new(),
            groups: BTreeMap::new(),
            clients: BTreeMap::new(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the scope the transaction runs on behalf of.
    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns the number of pending writes of any kind.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.objects.len() + self.groups.len() + self.clients.len()
    }

    fn current(&self, id: &ObjectId) -> Option<&StoredObject> {
        match self.objects.get(id) {
            Some(PendingWrite::Put(object)) => Some(object),
            Some(PendingWrite::Delete) => None,
            None => self.tables.objects.get(id),
        }
    }

    fn is_visible(&self, object: &StoredObject) -> bool {
        self.policy.is_visible(&self.scope, object)
    }

    /// Reads a row visible to this transaction.
    #[must_use]
    pub fn get_object(&self, id: &ObjectId) -> Option<StoredObject> {
        self.current(id)
            .filter(|object| self.is_visible(object))
            .cloned()
    }

    /// Reads the rows among `ids` that are visible, in the order given.
    ///
    /// Unknown and invisible ids are skipped.
    #[must_use]
    pub fn objects(&self, ids: &[ObjectId]) -> Vec<StoredObject> {
        ids.iter().filter_map(|id| self.get_object(id)).collect()
    }

    /// Returns `(id, version)` of every row visible to this transaction.
    #[must_use]
    pub fn object_metadata(&self) -> Vec<(ObjectId, RowVersion)> {
        let committed = self
            .tables
            .objects
            .iter()
            .filter(|(id, _)| !self.objects.contains_key(*id))
            .map(|(_, object)| object);
        let pending = self.objects.values().filter_map(|write| match write {
            PendingWrite::Put(object) => Some(object),
            PendingWrite::Delete => None,
        });

        let mut metadata: Vec<_> = committed
            .chain(pending)
            .filter(|object| self.is_visible(object))
            .map(|object| (object.id.clone(), object.version))
            .collect();
        metadata.sort_by(|a, b| a.0.cmp(&b.0));
        metadata
    }

    /// Inserts or replaces a row, returning the version it will commit with.
    ///
    /// New rows are owned by the transaction's client group. Replacing a row
    /// the scope cannot see fails with [`StoreError::AccessDenied`].
    pub fn put_object(&mut self, id: ObjectId, mut fields: Map<String, Value>) -> StoreResult<RowVersion> {
        fields.remove(ID_FIELD);
        fields.remove(VERSION_FIELD);

        let owner = match self.current(&id) {
            Some(existing) if !self.is_visible(existing) => {
                return Err(StoreError::access_denied(&id));
            }
            Some(existing) => existing.owner.clone(),
            None => self.scope.group().cloned(),
        };
        let version = self.tables.next_version(&id);

        trace!(txn = %self.id, %id, %version, "put row");
        self.objects.insert(
            id.clone(),
            PendingWrite::Put(StoredObject {
                id,
                version,
                owner,
                fields,
            }),
        );
        Ok(version)
    }

    /// Deletes a row. Returns false if no visible row had this id.
    pub fn delete_object(&mut self, id: &ObjectId) -> StoreResult<bool> {
        match self.current(id) {
            None => return Ok(false),
            Some(existing) if !self.is_visible(existing) => {
                return Err(StoreError::access_denied(id));
            }
            Some(_) => {}
        }

        trace!(txn = %self.id, %id, "delete row");
        self.objects.insert(id.clone(), PendingWrite::Delete);
        Ok(true)
    }

    /// Reads a client group.
    #[must_use]
    pub fn client_group(&self, id: &ClientGroupId) -> Option<ClientGroup> {
        self.groups
            .get(id)
            .or_else(|| self.tables.groups.get(id))
            .cloned()
    }

    /// Inserts or replaces a client group.
    pub fn put_client_group(&mut self, group: ClientGroup) {
        self.groups.insert(group.id.clone(), group);
    }

    /// Reads a client.
    #[must_use]
    pub fn client(&self, id: &ClientId) -> Option<Client> {
        self.clients
            .get(id)
            .or_else(|| self.tables.clients.get(id))
            .cloned()
    }

    /// Inserts or replaces a client.
    pub fn put_client(&mut self, client: Client) {
        self.clients.insert(client.id.clone(), client);
    }

    /// Returns every client that belongs to `group_id`.
    #[must_use]
    pub fn clients_in_group(&self, group_id: &ClientGroupId) -> Vec<Client> {
        let committed = self
            .tables
            .clients
            .iter()
            .filter(|(id, _)| !self.clients.contains_key(*id))
            .map(|(_, client)| client);

        let mut clients: Vec<Client> = committed
            .chain(self.clients.values())
            .filter(|client| &client.group_id == group_id)
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.id.cmp(&b.id));
        clients
    }

    /// Makes all pending writes visible to later transactions.
    pub fn commit(self) -> StoreResult<TransactionId> {
        let Transaction {
            id,
            mut tables,
            read_only,
            objects,
            groups,
            clients,
            ..
        } = self;

        let writes = objects.len() + groups.len() + clients.len();
        if read_only && writes > 0 {
            return Err(StoreError::ReadOnly);
        }

        for (object_id, write) in objects {
            match write {
                PendingWrite::Put(object) => {
                    tables.retired.remove(&object_id);
                    tables.objects.insert(object_id, object);
                }
                PendingWrite::Delete => {
                    if let Some(removed) = tables.objects.remove(&object_id) {
                        tables.retired.insert(object_id, removed.version);
                    }
                }
            }
        }
        tables.groups.extend(groups);
        tables.clients.extend(clients);

        trace!(txn = %id, writes, "committed");
        Ok(id)
    }

    /// Discards all pending writes.
    pub fn abort(self) {
        trace!(txn = %self.id, writes = self.write_count(), "aborted");
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("write_count", &self.write_count())
            .finish_non_exhaustive()
    }
}
