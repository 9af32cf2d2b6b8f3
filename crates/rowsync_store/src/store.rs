//! Store facade.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::snapshot::StoreSnapshot;
use crate::tables::Tables;
use crate::transaction::Transaction;
use crate::types::{Scope, TransactionId};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// The versioned object store and client registry.
///
/// `Store` holds the synced rows together with the client group and client
/// records the sync protocol needs, and gives transactional access to both.
///
/// ## Single-Writer Guarantee
///
/// Only one transaction is active at a time: [`Store::begin`] takes an
/// exclusive lock that the [`Transaction`] holds until it commits or is
/// dropped. Two concurrent pushes for the same client group therefore always
/// observe each other's committed `last_mutation_id`.
///
/// # Example
///
/// ```rust
/// use rowsync_protocol::ObjectId;
/// use rowsync_store::{Scope, Store, StoreError};
///
/// let store = Store::in_memory();
/// store
///     .transaction(Scope::System, |txn| {
///         txn.put_object(ObjectId::from("todo/1"), serde_json::Map::new())?;
///         Ok::<_, StoreError>(())
///     })
///     .unwrap();
/// assert_eq!(store.object_count(), 1);
/// ```
pub struct Store {
    config: StoreConfig,
    tables: Mutex<Tables>,
    next_txid: AtomicU64,
}

impl Store {
    /// Creates an empty store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            tables: Mutex::new(Tables::default()),
            next_txid: AtomicU64::new(1),
        }
    }

    /// Creates an empty store with the default configuration.
    pub fn in_memory() -> Self {
        Self::new(StoreConfig::default())
    }

    /// Creates a store holding the contents of a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot, config: StoreConfig) -> Self {
        Self {
            config,
            tables: Mutex::new(Tables::from(snapshot)),
            next_txid: AtomicU64::new(1),
        }
    }

    /// Opens a store from a snapshot file, or an empty one if the file does
    /// not exist yet.
    pub fn open(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no snapshot, starting empty");
            return Ok(Self::new(config));
        }
        let snapshot = StoreSnapshot::load(path)?;
        debug!(
            path = %path.display(),
            objects = snapshot.objects.len(),
            groups = snapshot.client_groups.len(),
            "loaded snapshot"
        );
        Ok(Self::from_snapshot(snapshot, config))
    }

    /// Writes the committed contents to a snapshot file.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        self.snapshot().save(path)
    }

    /// Returns a copy of the committed contents.
    ///
    /// Waits for any active transaction to finish.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.tables.lock().to_snapshot()
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Begins a transaction on behalf of `scope`.
    ///
    /// Blocks while another transaction is active.
    pub fn begin(&self, scope: impl Into<Scope>) -> Transaction<'_> {
        let tables = self.tables.lock();
        let id = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        Transaction::new(
            id,
            scope.into(),
            tables,
            self.config.policy.as_ref(),
            self.config.read_only,
        )
    }

    /// Executes a function within a transaction.
    ///
    /// If the function returns `Ok`, the transaction is committed.
    /// If it returns `Err`, the transaction is aborted and nothing it wrote
    /// becomes visible.
    pub fn transaction<F, T, E>(&self, scope: impl Into<Scope>, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut txn = self.begin(scope);
        match f(&mut txn) {
            Ok(result) => {
                txn.commit()?;
                Ok(result)
            }
            Err(e) => {
                txn.abort();
                Err(e)
            }
        }
    }

    /// Number of live rows.
    pub fn object_count(&self) -> usize {
        self.tables.lock().objects.len()
    }

    /// Number of client groups.
    pub fn client_group_count(&self) -> usize {
        self.tables.lock().groups.len()
    }

    /// Number of clients across all groups.
    pub fn client_count(&self) -> usize {
        self.tables.lock().clients.len()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::OwnedByGroup;
    use crate::types::{Client, ClientGroup};
    use rowsync_protocol::{ClientGroupId, ClientId, ObjectId, RowVersion};
    use serde_json::{json, Map, Value};
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn group(id: &str) -> ClientGroupId {
        ClientGroupId::from(id)
    }

    #[test]
    fn commit_makes_writes_visible() {
        let store = Store::in_memory();
        let id = ObjectId::from("todo/1");

        let version = store
            .transaction(Scope::System, |txn| {
                txn.put_object(id.clone(), fields(json!({"content": "milk"})))
            })
            .unwrap();
        assert_eq!(version, RowVersion::INITIAL);

        let mut txn = store.begin(Scope::System);
        let object = txn.get_object(&id).unwrap();
        assert_eq!(object.field("content"), Some(&json!("milk")));
        assert_eq!(txn.object_metadata(), vec![(id.clone(), RowVersion::INITIAL)]);
        assert_eq!(txn.write_count(), 0);
        txn.put_object(id, Map::new()).unwrap();
        txn.abort();
    }

    #[test]
    fn failed_closure_discards_writes() {
        let store = Store::in_memory();

        let result: Result<(), StoreError> = store.transaction(&group("g1"), |txn| {
            txn.put_object(ObjectId::from("todo/1"), Map::new())?;
            txn.put_client_group(ClientGroup::new(group("g1")));
            Err(StoreError::invalid_operation("boom"))
        });

        assert!(result.is_err());
        assert_eq!(store.object_count(), 0);
        assert_eq!(store.client_group_count(), 0);
    }

    #[test]
    fn versions_bump_per_commit_and_survive_delete() {
        let store = Store::in_memory();
        let id = ObjectId::from("todo/1");

        for expected in 1..=3 {
            let version = store
                .transaction(Scope::System, |txn| txn.put_object(id.clone(), Map::new()))
                .unwrap();
            assert_eq!(version, RowVersion::new(expected));
        }

        let deleted = store
            .transaction(Scope::System, |txn| txn.delete_object(&id))
            .unwrap();
        assert!(deleted);
        assert_eq!(store.object_count(), 0);

        let version = store
            .transaction(Scope::System, |txn| txn.put_object(id.clone(), Map::new()))
            .unwrap();
        assert_eq!(version, RowVersion::new(4));
    }

    #[test]
    fn pending_writes_are_read_back() {
        let store = Store::in_memory();
        let mut txn = store.begin(Scope::System);
        let a = ObjectId::from("a");
        let b = ObjectId::from("b");

        txn.put_object(a.clone(), Map::new()).unwrap();
        txn.put_object(b.clone(), Map::new()).unwrap();
        assert!(txn.delete_object(&b).unwrap());
        assert!(!txn.delete_object(&ObjectId::from("missing")).unwrap());

        assert_eq!(txn.object_metadata(), vec![(a.clone(), RowVersion::INITIAL)]);
        assert_eq!(txn.objects(&[b, a.clone()]).len(), 1);
        txn.commit().unwrap();

        assert_eq!(store.object_count(), 1);
    }

    #[test]
    fn owned_rows_are_hidden_from_other_groups() {
        let store = Store::new(StoreConfig::new().policy(OwnedByGroup));
        let id = ObjectId::from("todo/1");

        store
            .transaction(&group("g1"), |txn| txn.put_object(id.clone(), Map::new()))
            .unwrap();

        let mut txn = store.begin(&group("g2"));
        assert!(txn.get_object(&id).is_none());
        assert!(txn.object_metadata().is_empty());
        let err = txn.put_object(id.clone(), Map::new()).unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied { .. }));
        let err = txn.delete_object(&id).unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied { .. }));
        txn.abort();

        let txn = store.begin(&group("g1"));
        let object = txn.get_object(&id).unwrap();
        assert_eq!(object.owner, Some(group("g1")));
    }

    #[test]
    fn read_only_store_refuses_writes() {
        let store = Store::new(StoreConfig::new().read_only(true));

        let reads: Result<usize, StoreError> =
            store.transaction(Scope::System, |txn| Ok(txn.object_metadata().len()));
        assert_eq!(reads.unwrap(), 0);

        let err = store
            .transaction(Scope::System, |txn| {
                txn.put_object(ObjectId::from("todo/1"), Map::new())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly));
        assert_eq!(store.object_count(), 0);
    }

    #[test]
    fn clients_in_group_merges_pending() {
        let store = Store::in_memory();
        store
            .transaction(Scope::System, |txn| {
                txn.put_client(Client::new(ClientId::from("c1"), group("g1")));
                txn.put_client(Client::new(ClientId::from("c9"), group("g2")));
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let mut txn = store.begin(&group("g1"));
        let mut c1 = txn.client(&ClientId::from("c1")).unwrap();
        c1.last_mutation_id = 4;
        txn.put_client(c1);
        txn.put_client(Client::new(ClientId::from("c2"), group("g1")));

        let clients = txn.clients_in_group(&group("g1"));
        let ids: Vec<_> = clients.iter().map(|c| (c.id.as_str(), c.last_mutation_id)).collect();
        assert_eq!(ids, vec![("c1", 4), ("c2", 0)]);
    }

    #[test]
    fn snapshot_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let store = Store::open(&path, StoreConfig::default()).unwrap();
        store
            .transaction(&group("g1"), |txn| {
                txn.put_object(ObjectId::from("todo/1"), fields(json!({"complete": true})))?;
                txn.put_client_group(ClientGroup::new(group("g1")));
                Ok::<_, StoreError>(())
            })
            .unwrap();
        store.save(&path).unwrap();

        let reopened = Store::open(&path, StoreConfig::default()).unwrap();
        assert_eq!(reopened.snapshot(), store.snapshot());
        assert_eq!(reopened.object_count(), 1);
        assert_eq!(reopened.client_group_count(), 1);
    }

    #[test]
    fn concurrent_transactions_are_serialized() {
        let store = Arc::new(Store::in_memory());
        let client = ClientId::from("c1");
        store
            .transaction(Scope::System, |txn| {
                txn.put_client(Client::new(client.clone(), group("g1")));
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let client = client.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        store
                            .transaction(&group("g1"), |txn| {
                                let mut record = txn.client(&client).unwrap();
                                record.last_mutation_id += 1;
                                txn.put_client(record);
                                Ok::<_, StoreError>(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let txn = store.begin(Scope::System);
        assert_eq!(txn.client(&client).unwrap().last_mutation_id, 400);
    }
}
