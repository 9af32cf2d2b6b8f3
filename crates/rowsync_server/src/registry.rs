//! Lazy creation of client groups and clients.
//!
//! Groups and clients exist as soon as a request names them. Both helpers
//! are insert-if-absent and only write when the record is new.

use crate::error::{ServerError, ServerResult};
use rowsync_protocol::{ClientGroupId, ClientId};
use rowsync_store::{Client, ClientGroup, Transaction};
use std::collections::BTreeMap;
use tracing::debug;

/// Returns the client group, creating it if this is the first request for it.
pub(crate) fn materialize_group(txn: &mut Transaction<'_>, id: &ClientGroupId) -> ClientGroup {
    if let Some(group) = txn.client_group(id) {
        return group;
    }
    debug!(client_group_id = %id, "creating client group");
    let group = ClientGroup::new(id.clone());
    txn.put_client_group(group.clone());
    group
}

/// Returns the client, creating it under `group` if unknown.
///
/// A client already registered under another group is refused.
pub(crate) fn materialize_client(
    txn: &mut Transaction<'_>,
    group: &ClientGroup,
    id: &ClientId,
) -> ServerResult<Client> {
    match txn.client(id) {
        Some(client) if client.group_id != group.id => Err(ServerError::ClientGroupMismatch {
            client_id: id.clone(),
            registered: client.group_id,
            requested: group.id.clone(),
        }),
        Some(client) => Ok(client),
        None => {
            debug!(client_id = %id, client_group_id = %group.id, "creating client");
            let client = Client::new(id.clone(), group.id.clone());
            txn.put_client(client.clone());
            Ok(client)
        }
    }
}

/// `last_mutation_id` of every client in the group.
pub(crate) fn last_mutation_ids(
    txn: &Transaction<'_>,
    group_id: &ClientGroupId,
) -> BTreeMap<ClientId, u64> {
    txn.clients_in_group(group_id)
        .into_iter()
        .map(|client| (client.id, client.last_mutation_id))
        .collect()
}
