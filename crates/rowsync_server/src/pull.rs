//! Pull processing.
//!
//! A pull compares the rows the client group can currently see against the
//! CVR handed out on the group's previous pull and answers with the
//! difference. Everything happens in one store transaction so the CVR that
//! gets persisted matches exactly the rows that were read.

use crate::error::{ServerError, ServerResult};
use crate::registry::{last_mutation_ids, materialize_group};
use rowsync_protocol::{
    ClientId, ClientViewRecord, Cookie, PatchOperation, PullRequest, PullResponse,
};
use rowsync_store::{Store, Transaction};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What a pull produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    /// Nothing changed since the group's last pull; the client keeps its cookie.
    Unchanged,
    /// A new CVR was stored under `cvr_version`.
    Changed {
        /// New CVR version, sent back as the cookie order.
        cvr_version: u64,
        /// Dels first, then puts.
        patch: Vec<PatchOperation>,
        /// `last_mutation_id` of every client in the group.
        last_mutation_ids: BTreeMap<ClientId, u64>,
    },
}

impl PullOutcome {
    /// Builds the response for a request that carried `cookie`.
    pub fn into_response(self, cookie: Option<Cookie>) -> PullResponse {
        match self {
            PullOutcome::Unchanged => PullResponse::unchanged(cookie),
            PullOutcome::Changed {
                cvr_version,
                patch,
                last_mutation_ids,
            } => PullResponse {
                patch,
                last_mutation_id_changes: last_mutation_ids,
                cookie: Some(Cookie::new(cvr_version)),
            },
        }
    }
}

/// Runs pulls against a store.
#[derive(Debug, Clone, Copy)]
pub struct PullProcessor<'s> {
    store: &'s Store,
}

impl<'s> PullProcessor<'s> {
    /// Creates a processor over `store`.
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Processes one pull request.
    pub fn process(&self, request: &PullRequest) -> ServerResult<PullOutcome> {
        let group_id = &request.client_group_id;
        let base_order = request.cookie.map_or(0, |cookie| cookie.order);

        self.store.transaction(group_id, |txn| pull_in(txn, request, base_order))
    }
}

fn pull_in(
    txn: &mut Transaction<'_>,
    request: &PullRequest,
    base_order: u64,
) -> ServerResult<PullOutcome> {
    let mut group = materialize_group(txn, &request.client_group_id);
    let next_version = base_order
        .max(group.cvr_version)
        .checked_add(1)
        .ok_or_else(|| {
            ServerError::VersionNotSupported(format!("cookie order {base_order} cannot advance"))
        })?;

    let prev_cvr = group.cvr.as_deref().and_then(|blob| {
        ClientViewRecord::decode(blob)
            .map_err(|e| warn!(client_group_id = %group.id, error = %e, "discarding unreadable CVR"))
            .ok()
    });
    let next_cvr = ClientViewRecord::build(txn.object_metadata());
    let diff = ClientViewRecord::diff(prev_cvr.as_ref(), &next_cvr);

    if prev_cvr.is_some() && diff.is_empty() {
        debug!(client_group_id = %group.id, "nothing to pull");
        return Ok(PullOutcome::Unchanged);
    }

    let mut patch = Vec::with_capacity(diff.dels.len() + diff.puts.len());
    patch.extend(
        diff.dels
            .into_iter()
            .map(|key| PatchOperation::Del { key }),
    );
    if !diff.puts.is_empty() {
        patch.extend(txn.objects(&diff.puts).into_iter().map(|object| PatchOperation::Put {
            value: object.to_patch_value(),
            key: object.id,
        }));
    }

    group.cvr_version = next_version;
    group.cvr = Some(next_cvr.encode()?);
    let last_mutation_ids = last_mutation_ids(txn, &group.id);

    debug!(
        client_group_id = %group.id,
        cvr_version = next_version,
        ops = patch.len(),
        "pull produced patch"
    );
    txn.put_client_group(group);

    Ok(PullOutcome::Changed {
        cvr_version: next_version,
        patch,
        last_mutation_ids,
    })
}
