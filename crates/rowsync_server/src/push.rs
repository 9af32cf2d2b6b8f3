//! Push processing.
//!
//! All mutations of one push run inside a single store transaction. A
//! fatal condition (a gap in mutation ids, a missing handler, a failing
//! handler) rolls back every mutation of the request, so the client can
//! resend the whole batch later.

use crate::error::{ServerError, ServerResult};
use crate::mutators::{MutationContext, MutatorRegistry};
use crate::registry::{materialize_client, materialize_group};
use rowsync_protocol::{ClientId, PushRequest, RawMutation};
use rowsync_store::{Client, ClientGroup, Store, Transaction};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

/// What happened to each mutation of a push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushSummary {
    /// Mutations whose handler ran.
    pub applied: usize,
    /// Mutations already processed earlier.
    pub duplicates: usize,
    /// Mutations rejected by their schema.
    pub invalid: usize,
}

impl PushSummary {
    /// Total number of mutations looked at.
    pub fn total(&self) -> usize {
        self.applied + self.duplicates + self.invalid
    }
}

enum Step {
    Applied,
    Duplicate,
    Invalid,
}

/// Runs pushes against a store.
#[derive(Debug, Clone, Copy)]
pub struct PushProcessor<'s> {
    store: &'s Store,
    mutators: &'s MutatorRegistry,
    consume_invalid: bool,
}

impl<'s> PushProcessor<'s> {
    /// Creates a processor over `store` using `mutators`.
    pub fn new(store: &'s Store, mutators: &'s MutatorRegistry) -> Self {
        Self {
            store,
            mutators,
            consume_invalid: false,
        }
    }

    /// Sets whether a schema-invalid mutation that is next in line advances
    /// its client's `last_mutation_id`.
    pub fn consume_invalid(mut self, value: bool) -> Self {
        self.consume_invalid = value;
        self
    }

    /// Processes one push request.
    pub fn process(&self, request: &PushRequest) -> ServerResult<PushSummary> {
        self.store
            .transaction(&request.client_group_id, |txn| self.push_in(txn, request))
    }

    fn push_in(&self, txn: &mut Transaction<'_>, request: &PushRequest) -> ServerResult<PushSummary> {
        let group = materialize_group(txn, &request.client_group_id);
        let mut clients: BTreeMap<ClientId, Client> = BTreeMap::new();
        let mut summary = PushSummary::default();

        for raw in &request.mutations {
            let client = match clients.entry(raw.client_id.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    entry.insert(materialize_client(txn, &group, &raw.client_id)?)
                }
            };

            match self.step(txn, &group, client, raw)? {
                Step::Applied => summary.applied += 1,
                Step::Duplicate => summary.duplicates += 1,
                Step::Invalid => summary.invalid += 1,
            }
        }

        for client in clients.into_values() {
            if txn.client(&client.id).as_ref() != Some(&client) {
                txn.put_client(client);
            }
        }
        Ok(summary)
    }

    fn step(
        &self,
        txn: &mut Transaction<'_>,
        group: &ClientGroup,
        client: &mut Client,
        raw: &RawMutation,
    ) -> ServerResult<Step> {
        let expected = client.last_mutation_id + 1;

        let mutation = match self.mutators.parse(raw) {
            Ok(mutation) => mutation,
            Err(violation) => {
                debug!(client_id = %client.id, id = raw.id, %violation, "skipping invalid mutation");
                if self.consume_invalid && raw.id == expected {
                    client.last_mutation_id = expected;
                }
                return Ok(Step::Invalid);
            }
        };

        if mutation.id < expected {
            debug!(client_id = %client.id, id = mutation.id, expected, "skipping processed mutation");
            return Ok(Step::Duplicate);
        }
        if mutation.id > expected {
            warn!(client_id = %client.id, id = mutation.id, expected, "mutation is from the future");
            return Err(ServerError::MutationGap {
                client_id: client.id.clone(),
                expected,
                actual: mutation.id,
            });
        }

        let Some(handler) = self.mutators.handler(&mutation.name) else {
            error!(name = %mutation.name, "no mutator registered");
            return Err(ServerError::MissingMutator {
                name: mutation.name,
            });
        };

        let mut ctx = MutationContext {
            txn,
            group,
            client: &*client,
            mutation: &mutation,
        };
        handler
            .apply(&mut ctx)
            .map_err(|source| ServerError::Mutator {
                name: mutation.name.clone(),
                source,
            })?;

        debug!(client_id = %client.id, id = mutation.id, name = %mutation.name, "applied mutation");
        client.last_mutation_id = expected;
        Ok(Step::Applied)
    }
}
