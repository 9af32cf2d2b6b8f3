//! Property-based test generators using proptest.
//!
//! Provides strategies for generating ids, CVRs and mutation batches that
//! keep the invariants the server relies on.

use proptest::prelude::*;
use rowsync_protocol::{ClientViewRecord, ObjectId, RawMutation, RowVersion};
use std::collections::BTreeMap;

use crate::fixtures::{complete_todo, create_todo, delete_todo};

/// Strategy for generating todo ids from a small pool, so batches collide.
pub fn todo_id_strategy() -> impl Strategy<Value = String> {
    (0u8..8).prop_map(|n| format!("todo/{n}"))
}

/// Strategy for generating object ids.
pub fn object_id_strategy() -> impl Strategy<Value = ObjectId> {
    prop::string::string_regex("[a-z]{1,6}/[0-9a-f]{1,8}")
        .expect("Invalid regex")
        .prop_map(ObjectId::new)
}

/// Strategy for generating row versions.
pub fn row_version_strategy() -> impl Strategy<Value = RowVersion> {
    (1u64..1_000).prop_map(RowVersion::new)
}

/// Strategy for generating client view records.
pub fn cvr_strategy() -> impl Strategy<Value = ClientViewRecord> {
    prop::collection::btree_map(object_id_strategy(), row_version_strategy(), 0..32)
        .prop_map(|entries: BTreeMap<ObjectId, RowVersion>| entries.into_iter().collect())
}

/// Strategy for a pair of CVRs where the second evolves from the first:
/// rows are kept, bumped, dropped or added.
pub fn cvr_evolution_strategy() -> impl Strategy<Value = (ClientViewRecord, ClientViewRecord)> {
    (cvr_strategy(), cvr_strategy(), any::<u64>()).prop_map(|(prev, added, seed)| {
        let next = prev
            .iter()
            .enumerate()
            .filter_map(|(i, (id, version))| match (seed >> (i % 32)) & 3 {
                0 => None,
                1 => Some((id.clone(), version.next())),
                _ => Some((id.clone(), version)),
            })
            .chain(
                added
                    .iter()
                    .filter(|(id, _)| !prev.contains(id))
                    .map(|(id, version)| (id.clone(), version)),
            )
            .collect();
        (prev, next)
    })
}

/// One todo operation in a generated batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoOp {
    /// Create a todo.
    Create(String),
    /// Toggle a todo.
    Complete(String, bool),
    /// Delete a todo.
    Delete(String),
}

/// Strategy for generating todo operations.
pub fn todo_op_strategy() -> impl Strategy<Value = TodoOp> {
    prop_oneof![
        todo_id_strategy().prop_map(TodoOp::Create),
        (todo_id_strategy(), any::<bool>()).prop_map(|(id, done)| TodoOp::Complete(id, done)),
        todo_id_strategy().prop_map(TodoOp::Delete),
    ]
}

/// Numbers a sequence of operations as consecutive mutations of `client`,
/// starting at `first_id`.
pub fn number_ops(client: &str, first_id: u64, ops: &[TodoOp]) -> Vec<RawMutation> {
    ops.iter()
        .zip(first_id..)
        .map(|(op, id)| match op {
            TodoOp::Create(todo) => create_todo(client, id, todo, "generated"),
            TodoOp::Complete(todo, done) => complete_todo(client, id, todo, *done),
            TodoOp::Delete(todo) => delete_todo(client, id, todo),
        })
        .collect()
}
