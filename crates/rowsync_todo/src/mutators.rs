//! Todo mutators.

use crate::model::Todo;
use rowsync_protocol::ObjectId;
use rowsync_server::{MutationContext, MutatorRegistry, MutatorResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Name of the create mutation.
pub const CREATE_TODO: &str = "createTodo";
/// Name of the update mutation.
pub const UPDATE_TODO: &str = "updateTodo";
/// Name of the delete mutation.
pub const DELETE_TODO: &str = "deleteTodo";

/// Arguments of `createTodo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTodo {
    /// Client-generated id.
    pub replicache_id: ObjectId,
    /// Task text.
    pub content: String,
    /// Whether the task starts out done.
    pub complete: bool,
    /// Creation time.
    pub created_at: String,
}

/// Arguments of `updateTodo`. Absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTodo {
    /// Todo to update.
    pub replicache_id: ObjectId,
    /// New task text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New completion state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
}

/// Arguments of `deleteTodo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteTodo {
    /// Todo to delete.
    pub replicache_id: ObjectId,
}

/// Inserts a todo, replacing any row with the same id.
pub fn create_todo(ctx: &mut MutationContext<'_, '_>, args: CreateTodo) -> MutatorResult<()> {
    let fields = Todo::fields(args.content, args.complete, args.created_at);
    let version = ctx.txn.put_object(args.replicache_id.clone(), fields)?;
    debug!(id = %args.replicache_id, %version, "created todo");
    Ok(())
}

/// Updates the given fields of a todo. Unknown todos are ignored.
pub fn update_todo(ctx: &mut MutationContext<'_, '_>, args: UpdateTodo) -> MutatorResult<()> {
    let Some(existing) = ctx.txn.get_object(&args.replicache_id) else {
        debug!(id = %args.replicache_id, "update of unknown todo ignored");
        return Ok(());
    };

    let mut fields = existing.fields;
    if let Some(content) = args.content {
        fields.insert("content".into(), Value::String(content));
    }
    if let Some(complete) = args.complete {
        fields.insert("complete".into(), Value::Bool(complete));
    }
    ctx.txn.put_object(args.replicache_id, fields)?;
    Ok(())
}

/// Deletes a todo. Unknown todos are ignored.
pub fn delete_todo(ctx: &mut MutationContext<'_, '_>, args: DeleteTodo) -> MutatorResult<()> {
    if !ctx.txn.delete_object(&args.replicache_id)? {
        debug!(id = %args.replicache_id, "delete of unknown todo ignored");
    }
    Ok(())
}

/// Registry with every todo mutator.
pub fn todo_mutators() -> MutatorRegistry {
    MutatorRegistry::new()
        .register(CREATE_TODO, create_todo)
        .register(UPDATE_TODO, update_todo)
        .register(DELETE_TODO, delete_todo)
}
