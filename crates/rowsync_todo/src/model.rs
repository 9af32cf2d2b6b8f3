//! The todo row.

use rowsync_protocol::{ObjectId, RowVersion};
use rowsync_store::StoredObject;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Prefix of every todo id.
pub const TODO_PREFIX: &str = "todo/";

/// Generates a fresh todo id.
pub fn generate_todo_id() -> ObjectId {
    ObjectId::new(format!("{TODO_PREFIX}{}", Uuid::new_v4()))
}

/// A todo as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Row id.
    pub replicache_id: ObjectId,
    /// Row version.
    pub replicache_version: RowVersion,
    /// Task text.
    pub content: String,
    /// Whether the task is done.
    pub complete: bool,
    /// Creation time as sent by the client.
    pub created_at: String,
}

impl Todo {
    /// Reads a todo out of a stored row. Returns `None` for other rows.
    pub fn from_object(object: &StoredObject) -> Option<Self> {
        if !object.id.as_str().starts_with(TODO_PREFIX) {
            return None;
        }
        serde_json::from_value(object.to_patch_value()).ok()
    }

    pub(crate) fn fields(content: String, complete: bool, created_at: String) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("content".into(), Value::String(content));
        fields.insert("complete".into(), Value::Bool(complete));
        fields.insert("created_at".into(), Value::String(created_at));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_todos() {
        let a = generate_todo_id();
        let b = generate_todo_id();
        assert!(a.as_str().starts_with(TODO_PREFIX));
        assert_ne!(a, b);
    }

    #[test]
    fn reads_todo_rows_only() {
        let todo = StoredObject {
            id: ObjectId::from("todo/1"),
            version: RowVersion::new(2),
            owner: None,
            fields: Todo::fields("milk".into(), false, "2024-05-01T10:00:00Z".into()),
        };
        let parsed = Todo::from_object(&todo).unwrap();
        assert_eq!(parsed.content, "milk");
        assert_eq!(parsed.replicache_version, RowVersion::new(2));

        let other = StoredObject {
            id: ObjectId::from("note/1"),
            ..todo
        };
        assert!(Todo::from_object(&other).is_none());
    }
}
