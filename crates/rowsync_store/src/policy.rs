//! Row visibility.
//!
//! Every read made inside a transaction is filtered through the store's
//! [`VisibilityPolicy`]. Rows the scope cannot see simply do not exist for
//! it, which is how access changes surface as deletes on the next pull.

use crate::types::{Scope, StoredObject};
use std::fmt;

/// Decides which rows a transaction scope may see.
pub trait VisibilityPolicy: Send + Sync + fmt::Debug {
    /// Returns true if `object` is visible to `scope`.
    fn is_visible(&self, scope: &Scope, object: &StoredObject) -> bool;
}

/// Every row is visible to every scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllVisible;

impl VisibilityPolicy for AllVisible {
    fn is_visible(&self, _scope: &Scope, _object: &StoredObject) -> bool {
        true
    }
}

/// Rows are visible only to the client group that created them.
///
/// System rows (no owner) are visible to everyone, and the system scope sees
/// everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnedByGroup;

impl VisibilityPolicy for OwnedByGroup {
    fn is_visible(&self, scope: &Scope, object: &StoredObject) -> bool {
        match (scope, &object.owner) {
            (Scope::System, _) | (_, None) => true,
            (Scope::Group(group), Some(owner)) => group == owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowsync_protocol::{ClientGroupId, ObjectId, RowVersion};
    use serde_json::Map;

    fn object(owner: Option<&str>) -> StoredObject {
        StoredObject {
            id: ObjectId::from("todo/1"),
            version: RowVersion::INITIAL,
            owner: owner.map(ClientGroupId::from),
            fields: Map::new(),
        }
    }

    #[test]
    fn owned_by_group_rules() {
        let g1 = Scope::from(ClientGroupId::from("g1"));
        let g2 = Scope::from(ClientGroupId::from("g2"));
        let policy = OwnedByGroup;

        assert!(policy.is_visible(&g1, &object(Some("g1"))));
        assert!(!policy.is_visible(&g2, &object(Some("g1"))));
        assert!(policy.is_visible(&g2, &object(None)));
        assert!(policy.is_visible(&Scope::System, &object(Some("g1"))));
        assert!(AllVisible.is_visible(&g2, &object(Some("g1"))));
    }
}
