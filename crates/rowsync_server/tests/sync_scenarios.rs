//! End-to-end pull/push scenarios against a todo server.

use rowsync_protocol::{ClientGroupId, PatchOperation, RawMutation};
use rowsync_server::{MutatorError, ServerConfig, ServerError, SyncServer};
use rowsync_store::{OwnedByGroup, Scope, Store, StoreConfig, StoreError};
use rowsync_testkit::prelude::*;
use rowsync_todo::todo_mutators;
use serde_json::{json, Map};
use std::sync::Arc;

#[test]
fn unknown_group_first_pull_push_then_pull() {
    let server = TestServer::todos()
        .seed_todo("todo/seed-1", "bread")
        .seed_todo("todo/seed-2", "eggs");

    let first = server.pull("G1", None);
    assert_eq!(cookie_order(&first), 1);
    assert_eq!(put_keys(&first), vec!["todo/seed-1", "todo/seed-2"]);
    assert!(del_keys(&first).is_empty());
    assert!(first.last_mutation_id_changes.is_empty());

    server.push("G1", vec![create_todo("c1", 1, "todo/new", "milk")]);
    let row = server.row("todo/new").expect("row created");
    assert_eq!(row.version.as_u64(), 1);
    assert_eq!(server.last_mutation_id("c1"), Some(1));

    let second = server.pull("G1", Some(1));
    assert_eq!(cookie_order(&second), 2);
    assert_eq!(put_keys(&second), vec!["todo/new"]);
    assert!(del_keys(&second).is_empty());
    assert_eq!(second.last_mutation_id_changes.get("c1"), Some(&1));
}

#[test]
fn mutation_ids_behind_at_and_ahead_of_expected() {
    let server = TestServer::todos();
    server.push(
        "g1",
        (1..=5)
            .map(|id| create_todo("c1", id, &format!("todo/{id}"), "x"))
            .collect(),
    );
    assert_eq!(server.last_mutation_id("c1"), Some(5));

    server.push(
        "g1",
        vec![
            create_todo("c1", 5, "todo/dup", "skipped"),
            create_todo("c1", 6, "todo/six", "applied"),
        ],
    );
    assert!(server.row("todo/dup").is_none());
    assert!(server.row("todo/six").is_some());
    assert_eq!(server.last_mutation_id("c1"), Some(6));

    let err = server
        .try_push(
            "g1",
            vec![
                create_todo("c1", 7, "todo/seven", "rolled back"),
                create_todo("c1", 9, "todo/nine", "gap"),
            ],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServerError::MutationGap {
            expected: 8,
            actual: 9,
            ..
        }
    ));
    assert!(server.row("todo/seven").is_none());
    assert_eq!(server.last_mutation_id("c1"), Some(6));
}

#[test]
fn back_to_back_pulls_are_stable() {
    let server = TestServer::todos().seed_todo("todo/1", "a");

    let first = server.pull("g1", None);
    let order = cookie_order(&first);

    let second = server.pull("g1", Some(order));
    assert_eq!(cookie_order(&second), order);
    assert!(second.patch.is_empty());
    assert!(second.last_mutation_id_changes.is_empty());

    let third = server.pull("g1", Some(order));
    assert_eq!(third, second);
}

#[test]
fn replayed_push_is_a_noop() {
    let server = TestServer::todos();
    let batch = vec![create_todo("c1", 1, "todo/a", "milk")];

    server.push("g1", batch.clone());
    let before = server.store().snapshot();

    server.push("g1", batch);
    assert_eq!(server.store().snapshot(), before);
    assert_eq!(server.store().object_count(), 1);
    assert_eq!(server.last_mutation_id("c1"), Some(1));
}

#[test]
fn deletes_and_updates_reach_other_clients() {
    let server = TestServer::todos();
    server.push(
        "g1",
        vec![
            create_todo("c1", 1, "todo/a", "a"),
            create_todo("c1", 2, "todo/b", "b"),
        ],
    );
    let base = cookie_order(&server.pull("g2", None));

    server.push(
        "g1",
        vec![
            delete_todo("c1", 3, "todo/a"),
            complete_todo("c1", 4, "todo/b", true),
        ],
    );

    let patch = server.pull("g2", Some(base));
    assert_eq!(del_keys(&patch), vec!["todo/a"]);
    assert_eq!(put_keys(&patch), vec!["todo/b"]);
    assert!(patch.patch[0].is_del());
    let PatchOperation::Put { value, .. } = &patch.patch[1] else {
        panic!("expected put after del");
    };
    assert_eq!(value["complete"], json!(true));
    assert_eq!(value["replicache_version"], json!(2));
}

#[test]
fn recreated_row_is_sent_again() {
    let server = TestServer::todos().seed_todo("todo/a", "first");
    let base = cookie_order(&server.pull("g1", None));

    server.remove("todo/a");
    let gone = server.pull("g1", Some(base));
    assert_eq!(del_keys(&gone), vec!["todo/a"]);

    let server = server.seed_todo("todo/a", "second");
    let back = server.pull("g1", Some(cookie_order(&gone)));
    assert_eq!(put_keys(&back), vec!["todo/a"]);
    assert!(server.row("todo/a").expect("recreated").version.as_u64() > 1);
}

#[test]
fn owned_rows_stay_private() {
    let mut fields = Map::new();
    fields.insert("content".into(), json!("secret"));
    let server = TestServer::with_policy(OwnedByGroup)
        .seed_todo("todo/public", "shared")
        .seed_owned("g1", "todo/private", fields);

    let g1 = server.pull("g1", None);
    assert_eq!(put_keys(&g1), vec!["todo/private", "todo/public"]);

    let g2 = server.pull("g2", None);
    assert_eq!(put_keys(&g2), vec!["todo/public"]);

    let err = server
        .try_push("g2", vec![delete_todo("c2", 1, "todo/private")])
        .unwrap_err();
    assert!(matches!(
        err,
        ServerError::Mutator {
            source: MutatorError::Store(StoreError::AccessDenied { .. }),
            ..
        }
    ));
    assert!(server.row("todo/private").is_some());
}

#[test]
fn pushed_rows_belong_to_the_pushing_group() {
    let server = TestServer::with_policy(OwnedByGroup);
    server.push("g1", vec![create_todo("c1", 1, "todo/mine", "x")]);

    assert!(put_keys(&server.pull("g2", None)).is_empty());
    assert_eq!(put_keys(&server.pull("g1", None)), vec!["todo/mine"]);
    assert_eq!(
        server.row("todo/mine").and_then(|row| row.owner),
        Some(ClientGroupId::from("g1"))
    );
}

#[test]
fn client_cannot_switch_groups() {
    let server = TestServer::todos();
    server.push("g1", vec![create_todo("c1", 1, "todo/a", "a")]);

    let err = server
        .try_push("g2", vec![create_todo("c1", 2, "todo/b", "b")])
        .unwrap_err();
    assert!(matches!(err, ServerError::ClientGroupMismatch { .. }));
    assert!(server.row("todo/b").is_none());
}

#[test]
fn lmid_changes_cover_all_group_clients() {
    let server = TestServer::todos();
    server.push(
        "g1",
        vec![
            create_todo("c1", 1, "todo/a", "a"),
            create_todo("c2", 1, "todo/b", "b"),
            create_todo("c2", 2, "todo/c", "c"),
        ],
    );
    server.push("g2", vec![create_todo("c3", 1, "todo/d", "d")]);

    let pull = server.pull("g1", None);
    assert_eq!(pull.last_mutation_id_changes.len(), 2);
    assert_eq!(pull.last_mutation_id_changes["c1"], 1);
    assert_eq!(pull.last_mutation_id_changes["c2"], 2);
}

#[test]
fn read_only_store_fails_without_partial_effects() {
    let server = TestServer::build(
        ServerConfig::default(),
        StoreConfig::new().read_only(true),
        todo_mutators(),
    );

    let push = server
        .try_push("g1", vec![create_todo("c1", 1, "todo/a", "a")])
        .unwrap_err();
    assert!(push.is_server_error());

    let pull = server.try_pull("g1", None).unwrap_err();
    assert!(matches!(pull, ServerError::Store(StoreError::ReadOnly)));
    assert_eq!(server.store().client_group_count(), 0);
}

#[test]
fn missing_handler_aborts_push() {
    let mutators = todo_mutators().declare::<serde_json::Value>("archiveTodo");
    let server = TestServer::build(ServerConfig::default(), StoreConfig::default(), mutators);

    let err = server
        .try_push(
            "g1",
            vec![
                create_todo("c1", 1, "todo/a", "a"),
                RawMutation::new("c1", 2, "archiveTodo", json!({})),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, ServerError::MissingMutator { ref name } if name == "archiveTodo"));
    assert_eq!(server.store().object_count(), 0);
    assert_eq!(server.last_mutation_id("c1"), None);
}

#[test]
fn snapshot_preserves_sync_state() {
    let server = TestServer::todos().with_temp_dir();
    let path = server.snapshot_path().expect("temp dir attached");
    server.push("g1", vec![create_todo("c1", 1, "todo/a", "a")]);
    let order = cookie_order(&server.pull("g1", None));
    server.store().save(&path).expect("save");

    let store = Store::open(&path, StoreConfig::default()).expect("open");
    let restored = SyncServer::new(ServerConfig::default(), Arc::new(store), todo_mutators());

    let group = restored
        .store()
        .begin(Scope::System)
        .client_group(&ClientGroupId::from("g1"))
        .expect("group restored");
    assert_eq!(group.cvr_version, order);

    let pull = restored.handle_pull(pull_request("g1", Some(order))).expect("pull");
    assert!(pull.patch.is_empty());
    assert_eq!(pull.cookie.map(|c| c.order), Some(order));
}
