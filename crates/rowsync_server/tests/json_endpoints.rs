//! Wire-level behavior of the JSON entry points.

use rowsync_server::{ServerConfig, REQUEST_ID_HEADER};
use rowsync_store::StoreConfig;
use rowsync_testkit::prelude::*;
use rowsync_todo::todo_mutators;
use serde_json::{json, Value};

fn pull_body(group: &str, cookie: Value) -> Vec<u8> {
    json!({
        "clientGroupID": group,
        "cookie": cookie,
        "profileID": "p1",
        "pullVersion": 1,
        "schemaVersion": "1",
    })
    .to_string()
    .into_bytes()
}

fn push_body(group: &str, mutations: Value) -> Vec<u8> {
    json!({
        "clientGroupID": group,
        "profileID": "p1",
        "pushVersion": 1,
        "schemaVersion": "1",
        "mutations": mutations,
    })
    .to_string()
    .into_bytes()
}

#[test]
fn push_then_pull_over_json() {
    let server = TestServer::todos();
    let push = server.push_json(
        &push_body(
            "g1",
            json!([{
                "clientID": "c1",
                "id": 1,
                "name": "createTodo",
                "args": {
                    "replicache_id": "todo/1",
                    "content": "milk",
                    "complete": false,
                    "created_at": "2024-05-01T10:00:00.000Z",
                },
                "timestamp": 1714557600000.0,
            }]),
        ),
        Some("c1-s1-1"),
    );
    assert_eq!(push.status, 200);
    assert_eq!(push.body, json!({"success": true}));

    let pull = server.pull_json(&pull_body("g1", Value::Null), Some("c1-s1-2"));
    assert_eq!(pull.status, 200);
    assert_eq!(pull.body["cookie"], json!({"order": 1}));
    assert_eq!(pull.body["lastMutationIDChanges"], json!({"c1": 1}));
    assert_eq!(
        pull.body["patch"],
        json!([{
            "op": "put",
            "key": "todo/1",
            "value": {
                "replicache_id": "todo/1",
                "replicache_version": 1,
                "content": "milk",
                "complete": false,
                "created_at": "2024-05-01T10:00:00.000Z",
            },
        }])
    );
}

#[test]
fn unchanged_pull_echoes_cookie() {
    let server = TestServer::todos();
    server.pull_json(&pull_body("g1", Value::Null), None);

    let again = server.pull_json(&pull_body("g1", json!({"order": 1})), None);
    assert_eq!(
        again.body,
        json!({"patch": [], "lastMutationIDChanges": {}, "cookie": {"order": 1}})
    );
}

#[test]
fn malformed_pull_is_version_not_supported() {
    let server = TestServer::todos();

    let wrong_version = json!({
        "clientGroupID": "g1",
        "cookie": null,
        "profileID": "p1",
        "pullVersion": 0,
        "schemaVersion": "1",
    });
    let reply = server.pull_json(wrong_version.to_string().as_bytes(), None);
    assert_eq!(reply.status, 400);
    assert_eq!(reply.body, json!({"error": "VersionNotSupported"}));

    let missing_group = json!({"cookie": null, "pullVersion": 1});
    let reply = server.pull_json(missing_group.to_string().as_bytes(), None);
    assert_eq!(reply.body, json!({"error": "VersionNotSupported"}));
    assert_eq!(server.store().client_group_count(), 0);
}

#[test]
fn pull_without_cookie_field_is_version_not_supported() {
    let server = TestServer::todos();
    let body = json!({
        "clientGroupID": "g1",
        "profileID": "p1",
        "pullVersion": 1,
        "schemaVersion": "1",
    });
    let reply = server.pull_json(body.to_string().as_bytes(), None);
    assert_eq!(reply.status, 400);
    assert_eq!(reply.body, json!({"error": "VersionNotSupported"}));
    assert_eq!(server.store().client_group_count(), 0);
}

#[test]
fn maximal_cookie_is_rejected_without_state_change() {
    let server = TestServer::todos().seed_todo("todo/1", "milk");
    server.pull_json(&pull_body("g1", Value::Null), None);
    let before = server.store().snapshot();

    let reply = server.pull_json(&pull_body("g1", json!({"order": u64::MAX})), None);
    assert_eq!(reply.status, 400);
    assert_eq!(reply.body, json!({"error": "VersionNotSupported"}));
    assert_eq!(server.store().snapshot(), before);
}

#[test]
fn malformed_push_is_invalid_request_without_state_change() {
    let server = TestServer::todos();
    let reply = server.push_json(
        &push_body("g1", json!([{"clientID": "c1", "name": "createTodo"}])),
        None,
    );
    assert_eq!(reply.status, 400);
    assert_eq!(reply.body, json!({"error": "InvalidRequest"}));
    assert_eq!(server.store().client_group_count(), 0);
    assert_eq!(server.store().client_count(), 0);
}

#[test]
fn schema_invalid_mutation_is_consumed_quietly() {
    let server = TestServer::todos();
    let reply = server.push_json(
        &push_body(
            "g1",
            json!([
                {"clientID": "c1", "id": 1, "name": "createTodo", "args": {"content": 5}, "timestamp": 0},
                {"clientID": "c1", "id": 1, "name": "launchRocket", "args": {}, "timestamp": 0},
            ]),
        ),
        None,
    );
    assert_eq!(reply.status, 200);
    assert_eq!(server.store().object_count(), 0);
    assert_eq!(server.last_mutation_id("c1"), Some(0));
    assert_eq!(server.stats().mutations_skipped, 2);
}

#[test]
fn processing_failure_is_generic_internal_error() {
    let server = TestServer::todos();
    let reply = server.push_json(
        &push_body(
            "g1",
            json!([{"clientID": "c1", "id": 3, "name": "deleteTodo", "args": {"replicache_id": "todo/1"}, "timestamp": 0}]),
        ),
        None,
    );
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body, json!({"error": "InternalError"}));
    assert_eq!(server.stats().failed_requests, 1);
}

#[test]
fn read_only_store_pull_is_internal_error() {
    let server = TestServer::build(
        ServerConfig::default(),
        StoreConfig::new().read_only(true),
        todo_mutators(),
    );
    let reply = server.pull_json(&pull_body("g1", Value::Null), None);
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body, json!({"error": "InternalError"}));
}

#[test]
fn request_id_header_name() {
    assert_eq!(REQUEST_ID_HEADER, "X-Replicache-RequestID");
}
