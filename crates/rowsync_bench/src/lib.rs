//! Benchmark utilities.

use rowsync_protocol::{ClientViewRecord, ObjectId, RawMutation, RowVersion};
use rowsync_testkit::prelude::*;

/// Generate a CVR of `count` rows, all at `version`.
pub fn generate_cvr(count: usize, version: u64) -> ClientViewRecord {
    (0..count)
        .map(|i| (ObjectId::from(format!("todo/{i:06}")), RowVersion::new(version)))
        .collect()
}

/// Derive a successor CVR: every `stride`-th row gets a newer version and every
/// `stride`-th row (offset by one) is dropped.
pub fn evolve_cvr(prev: &ClientViewRecord, stride: usize) -> ClientViewRecord {
    let stride = stride.max(2);
    prev.iter()
        .enumerate()
        .filter(|(i, _)| i % stride != 1)
        .map(|(i, (id, version))| {
            let version = if i % stride == 0 { version.next() } else { version };
            (id.clone(), version)
        })
        .collect()
}

/// A todo server holding `rows` committed todos.
pub fn seeded_server(rows: usize) -> TestServer {
    (0..rows).fold(TestServer::todos(), |server, i| {
        server.seed_todo(&format!("todo/{i:06}"), "benchmark")
    })
}

/// Generate a numbered batch of create mutations for `client`.
pub fn create_batch(client: &str, first_id: u64, count: usize) -> Vec<RawMutation> {
    (0..count as u64)
        .map(|n| {
            let id = first_id + n;
            create_todo(client, id, &format!("todo/{client}/{id}"), "benchmark")
        })
        .collect()
}
