//! Pull and push command implementations.
//!
//! Each invocation loads the snapshot, answers one request body through the
//! JSON entry points and writes the snapshot back if the request succeeded.

use super::Context;
use crate::error::{CliError, CliResult};
use rowsync_server::{JsonReply, SyncServer};
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Answers a pull request read from `request`.
pub fn run_pull(ctx: &Context, request: &Path, request_id: Option<&str>) -> CliResult<Value> {
    let body = read_body(request)?;
    let server = ctx.open_server()?;
    let reply = server.pull_json(&body, request_id);
    finish(ctx, &server, reply)
}

/// Applies a push request read from `request`.
pub fn run_push(ctx: &Context, request: &Path, request_id: Option<&str>) -> CliResult<Value> {
    let body = read_body(request)?;
    let server = ctx.open_server()?;
    let reply = server.push_json(&body, request_id);
    finish(ctx, &server, reply)
}

fn read_body(request: &Path) -> CliResult<Vec<u8>> {
    if request == Path::new("-") {
        let mut body = Vec::new();
        std::io::stdin().read_to_end(&mut body)?;
        return Ok(body);
    }
    Ok(std::fs::read(request)?)
}

fn finish(ctx: &Context, server: &SyncServer, reply: JsonReply) -> CliResult<Value> {
    if !reply.is_success() {
        return Err(CliError::RequestFailed {
            status: reply.status,
            body: reply.body,
        });
    }
    server.store().save(ctx.path())?;
    debug!(path = %ctx.path().display(), "saved snapshot");
    Ok(reply.body)
}
