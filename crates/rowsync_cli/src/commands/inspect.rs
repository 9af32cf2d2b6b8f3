//! Inspect command implementation.

use super::Context;
use crate::error::{CliError, CliResult};
use rowsync_protocol::ClientViewRecord;
use serde::Serialize;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Snapshot path.
    pub path: String,
    /// Number of live rows.
    pub object_count: usize,
    /// Number of deleted rows whose last version is remembered.
    pub retired_count: usize,
    /// Client groups.
    pub client_groups: Vec<GroupStats>,
    /// Clients.
    pub clients: Vec<ClientStats>,
}

/// One client group.
#[derive(Debug, Serialize)]
pub struct GroupStats {
    /// Group id.
    pub id: String,
    /// Version of the last CVR handed out.
    pub cvr_version: u64,
    /// Rows in the stored CVR; `None` if the group has none or it is unreadable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvr_rows: Option<usize>,
}

/// One client.
#[derive(Debug, Serialize)]
pub struct ClientStats {
    /// Client id.
    pub id: String,
    /// Owning group.
    pub group: String,
    /// Last applied mutation id.
    pub last_mutation_id: u64,
}

/// Collects statistics from the snapshot.
pub fn run(ctx: &Context) -> CliResult<InspectResult> {
    let snapshot = ctx.open_store()?.snapshot();

    let client_groups = snapshot
        .client_groups
        .iter()
        .map(|group| GroupStats {
            id: group.id.to_string(),
            cvr_version: group.cvr_version,
            cvr_rows: group
                .cvr
                .as_deref()
                .and_then(|blob| ClientViewRecord::decode(blob).ok())
                .map(|cvr| cvr.len()),
        })
        .collect();
    let clients = snapshot
        .clients
        .iter()
        .map(|client| ClientStats {
            id: client.id.to_string(),
            group: client.group_id.to_string(),
            last_mutation_id: client.last_mutation_id,
        })
        .collect();

    Ok(InspectResult {
        path: ctx.path().display().to_string(),
        object_count: snapshot.objects.len(),
        retired_count: snapshot.retired.len(),
        client_groups,
        clients,
    })
}

/// Prints an inspection result as `text` or `json`.
pub fn print(result: &InspectResult, format: &str) -> CliResult<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(result)?),
        "text" => print_text(result),
        other => return Err(CliError::UnknownFormat(other.to_string())),
    }
    Ok(())
}

fn print_text(result: &InspectResult) {
    println!("rowsync Store Inspection");
    println!("========================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Rows:");
    println!("  Live:    {}", result.object_count);
    println!("  Retired: {}", result.retired_count);
    println!();
    println!("Client groups: {}", result.client_groups.len());
    for group in &result.client_groups {
        match group.cvr_rows {
            Some(rows) => println!(
                "  {:<24} cvr v{} ({} rows)",
                group.id, group.cvr_version, rows
            ),
            None => println!("  {:<24} cvr v{} (no cvr)", group.id, group.cvr_version),
        }
    }
    println!();
    println!("Clients: {}", result.clients.len());
    for client in &result.clients {
        println!(
            "  {:<24} group {:<24} lmid {}",
            client.id, client.group, client.last_mutation_id
        );
    }
}
