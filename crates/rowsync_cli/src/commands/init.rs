//! Init command implementation.

use super::Context;
use crate::error::{CliError, CliResult};
use rowsync_store::StoreSnapshot;
use tracing::info;

/// Writes an empty snapshot to the context path.
pub fn run(ctx: &Context, force: bool) -> CliResult<()> {
    if ctx.path().exists() && !force {
        return Err(CliError::SnapshotExists(ctx.path.clone()));
    }
    StoreSnapshot::default().save(ctx.path())?;
    info!(path = %ctx.path().display(), "initialized empty store");
    Ok(())
}
