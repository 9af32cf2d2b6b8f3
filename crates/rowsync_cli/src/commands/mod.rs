//! CLI command implementations.

pub mod init;
pub mod inspect;
pub mod sync;

use crate::error::{CliError, CliResult};
use rowsync_server::{ServerConfig, SyncServer};
use rowsync_store::{Store, StoreConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Settings shared by every command.
pub struct Context {
    /// Snapshot file.
    pub path: PathBuf,
    /// Store settings applied when the snapshot is loaded.
    pub store_config: StoreConfig,
    /// Server settings.
    pub server_config: ServerConfig,
}

impl Context {
    /// Creates a command context.
    pub fn new(path: PathBuf, store_config: StoreConfig, server_config: ServerConfig) -> Self {
        Self {
            path,
            store_config,
            server_config,
        }
    }

    /// Snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot into a store.
    pub fn open_store(&self) -> CliResult<Store> {
        if !self.path.exists() {
            return Err(CliError::MissingSnapshot(self.path.clone()));
        }
        Ok(Store::open(&self.path, self.store_config.clone())?)
    }

    /// Loads the snapshot and puts a todo server in front of it.
    pub fn open_server(&self) -> CliResult<SyncServer> {
        let store = self.open_store()?;
        Ok(SyncServer::new(
            self.server_config.clone(),
            Arc::new(store),
            rowsync_todo::todo_mutators(),
        ))
    }
}
