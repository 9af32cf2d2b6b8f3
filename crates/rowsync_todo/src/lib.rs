//! # rowsync Todo
//!
//! The todo-list mutators served by the rowsync reference server.
//!
//! Todos are rows whose id starts with [`TODO_PREFIX`]. Clients generate the
//! id when they create a todo, so the same id reaches the server in the
//! `createTodo` mutation and later in `updateTodo`/`deleteTodo`.
//!
//! ```
//! use rowsync_server::{ServerConfig, SyncServer};
//! use rowsync_store::Store;
//! use std::sync::Arc;
//!
//! let server = SyncServer::new(
//!     ServerConfig::default(),
//!     Arc::new(Store::in_memory()),
//!     rowsync_todo::todo_mutators(),
//! );
//! assert!(server.mutators().missing_handlers().is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod model;
mod mutators;

pub use model::{generate_todo_id, Todo, TODO_PREFIX};
pub use mutators::{
    create_todo, delete_todo, todo_mutators, update_todo, CreateTodo, DeleteTodo, UpdateTodo,
    CREATE_TODO, DELETE_TODO, UPDATE_TODO,
};
