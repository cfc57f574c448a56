//! Task reconciliation and the application-facing task manager.
//!
//! [`reconcile`] merges remote representations into the local store.
//! [`TaskManager`] drives user mutations: it changes the local store first,
//! commits, then pushes to the remote, and applies the compensation rules
//! when one side fails.

pub mod manager;
pub mod reconcile;

pub use manager::{TaskEdit, TaskManager, TaskSection, group_sections};
pub use reconcile::{ReconcileReport, reconcile};

use tasksync_proto::task::{InvalidTask, TaskId};
use thiserror::Error;

use crate::gateway::SyncError;
use crate::store::StoreError;

/// Errors that can occur during task operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task or draft is not valid.
    #[error(transparent)]
    Invalid(#[from] InvalidTask),

    /// No local task has the given identifier.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The change was committed locally but the remote push failed.
    ///
    /// The local task stays as committed; the caller may retry with
    /// [`TaskManager::push`].
    #[error("task {id} saved locally but not synced: {source}")]
    Unsynced {
        /// The task that is ahead of the remote.
        id: TaskId,
        /// Why the push failed.
        #[source]
        source: SyncError,
    },

    /// A remote operation failed before any local change was made.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The local store failed; uncommitted changes were discarded.
    #[error(transparent)]
    Store(#[from] StoreError),
}
