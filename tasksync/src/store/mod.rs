//! Local task persistence.
//!
//! Defines the [`TaskStore`] trait, a transactional session over the local
//! task set. Mutations are staged until [`TaskStore::commit`] and discarded
//! by [`TaskStore::reset`]. Reads always see staged changes, so a unit of
//! work observes its own writes before committing them.
//!
//! Implementations:
//! - [`memory::MemoryStore`]: in-memory store, the default for tests
//! - [`file::FileStore`]: JSON file with atomic commits
//! - [`faulty::FaultyStore`]: wrapper that injects commit failures for testing

pub mod faulty;
pub mod file;
pub mod memory;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use tasksync_proto::task::{Task, TaskId};

pub use faulty::{FaultHandle, FaultyStore};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors that can occur during local store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store I/O error on {path}: {source}")]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The task set could not be serialized or the file could not be parsed.
    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The store refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A transactional session over the local task set.
///
/// One store value is one context: callers that share it across units of
/// work must serialize access themselves.
pub trait TaskStore: Send {
    /// Returns every task whose identifier is in `ids`, in one query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be read.
    fn fetch(&self, ids: &HashSet<TaskId>) -> Result<Vec<Task>, StoreError>;

    /// Returns every task in the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be read.
    fn fetch_all(&self) -> Result<Vec<Task>, StoreError>;

    /// Stages a task for insertion, replacing any task with the same identifier.
    fn insert(&mut self, task: Task);

    /// Stages the removal of a task. Unknown identifiers are ignored.
    fn delete(&mut self, id: &TaskId);

    /// Persists all staged changes as one unit.
    ///
    /// On failure nothing is persisted and the staged changes remain, so the
    /// caller can decide between retrying and [`reset`](Self::reset).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the changes could not be persisted.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Discards all staged changes.
    fn reset(&mut self);

    /// Returns `true` if there are staged changes.
    fn has_changes(&self) -> bool;

    /// Returns a single task by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be read.
    fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let ids = HashSet::from([*id]);
        Ok(self.fetch(&ids)?.into_iter().next())
    }
}

/// Committed tasks plus the staged changes on top of them.
///
/// Shared by the concrete stores. A staged `None` is a pending delete.
#[derive(Debug, Default, Clone)]
pub(crate) struct Staged {
    committed: HashMap<TaskId, Task>,
    pending: HashMap<TaskId, Option<Task>>,
}

impl Staged {
    pub(crate) fn from_committed(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            committed: tasks.into_iter().map(|t| (*t.id(), t)).collect(),
            pending: HashMap::new(),
        }
    }

    fn visible(&self, id: &TaskId) -> Option<&Task> {
        match self.pending.get(id) {
            Some(staged) => staged.as_ref(),
            None => self.committed.get(id),
        }
    }

    pub(crate) fn fetch(&self, ids: &HashSet<TaskId>) -> Vec<Task> {
        ids.iter()
            .filter_map(|id| self.visible(id))
            .cloned()
            .collect()
    }

    pub(crate) fn fetch_all(&self) -> Vec<Task> {
        let committed = self
            .committed
            .keys()
            .filter(|id| !self.pending.contains_key(id))
            .filter_map(|id| self.committed.get(id));
        let staged = self.pending.values().flatten();
        committed.chain(staged).cloned().collect()
    }

    pub(crate) fn insert(&mut self, task: Task) {
        self.pending.insert(*task.id(), Some(task));
    }

    pub(crate) fn delete(&mut self, id: &TaskId) {
        self.pending.insert(*id, None);
    }

    pub(crate) fn reset(&mut self) {
        self.pending.clear();
    }

    pub(crate) fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The committed set as it will look once the pending changes apply.
    pub(crate) fn preview(&self) -> HashMap<TaskId, Task> {
        let mut next = self.committed.clone();
        for (id, staged) in &self.pending {
            match staged {
                Some(task) => {
                    next.insert(*id, task.clone());
                }
                None => {
                    next.remove(id);
                }
            }
        }
        next
    }

    pub(crate) fn apply(&mut self) {
        for (id, staged) in self.pending.drain() {
            match staged {
                Some(task) => {
                    self.committed.insert(id, task);
                }
                None => {
                    self.committed.remove(&id);
                }
            }
        }
    }
}
