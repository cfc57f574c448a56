//! In-memory task store.

use std::collections::HashSet;

use tasksync_proto::task::{Task, TaskId};

use super::{Staged, StoreError, TaskStore};

/// Task store that keeps everything in memory.
///
/// Commits never fail. Use [`super::FaultyStore`] to simulate failures.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    state: Staged,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose committed state is `tasks`.
    #[must_use]
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        Self {
            state: Staged::from_committed(tasks),
        }
    }
}

impl TaskStore for MemoryStore {
    fn fetch(&self, ids: &HashSet<TaskId>) -> Result<Vec<Task>, StoreError> {
        Ok(self.state.fetch(ids))
    }

    fn fetch_all(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.state.fetch_all())
    }

    fn insert(&mut self, task: Task) {
        self.state.insert(task);
    }

    fn delete(&mut self, id: &TaskId) {
        self.state.delete(id);
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.state.apply();
        Ok(())
    }

    fn reset(&mut self) {
        self.state.reset();
    }

    fn has_changes(&self) -> bool {
        self.state.has_changes()
    }
}
