//! JSON file task store.
//!
//! The committed task set lives in a single JSON array of task
//! representations. A commit writes the next snapshot to a sibling temporary
//! file and renames it over the original, so a failed commit leaves the
//! previous snapshot intact.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tasksync_proto::task::{Task, TaskId, TaskRepresentation};

use super::{Staged, StoreError, TaskStore};

/// Task store persisted to a JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: Staged,
}

impl FileStore {
    /// Opens the store at `path`.
    ///
    /// A missing file is an empty store; the file is created on the first
    /// commit. Records that do not form a valid task (bad identifier,
    /// unknown priority, empty name) are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read, or
    /// [`StoreError::Serialize`] if it is not a JSON array of records.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records: Vec<TaskRepresentation> = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(StoreError::Io { path, source: e }),
        };

        let tasks = records.into_iter().filter_map(|rep| {
            let identifier = rep.identifier.clone();
            Task::try_from(rep)
                .inspect_err(|e| {
                    tracing::warn!(identifier = %identifier, error = %e, "skipping invalid stored task");
                })
                .ok()
        });

        let state = Staged::from_committed(tasks);
        tracing::debug!(path = %path.display(), "opened task store");
        Ok(Self { path, state })
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_snapshot(&self, records: &[TaskRepresentation]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let bytes = serde_json::to_vec_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            io_err(e)
        })
    }
}

impl TaskStore for FileStore {
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
        if !self.state.has_changes() {
            return Ok(());
        }

        let mut records: Vec<TaskRepresentation> = self
            .state
            .preview()
            .values()
            .map(TaskRepresentation::from)
            .collect();
        records.sort_by(|a, b| a.identifier.cmp(&b.identifier));

        self.write_snapshot(&records)?;
        self.state.apply();
        tracing::debug!(path = %self.path.display(), tasks = records.len(), "committed task store");
        Ok(())
    }

    fn reset(&mut self) {
        self.state.reset();
    }

    fn has_changes(&self) -> bool {
        self.state.has_changes()
    }
}
