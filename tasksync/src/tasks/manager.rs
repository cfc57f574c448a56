//! Task manager for local CRUD with remote synchronization.
//!
//! `TaskManager` owns the local store session and the sync gateway, and is
//! the single place store access happens for the operations it exposes.
//!
//! Mutations are optimistic: the local store is changed and committed
//! first, then the change is pushed. Deletion is the exception and is
//! remote-first, see [`TaskManager::delete`].

use tasksync_proto::task::{InvalidTask, Priority, Task, TaskDraft, TaskId};

use super::TaskError;
use super::reconcile::ReconcileReport;
use crate::gateway::{Remote, SyncGateway};
use crate::store::TaskStore;

/// Tasks sharing a priority, as shown in one section of the task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSection {
    pub priority: Priority,
    /// Sorted by name.
    pub tasks: Vec<Task>,
}

/// A change to the user-editable fields of a task. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub name: Option<String>,
    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub complete: Option<bool>,
}

impl TaskEdit {
    /// Applies the edit to `task`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTask::EmptyName`] if the new name is empty.
    pub fn apply(&self, task: &mut Task) -> Result<(), InvalidTask> {
        if let Some(name) = &self.name {
            task.set_name(name.clone())?;
        }
        if let Some(notes) = &self.notes {
            task.set_notes(notes.clone());
        }
        if let Some(priority) = self.priority {
            task.set_priority(priority);
        }
        if let Some(complete) = self.complete {
            task.set_complete(complete);
        }
        Ok(())
    }
}

/// Sorts most urgent first, then by name.
fn sort_for_display(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.priority()
            .cmp(&a.priority())
            .then_with(|| a.name().cmp(b.name()))
            .then_with(|| a.id().cmp(b.id()))
    });
}

/// Groups tasks into one section per priority, most urgent first.
/// Empty sections are omitted.
#[must_use]
pub fn group_sections(mut tasks: Vec<Task>) -> Vec<TaskSection> {
    sort_for_display(&mut tasks);
    tasks
        .chunk_by(|a, b| a.priority() == b.priority())
        .map(|chunk| TaskSection {
            priority: chunk[0].priority(),
            tasks: chunk.to_vec(),
        })
        .collect()
}

/// Coordinates the local store with the remote store.
pub struct TaskManager<R, S> {
    gateway: SyncGateway<R>,
    store: S,
}

impl<R: Remote, S: TaskStore> TaskManager<R, S> {
    /// Creates a manager over the given gateway and store session.
    pub const fn new(gateway: SyncGateway<R>, store: S) -> Self {
        Self { gateway, store }
    }

    /// Returns the local store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the sync gateway.
    pub const fn gateway(&self) -> &SyncGateway<R> {
        &self.gateway
    }

    /// Fetches the remote collection and reconciles it into the local store.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Sync`] if fetching, decoding or committing fails.
    /// The local store is unchanged in that case.
    pub async fn refresh(&mut self) -> Result<ReconcileReport, TaskError> {
        let fetched = self.gateway.fetch_all(&mut self.store).await?;
        Ok(fetched.report)
    }

    /// Returns all local tasks, most urgent first, then by name.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the store cannot be read.
    pub fn tasks(&self) -> Result<Vec<Task>, TaskError> {
        let mut tasks = self.store.fetch_all()?;
        sort_for_display(&mut tasks);
        Ok(tasks)
    }

    /// Returns local tasks grouped by priority, most urgent section first.
    /// Empty sections are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Store`] if the store cannot be read.
    pub fn sections(&self) -> Result<Vec<TaskSection>, TaskError> {
        Ok(group_sections(self.store.fetch_all()?))
    }

    /// Returns the local task with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if there is none.
    pub fn get(&self, id: &TaskId) -> Result<Task, TaskError> {
        self.store.get(id)?.ok_or(TaskError::NotFound(*id))
    }

    /// Creates a task from `draft`, saves it locally, then pushes it.
    ///
    /// # Errors
    ///
    /// - [`TaskError::Invalid`] if the draft is incomplete; nothing is stored.
    /// - [`TaskError::Store`] if the local commit fails; nothing is stored
    ///   or pushed.
    /// - [`TaskError::Unsynced`] if the push fails; the task stays local.
    pub async fn create(&mut self, draft: &TaskDraft) -> Result<Task, TaskError> {
        let task = draft.build()?;
        self.save_and_push(task).await
    }

    /// Applies `edit` to a local task, saves it, then pushes it.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if the task does not exist.
    /// - [`TaskError::Invalid`] if `edit` rejects the change; nothing is stored.
    /// - [`TaskError::Store`] if the local commit fails; the store is reset.
    /// - [`TaskError::Unsynced`] if the push fails; the edit stays local.
    pub async fn update<F>(&mut self, id: &TaskId, edit: F) -> Result<Task, TaskError>
    where
        F: FnOnce(&mut Task) -> Result<(), InvalidTask>,
    {
        let mut task = self.get(id)?;
        edit(&mut task)?;
        self.save_and_push(task).await
    }

    /// Applies a [`TaskEdit`], see [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub async fn edit(&mut self, id: &TaskId, edit: &TaskEdit) -> Result<Task, TaskError> {
        self.update(id, |task| edit.apply(task)).await
    }

    /// Flips a task's `complete` flag.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub async fn toggle_complete(&mut self, id: &TaskId) -> Result<Task, TaskError> {
        self.update(id, |task| {
            task.set_complete(!task.is_complete());
            Ok(())
        })
        .await
    }

    /// Pushes the committed local copy of a task, e.g. to retry after
    /// [`TaskError::Unsynced`].
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] or [`TaskError::Sync`].
    pub async fn push(&mut self, id: &TaskId) -> Result<(), TaskError> {
        let task = self.get(id)?;
        self.gateway.push(&task).await?;
        Ok(())
    }

    /// Deletes a task, remote first.
    ///
    /// The local copy is only removed once the remote confirms the delete.
    /// If the local commit then fails, the task is pushed back to the remote
    /// and the store is reset, leaving the task present on both sides.
    ///
    /// # Errors
    ///
    /// - [`TaskError::NotFound`] if the task does not exist.
    /// - [`TaskError::Sync`] if the remote delete fails; nothing changed.
    /// - [`TaskError::Store`] if the local commit fails after the remote
    ///   delete; the compensation above has run.
    pub async fn delete(&mut self, id: &TaskId) -> Result<Task, TaskError> {
        let task = self.get(id)?;
        self.gateway.delete(&task).await?;

        self.store.delete(id);
        if let Err(e) = self.store.commit() {
            tracing::error!(task_id = %id, error = %e, "local delete failed after remote delete, restoring remote copy");
            if let Err(push_err) = self.gateway.push(&task).await {
                tracing::warn!(task_id = %id, error = %push_err, "failed to restore remote copy");
            }
            self.store.reset();
            return Err(TaskError::Store(e));
        }

        tracing::info!(task_id = %id, "deleted task");
        Ok(task)
    }

    async fn save_and_push(&mut self, task: Task) -> Result<Task, TaskError> {
        let id = *task.id();
        self.store.insert(task.clone());
        if let Err(e) = self.store.commit() {
            tracing::warn!(task_id = %id, error = %e, "failed to save task");
            self.store.reset();
            return Err(TaskError::Store(e));
        }

        self.gateway
            .push(&task)
            .await
            .map_err(|source| TaskError::Unsynced { id, source })?;
        Ok(task)
    }
}
