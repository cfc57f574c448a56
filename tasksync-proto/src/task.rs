//! Task data model for tasksync.
//!
//! Defines the validated local [`Task`], the incomplete [`TaskDraft`] used by
//! the creation flow, and the [`TaskRepresentation`] wire value exchanged with
//! the remote store. A representation carries raw text for `identifier` and
//! `priority`; converting it into a [`Task`] is where that text is validated.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Length of the hyphenated text form, `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
const HYPHENATED_LEN: usize = 36;

impl FromStr for TaskId {
    type Err = InvalidTask;

    /// Parses the hyphenated form only, in either case. The simple, braced
    /// and `urn:uuid:` forms are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HYPHENATED_LEN {
            return Err(InvalidTask::Identifier(s.to_string()));
        }
        Uuid::try_parse(s)
            .map(Self)
            .map_err(|_| InvalidTask::Identifier(s.to_string()))
    }
}

/// Priority of a task.
///
/// Ordered from least to most urgent, so `Priority::Critical` is the maximum.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait.
    Low,
    /// The default.
    #[default]
    Normal,
    /// Should be done soon.
    High,
    /// Drop everything.
    Critical,
}

impl Priority {
    /// All priorities, least urgent first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Normal, Self::High, Self::Critical];

    /// Returns the string tag used on the wire and in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = InvalidTask;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| InvalidTask::Priority(s.to_string()))
    }
}

/// Reasons a value cannot become a [`Task`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTask {
    /// The identifier text is not a UUID.
    #[error("invalid task identifier: {0:?}")]
    Identifier(String),
    /// The priority tag is not one of `low|normal|high|critical`.
    #[error("unknown task priority: {0:?}")]
    Priority(String),
    /// The task name is empty.
    #[error("task name cannot be empty")]
    EmptyName,
    /// A draft has no identifier.
    #[error("task has no identifier")]
    MissingIdentifier,
    /// A draft has no name.
    #[error("task has no name")]
    MissingName,
    /// A draft has no priority.
    #[error("task has no priority")]
    MissingPriority,
}

/// A fully valid task record.
///
/// The name is guaranteed non-empty and the identifier is fixed for the
/// lifetime of the record. Mutable fields are changed through setters so the
/// name invariant cannot be bypassed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    name: String,
    notes: Option<String>,
    complete: bool,
    priority: Priority,
}

impl Task {
    /// Creates a new incomplete task with a fresh identifier.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTask::EmptyName`] if `name` is empty.
    pub fn new(
        name: impl Into<String>,
        notes: Option<String>,
        priority: Priority,
    ) -> Result<Self, InvalidTask> {
        Self::with_id(TaskId::new(), name, notes, false, priority)
    }

    /// Creates a task with every field given explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTask::EmptyName`] if `name` is empty.
    pub fn with_id(
        id: TaskId,
        name: impl Into<String>,
        notes: Option<String>,
        complete: bool,
        priority: Priority,
    ) -> Result<Self, InvalidTask> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidTask::EmptyName);
        }
        Ok(Self {
            id,
            name,
            notes,
            complete,
            priority,
        })
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Returns the task name, never empty.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the free-text notes, if any.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Whether the task is marked complete.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.complete
    }

    /// Returns the task priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Renames the task.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTask::EmptyName`] and leaves the task unchanged if
    /// `name` is empty.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), InvalidTask> {
        let name = name.into();
        if name.is_empty() {
            return Err(InvalidTask::EmptyName);
        }
        self.name = name;
        Ok(())
    }

    /// Replaces the notes. `None` clears them.
    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }

    /// Marks the task complete or incomplete.
    pub const fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }

    /// Changes the task priority.
    pub const fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Copies every mutable field from `other`, keeping this task's identifier.
    pub fn overwrite_from(&mut self, other: &Self) {
        self.complete = other.complete;
        self.name.clone_from(&other.name);
        self.notes.clone_from(&other.notes);
        self.priority = other.priority;
    }

    /// Returns the wire representation of this task.
    #[must_use]
    pub fn to_representation(&self) -> TaskRepresentation {
        TaskRepresentation::from(self)
    }
}

/// A task that may be missing required fields.
///
/// Drafts model records being assembled by a creation form, or records whose
/// required fields were never filled in. Only a draft with every required
/// field set can be turned into a [`Task`] or a [`TaskRepresentation`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub identifier: Option<TaskId>,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub complete: bool,
    pub priority: Option<Priority>,
}

impl TaskDraft {
    /// Starts a draft for a new task: fresh identifier, normal priority.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identifier: Some(TaskId::new()),
            name: Some(name.into()),
            notes: None,
            complete: false,
            priority: Some(Priority::Normal),
        }
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub const fn with_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    /// Builds the task, checking every required field.
    ///
    /// # Errors
    ///
    /// Returns the first missing or invalid field as an [`InvalidTask`].
    pub fn build(&self) -> Result<Task, InvalidTask> {
        let id = self.identifier.ok_or(InvalidTask::MissingIdentifier)?;
        let name = self.name.clone().ok_or(InvalidTask::MissingName)?;
        let priority = self.priority.ok_or(InvalidTask::MissingPriority)?;
        Task::with_id(id, name, self.notes.clone(), self.complete, priority)
    }
}

impl From<&Task> for TaskDraft {
    fn from(task: &Task) -> Self {
        Self {
            identifier: Some(task.id),
            name: Some(task.name.clone()),
            notes: task.notes.clone(),
            complete: task.complete,
            priority: Some(task.priority),
        }
    }
}

/// The shape of a task as exchanged with the remote store.
///
/// `complete` travels under the wire key `completed`. `identifier` and
/// `priority` are unvalidated text until converted with
/// [`Task::try_from`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRepresentation {
    #[serde(rename = "completed")]
    pub complete: bool,
    pub identifier: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub priority: String,
}

impl TaskRepresentation {
    /// Parses the identifier text, if it is a UUID.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTask::Identifier`] when the text is not a UUID.
    pub fn task_id(&self) -> Result<TaskId, InvalidTask> {
        self.identifier.parse()
    }
}

impl From<&Task> for TaskRepresentation {
    fn from(task: &Task) -> Self {
        Self {
            complete: task.complete,
            identifier: task.id.to_string(),
            name: task.name.clone(),
            notes: task.notes.clone(),
            priority: task.priority.as_str().to_string(),
        }
    }
}

impl TryFrom<&TaskRepresentation> for Task {
    type Error = InvalidTask;

    fn try_from(rep: &TaskRepresentation) -> Result<Self, Self::Error> {
        let id = rep.task_id()?;
        let priority = rep.priority.parse()?;
        Self::with_id(id, rep.name.clone(), rep.notes.clone(), rep.complete, priority)
    }
}

impl TryFrom<TaskRepresentation> for Task {
    type Error = InvalidTask;

    fn try_from(rep: TaskRepresentation) -> Result<Self, Self::Error> {
        let id = rep.task_id()?;
        let priority = rep.priority.parse()?;
        Self::with_id(id, rep.name, rep.notes, rep.complete, priority)
    }
}
