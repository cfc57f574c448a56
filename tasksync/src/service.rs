//! Background sync service.
//!
//! Moves a [`TaskManager`] onto its own tokio task so every store access
//! happens in one place, and talks to the application over channels:
//!
//! ```text
//! application  ─── SyncCommand ──→  sync worker (owns store + gateway)
//!              ←── SyncEvent ────
//! ```
//!
//! The worker refreshes from the remote once on startup, then handles
//! commands one at a time. Every command except [`SyncCommand::Shutdown`]
//! produces exactly one [`SyncEvent`], carrying the local task list as it
//! stands after the operation.

use std::fmt;

use tasksync_proto::task::{Task, TaskDraft, TaskId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::gateway::Remote;
use crate::store::TaskStore;
use crate::tasks::{TaskEdit, TaskError, TaskManager};

/// Default channel capacity for commands and events.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Commands sent from the application to the sync worker.
#[derive(Debug, Clone)]
pub enum SyncCommand {
    /// Fetch the remote collection and reconcile it.
    Refresh,
    /// Create a task from a draft.
    Create(TaskDraft),
    /// Change fields of an existing task.
    Edit {
        /// Task to change.
        id: TaskId,
        /// Fields to change.
        edit: TaskEdit,
    },
    /// Flip a task's `complete` flag.
    ToggleComplete(TaskId),
    /// Delete a task, remote first.
    Delete(TaskId),
    /// Stop the worker.
    Shutdown,
}

/// Which operation a [`SyncEvent`] reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Refresh,
    Create,
    Edit,
    ToggleComplete,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refresh => write!(f, "refresh"),
            Self::Create => write!(f, "create"),
            Self::Edit => write!(f, "edit"),
            Self::ToggleComplete => write!(f, "toggle"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Outcome events sent from the sync worker to the application.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The operation succeeded.
    Updated {
        operation: Operation,
        /// Local tasks after the operation, most urgent first.
        tasks: Vec<Task>,
    },
    /// The operation failed.
    Failed {
        operation: Operation,
        /// Human-readable error.
        reason: String,
        /// Local tasks after the operation and any compensation.
        tasks: Vec<Task>,
    },
}

impl SyncEvent {
    /// The operation this event reports on.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Updated { operation, .. } | Self::Failed { operation, .. } => *operation,
        }
    }

    /// The local task list carried by the event.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        match self {
            Self::Updated { tasks, .. } | Self::Failed { tasks, .. } => tasks,
        }
    }
}

/// Channel handles for a running sync worker.
pub struct SyncHandle {
    /// Send commands here.
    pub commands: mpsc::Sender<SyncCommand>,
    /// Receive one event per command here.
    pub events: mpsc::Receiver<SyncEvent>,
    /// Completes when the worker stops.
    pub worker: JoinHandle<()>,
}

/// Spawns the sync worker for `manager`.
///
/// The worker stops on [`SyncCommand::Shutdown`], when every command sender
/// is dropped, or when the event receiver is dropped.
pub fn spawn_sync<R, S>(manager: TaskManager<R, S>, buffer: usize) -> SyncHandle
where
    R: Remote + 'static,
    S: TaskStore + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(buffer);
    let (evt_tx, evt_rx) = mpsc::channel(buffer);
    let worker = tokio::spawn(run_worker(manager, cmd_rx, evt_tx));
    SyncHandle {
        commands: cmd_tx,
        events: evt_rx,
        worker,
    }
}

async fn run_worker<R: Remote, S: TaskStore>(
    mut manager: TaskManager<R, S>,
    mut cmd_rx: mpsc::Receiver<SyncCommand>,
    evt_tx: mpsc::Sender<SyncEvent>,
) {
    let startup = execute(&mut manager, SyncCommand::Refresh).await;
    if let Some(event) = startup
        && evt_tx.send(event).await.is_err()
    {
        return;
    }

    while let Some(cmd) = cmd_rx.recv().await {
        let Some(event) = execute(&mut manager, cmd).await else {
            tracing::info!("sync worker shutting down");
            break;
        };
        if evt_tx.send(event).await.is_err() {
            // Application dropped its receiver.
            break;
        }
    }
}

/// Runs one command and turns its outcome into an event.
///
/// Returns `None` for [`SyncCommand::Shutdown`].
async fn execute<R: Remote, S: TaskStore>(
    manager: &mut TaskManager<R, S>,
    cmd: SyncCommand,
) -> Option<SyncEvent> {
    let (operation, result) = match cmd {
        SyncCommand::Refresh => (Operation::Refresh, manager.refresh().await.map(drop)),
        SyncCommand::Create(draft) => (Operation::Create, manager.create(&draft).await.map(drop)),
        SyncCommand::Edit { id, edit } => (Operation::Edit, manager.edit(&id, &edit).await.map(drop)),
        SyncCommand::ToggleComplete(id) => (
            Operation::ToggleComplete,
            manager.toggle_complete(&id).await.map(drop),
        ),
        SyncCommand::Delete(id) => (Operation::Delete, manager.delete(&id).await.map(drop)),
        SyncCommand::Shutdown => return None,
    };

    let tasks = manager.tasks().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to read local tasks");
        Vec::new()
    });

    Some(match result {
        Ok(()) => SyncEvent::Updated { operation, tasks },
        Err(e) => {
            tracing::warn!(%operation, error = %e, "sync operation failed");
            SyncEvent::Failed {
                operation,
                reason: describe(&e),
                tasks,
            }
        }
    })
}

fn describe(error: &TaskError) -> String {
    match error {
        TaskError::Unsynced { source, .. } => format!("saved locally, not synced: {source}"),
        other => other.to_string(),
    }
}
