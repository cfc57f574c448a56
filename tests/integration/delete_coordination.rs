//! Remote-first deletion against an in-process `tasksync-server`.
//!
//! A delete removes the remote record before the local one. If the remote
//! refuses, nothing changes; if the local commit fails afterwards, the task
//! is pushed back so both sides still agree.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tasksync::gateway::{HttpRemote, SyncGateway};
use tasksync::store::{FaultHandle, FaultyStore, MemoryStore, TaskStore};
use tasksync::tasks::{TaskError, TaskManager};
use tasksync_proto::task::{Priority, Task, TaskId};
use tasksync_server::server::{self, ServerState};

type Manager = TaskManager<HttpRemote, FaultyStore<MemoryStore>>;

/// Starts a server holding `task`, and a manager whose store holds it too.
async fn synced_pair(task: &Task) -> (Arc<ServerState>, Manager, FaultHandle) {
    let state = Arc::new(ServerState::new());
    let (addr, _handle) = server::start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("failed to start test server");
    let remote = HttpRemote::new(&format!("http://{addr}/"), Duration::from_secs(5)).unwrap();
    let gateway = SyncGateway::new(remote);
    gateway.push(task).await.unwrap();

    let (store, faults) = FaultyStore::new(MemoryStore::with_tasks([task.clone()]));
    (state, TaskManager::new(gateway, store), faults)
}

fn make_task() -> Task {
    Task::new("Call plumber", Some("after 9am".to_string()), Priority::High).unwrap()
}

#[tokio::test]
async fn delete_removes_both_copies() {
    let task = make_task();
    let (state, mut manager, _faults) = synced_pair(&task).await;

    let deleted = manager.delete(task.id()).await.unwrap();

    assert_eq!(deleted, task);
    assert!(state.tasks.is_empty().await);
    assert!(manager.store().get(task.id()).unwrap().is_none());
}

#[tokio::test]
async fn deleted_task_is_not_resurrected_by_refresh() {
    let task = make_task();
    let (_state, mut manager, _faults) = synced_pair(&task).await;

    manager.delete(task.id()).await.unwrap();
    manager.refresh().await.unwrap();

    assert!(manager.tasks().unwrap().is_empty());
}

#[tokio::test]
async fn remote_failure_leaves_local_task() {
    let task = make_task();
    let remote = HttpRemote::new("http://127.0.0.1:9/", Duration::from_secs(2)).unwrap();
    let (store, faults) = FaultyStore::new(MemoryStore::with_tasks([task.clone()]));
    let mut manager = TaskManager::new(SyncGateway::new(remote), store);

    let result = manager.delete(task.id()).await;

    assert!(matches!(result, Err(TaskError::Sync(_))));
    assert_eq!(manager.get(task.id()).unwrap(), task);
    assert_eq!(faults.commits(), 0);
}

#[tokio::test]
async fn local_commit_failure_restores_remote_copy() {
    let task = make_task();
    let (state, mut manager, faults) = synced_pair(&task).await;
    faults.fail_next_commits(1);

    let result = manager.delete(task.id()).await;

    assert!(matches!(result, Err(TaskError::Store(_))));
    // Local: delete was rolled back.
    assert!(!manager.store().has_changes());
    assert_eq!(manager.get(task.id()).unwrap(), task);
    // Remote: the task was pushed back with its last known fields.
    let restored = state.tasks.get(&task.id().to_string()).await.unwrap();
    assert_eq!(restored["name"], "Call plumber");
    assert_eq!(restored["notes"], "after 9am");
    assert_eq!(restored["priority"], "high");

    // A later delete succeeds once the store recovers.
    manager.delete(task.id()).await.unwrap();
    assert!(state.tasks.is_empty().await);
}

#[tokio::test]
async fn deleting_unknown_task_makes_no_request() {
    let task = make_task();
    let (state, mut manager, _faults) = synced_pair(&task).await;

    let result = manager.delete(&TaskId::new()).await;

    assert!(matches!(result, Err(TaskError::NotFound(_))));
    assert_eq!(state.tasks.len().await, 1);
}
