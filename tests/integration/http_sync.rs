//! End-to-end synchronization over HTTP against an in-process
//! `tasksync-server`.
//!
//! Covers fetch-and-reconcile, push idempotence, malformed-record
//! isolation, the `null` empty collection, offline failures, and the
//! background sync service driving a real remote.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tasksync::gateway::{HttpRemote, SyncError, SyncGateway, TransportError};
use tasksync::service::{self, Operation, SyncCommand, SyncEvent};
use tasksync::store::{FileStore, MemoryStore, TaskStore};
use tasksync::tasks::{TaskError, TaskManager};
use tasksync_proto::task::{Priority, Task, TaskDraft, TaskId};
use tasksync_server::server::{self, ServerState};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Starts a server on an OS-assigned port and returns its state and a
/// gateway pointed at it.
async fn start() -> (Arc<ServerState>, SyncGateway<HttpRemote>) {
    let state = Arc::new(ServerState::new());
    let (addr, _handle) = server::start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("failed to start test server");
    let remote = HttpRemote::new(&format!("http://{addr}/"), Duration::from_secs(5)).unwrap();
    (state, SyncGateway::new(remote))
}

/// A gateway pointed at a port nothing listens on.
fn offline_gateway() -> SyncGateway<HttpRemote> {
    let remote = HttpRemote::new("http://127.0.0.1:9/", Duration::from_secs(2)).unwrap();
    SyncGateway::new(remote)
}

fn make_task(name: &str, priority: Priority) -> Task {
    Task::new(name, None, priority).unwrap()
}

// ---------------------------------------------------------------------------
// Fetch and reconcile
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_creates_local_task_from_remote_record() {
    let (state, gateway) = start().await;
    let id = TaskId::new();
    state
        .tasks
        .put(
            &id.to_string(),
            json!({
                "completed": false,
                "identifier": id.to_string(),
                "name": "Buy milk",
                "priority": "high"
            }),
        )
        .await;
    let mut store = MemoryStore::new();

    let fetched = gateway.fetch_all(&mut store).await.unwrap();

    assert_eq!(fetched.report.created, 1);
    let local = store.get(&id).unwrap().unwrap();
    assert_eq!(local.name(), "Buy milk");
    assert_eq!(local.priority(), Priority::High);
    assert!(!local.is_complete());
    assert_eq!(local.notes(), None);
}

#[tokio::test]
async fn empty_remote_is_an_empty_collection() {
    let (_state, gateway) = start().await;
    let existing = make_task("local", Priority::Low);
    let mut store = MemoryStore::with_tasks([existing.clone()]);

    let fetched = gateway.fetch_all(&mut store).await.unwrap();

    assert!(fetched.representations.is_empty());
    assert_eq!(store.fetch_all().unwrap(), vec![existing]);
}

#[tokio::test]
async fn malformed_records_do_not_block_valid_ones() {
    let (state, gateway) = start().await;
    let good = make_task("good", Priority::Normal);
    gateway.push(&good).await.unwrap();
    state
        .tasks
        .put(
            "bad-priority",
            json!({
                "completed": false,
                "identifier": TaskId::new().to_string(),
                "name": "bad",
                "priority": "someday"
            }),
        )
        .await;
    state
        .tasks
        .put(
            "bad-id",
            json!({
                "completed": true,
                "identifier": "not-a-uuid",
                "name": "worse",
                "priority": "low"
            }),
        )
        .await;
    let mut store = MemoryStore::new();

    let fetched = gateway.fetch_all(&mut store).await.unwrap();

    assert_eq!(fetched.representations.len(), 3);
    assert_eq!(fetched.report.skipped, 2);
    assert_eq!(store.fetch_all().unwrap(), vec![good]);
}

#[tokio::test]
async fn structurally_invalid_collection_is_a_decode_error() {
    let (state, gateway) = start().await;
    state.tasks.put("junk", json!({"name": 3})).await;
    let mut store = MemoryStore::new();

    let result = gateway.fetch_all(&mut store).await;

    assert!(matches!(result, Err(SyncError::Decode(_))));
    assert!(!store.has_changes());
}

#[tokio::test]
async fn remote_updates_overwrite_local_fields() {
    let (state, gateway) = start().await;
    let local = make_task("draft", Priority::Low);
    let mut store = MemoryStore::with_tasks([local.clone()]);
    state
        .tasks
        .put(
            &local.id().to_string(),
            json!({
                "completed": true,
                "identifier": local.id().to_string(),
                "name": "final",
                "notes": "done remotely",
                "priority": "critical"
            }),
        )
        .await;

    let fetched = gateway.fetch_all(&mut store).await.unwrap();

    assert_eq!(fetched.report.updated, 1);
    let updated = store.get(local.id()).unwrap().unwrap();
    assert_eq!(updated.name(), "final");
    assert_eq!(updated.notes(), Some("done remotely"));
    assert!(updated.is_complete());
    assert_eq!(updated.priority(), Priority::Critical);
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pushing_twice_leaves_one_record() {
    let (state, gateway) = start().await;
    let task = make_task("idempotent", Priority::Normal);

    gateway.push(&task).await.unwrap();
    gateway.push(&task).await.unwrap();

    assert_eq!(state.tasks.len().await, 1);
    let stored = state.tasks.get(&task.id().to_string()).await.unwrap();
    assert_eq!(stored["completed"], json!(false));
    assert_eq!(stored["name"], json!("idempotent"));
}

#[tokio::test]
async fn incomplete_draft_is_not_sent() {
    let (state, gateway) = start().await;
    let draft = TaskDraft {
        name: Some("no id".to_string()),
        priority: Some(Priority::Low),
        ..TaskDraft::default()
    };

    let result = gateway.push(&draft).await;

    assert!(matches!(result, Err(SyncError::NoIdentifier)));
    assert!(state.tasks.is_empty().await);
}

#[tokio::test]
async fn offline_operations_fail_with_transport_errors() {
    let gateway = offline_gateway();
    let mut store = MemoryStore::new();
    let task = make_task("offline", Priority::Normal);

    assert!(matches!(
        gateway.fetch_all(&mut store).await,
        Err(SyncError::Transport(_))
    ));
    assert!(matches!(
        gateway.push(&task).await,
        Err(SyncError::Transport(_))
    ));
    assert!(matches!(
        gateway.delete(&task).await,
        Err(SyncError::Transport(_))
    ));
}

#[tokio::test]
async fn missing_endpoint_is_a_status_error() {
    let (_state, gateway) = start().await;
    let base = gateway.remote().base_url().join("nowhere/").unwrap();
    let gateway = SyncGateway::new(HttpRemote::new(base.as_str(), Duration::from_secs(5)).unwrap());
    let mut store = MemoryStore::new();

    let result = gateway.fetch_all(&mut store).await;

    assert!(matches!(
        result,
        Err(SyncError::Transport(TransportError::Status(404)))
    ));
}

// ---------------------------------------------------------------------------
// Manager and service over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn created_task_reaches_a_second_client() {
    let (_state, gateway) = start().await;
    let second = SyncGateway::new(gateway.remote().clone());
    let mut alice = TaskManager::new(gateway, MemoryStore::new());
    let mut bob = TaskManager::new(second, MemoryStore::new());

    let created = alice
        .create(&TaskDraft::new("Water plants").with_priority(Priority::High))
        .await
        .unwrap();
    bob.refresh().await.unwrap();

    assert_eq!(bob.tasks().unwrap(), vec![created]);
}

#[tokio::test]
async fn create_while_offline_is_kept_locally_and_can_be_retried() {
    let mut manager = TaskManager::new(offline_gateway(), MemoryStore::new());

    let err = manager.create(&TaskDraft::new("later")).await.unwrap_err();
    let TaskError::Unsynced { id, .. } = err else {
        panic!("expected Unsynced, got {err:?}");
    };
    assert_eq!(manager.get(&id).unwrap().name(), "later");

    assert!(matches!(manager.push(&id).await, Err(TaskError::Sync(_))));
}

#[tokio::test]
async fn service_runs_commands_against_server() {
    let (state, gateway) = start().await;
    let seeded = make_task("seeded", Priority::Low);
    gateway.push(&seeded).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let manager = TaskManager::new(gateway, FileStore::open(&path).unwrap());
    let mut handle = service::spawn_sync(manager, 8);

    let startup = handle.events.recv().await.unwrap();
    assert_eq!(startup.operation(), Operation::Refresh);
    assert_eq!(startup.tasks(), &[seeded.clone()]);

    let draft = TaskDraft::new("from service").with_priority(Priority::Critical);
    let id = draft.identifier.unwrap();
    handle.commands.send(SyncCommand::Create(draft)).await.unwrap();
    let created = handle.events.recv().await.unwrap();
    assert!(matches!(created, SyncEvent::Updated { .. }), "{created:?}");
    // Most urgent first.
    assert_eq!(created.tasks()[0].id(), &id);

    handle.commands.send(SyncCommand::ToggleComplete(id)).await.unwrap();
    let toggled = handle.events.recv().await.unwrap();
    assert!(toggled.tasks()[0].is_complete());

    handle.commands.send(SyncCommand::Shutdown).await.unwrap();
    handle.worker.await.unwrap();

    let stored = state.tasks.get(&id.to_string()).await.unwrap();
    assert_eq!(stored["completed"], json!(true));

    // The file store persisted both tasks.
    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(reopened.fetch_all().unwrap().len(), 2);
}
