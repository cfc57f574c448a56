//! Reconciliation properties over arbitrary local and remote task sets.
//!
//! For any local set L and valid remote set R, reconciling R into L leaves
//! exactly the union of identifiers, with remote fields winning on overlap.
//! Malformed records never change the outcome for valid ones.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use tasksync::store::{FileStore, MemoryStore, TaskStore};
use tasksync::tasks::reconcile;
use tasksync_proto::task::{Priority, Task, TaskId, TaskRepresentation};

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop::sample::select(Priority::ALL.to_vec())
}

/// Task fields minus the identifier.
fn arb_fields() -> impl Strategy<Value = (String, Option<String>, bool, Priority)> {
    (
        "[a-z ]{1,16}",
        prop::option::of("[a-z ]{0,16}"),
        any::<bool>(),
        arb_priority(),
    )
}

/// A pool of identifiers shared by the local and remote sides, so the two
/// sets overlap.
fn arb_sides() -> impl Strategy<Value = (Vec<Task>, Vec<Task>)> {
    prop::collection::vec(
        (any::<bool>(), any::<bool>(), arb_fields(), arb_fields()),
        0..24,
    )
    .prop_map(|slots| {
        let mut local = Vec::new();
        let mut remote = Vec::new();
        for (in_local, in_remote, lf, rf) in slots {
            let id = TaskId::new();
            if in_local {
                local.push(Task::with_id(id, lf.0, lf.1, lf.2, lf.3).unwrap());
            }
            if in_remote {
                remote.push(Task::with_id(id, rf.0, rf.1, rf.2, rf.3).unwrap());
            }
        }
        (local, remote)
    })
}

fn malformed(n: usize) -> Vec<TaskRepresentation> {
    (0..n)
        .map(|i| TaskRepresentation {
            complete: false,
            identifier: format!("broken-{i}"),
            name: "broken".to_string(),
            notes: None,
            priority: "urgent".to_string(),
        })
        .collect()
}

proptest! {
    #[test]
    fn result_is_union_with_remote_winning((local, remote) in arb_sides(), junk in 0usize..4) {
        let mut store = MemoryStore::with_tasks(local.clone());
        let mut reps: Vec<TaskRepresentation> = remote.iter().map(Task::to_representation).collect();
        reps.extend(malformed(junk));

        let report = reconcile(&mut store, &reps).unwrap();

        let result: HashMap<TaskId, Task> = store
            .fetch_all()
            .unwrap()
            .into_iter()
            .map(|t| (*t.id(), t))
            .collect();

        let local_ids: HashSet<TaskId> = local.iter().map(|t| *t.id()).collect();
        let remote_ids: HashSet<TaskId> = remote.iter().map(|t| *t.id()).collect();
        let expected_ids: HashSet<TaskId> = local_ids.union(&remote_ids).copied().collect();
        let result_ids: HashSet<TaskId> = result.keys().copied().collect();
        prop_assert_eq!(result_ids, expected_ids);

        for task in &remote {
            prop_assert_eq!(&result[task.id()], task);
        }
        for task in local.iter().filter(|t| !remote_ids.contains(t.id())) {
            prop_assert_eq!(&result[task.id()], task);
        }

        prop_assert_eq!(report.skipped, junk);
        prop_assert_eq!(report.updated, local_ids.intersection(&remote_ids).count());
        prop_assert_eq!(report.created, remote_ids.difference(&local_ids).count());
        prop_assert!(!store.has_changes());
    }

    #[test]
    fn reconciling_twice_changes_nothing((local, remote) in arb_sides()) {
        let mut store = MemoryStore::with_tasks(local);
        let reps: Vec<TaskRepresentation> = remote.iter().map(Task::to_representation).collect();

        reconcile(&mut store, &reps).unwrap();
        let mut first = store.fetch_all().unwrap();
        reconcile(&mut store, &reps).unwrap();
        let mut second = store.fetch_all().unwrap();

        first.sort_by_key(|t| *t.id());
        second.sort_by_key(|t| *t.id());
        prop_assert_eq!(first, second);
    }
}

#[test]
fn reconciled_tasks_survive_reopening_the_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let local = Task::new("local", None, Priority::Low).unwrap();
    let remote = Task::new("remote", Some("n".to_string()), Priority::High).unwrap();

    let mut store = FileStore::open(&path).unwrap();
    store.insert(local.clone());
    store.commit().unwrap();
    let mut reps = vec![remote.to_representation()];
    reps.extend(malformed(1));
    let report = reconcile(&mut store, &reps).unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.skipped, 1);

    let reopened = FileStore::open(&path).unwrap();
    let mut tasks = reopened.fetch_all().unwrap();
    tasks.sort_by(|a, b| a.name().cmp(b.name()));
    assert_eq!(tasks, vec![local, remote]);
}
