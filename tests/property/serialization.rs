//! Property-based tests for the task wire format.
//!
//! Uses proptest to verify:
//! 1. Any valid `Task` survives representation → JSON → representation → task.
//! 2. Encoded tasks always carry the `completed` key, never `complete`.
//! 3. Random bytes never cause a panic in `decode` or `decode_collection`.
//! 4. Representations with unknown priority text never become tasks.

#![allow(clippy::expect_used)]

use proptest::prelude::*;
use tasksync_proto::codec;
use tasksync_proto::task::{Priority, Task, TaskId, TaskRepresentation};
use uuid::Uuid;

fn arb_task_id() -> impl Strategy<Value = TaskId> {
    any::<u128>().prop_map(|n| TaskId::from_uuid(Uuid::from_u128(n)))
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop::sample::select(Priority::ALL.to_vec())
}

/// Non-empty names, so every generated task is valid.
fn arb_task() -> impl Strategy<Value = Task> {
    (
        arb_task_id(),
        "[^\x00]{1,128}",
        prop::option::of("[^\x00]{0,256}"),
        any::<bool>(),
        arb_priority(),
    )
        .prop_map(|(id, name, notes, complete, priority)| {
            Task::with_id(id, name, notes, complete, priority).expect("name is non-empty")
        })
}

proptest! {
    /// Any valid task survives the trip through its JSON representation.
    #[test]
    fn task_round_trip(task in arb_task()) {
        let bytes = codec::encode(&task.to_representation()).expect("encode should succeed");
        let rep = codec::decode(&bytes).expect("decode should succeed");
        let decoded = Task::try_from(rep).expect("representation should be valid");
        prop_assert_eq!(task, decoded);
    }

    /// The completion flag travels under `completed`.
    #[test]
    fn encoded_task_uses_completed_key(task in arb_task()) {
        let bytes = codec::encode(&task.to_representation()).expect("encode should succeed");
        let value: serde_json::Value = serde_json::from_slice(&bytes).expect("valid JSON");
        prop_assert_eq!(value.get("completed").and_then(serde_json::Value::as_bool), Some(task.is_complete()));
        prop_assert!(value.get("complete").is_none());
    }

    /// A keyed collection of tasks decodes back to the same representations.
    #[test]
    fn collection_round_trip(tasks in prop::collection::vec(arb_task(), 0..16)) {
        let map: std::collections::BTreeMap<String, TaskRepresentation> = tasks
            .iter()
            .map(|t| (t.id().to_string(), t.to_representation()))
            .collect();
        let bytes = serde_json::to_vec(&map).expect("encode should succeed");
        let decoded = codec::decode_collection(&bytes).expect("decode should succeed");
        prop_assert_eq!(map, decoded);
    }

    /// Random bytes never cause a panic when decoded as a single record.
    #[test]
    fn random_bytes_decode_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode(&bytes);
    }

    /// Random bytes never cause a panic when decoded as a collection.
    #[test]
    fn random_bytes_decode_collection_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode_collection(&bytes);
    }

    /// Priority text outside the four known values is rejected.
    #[test]
    fn unknown_priority_is_rejected(task in arb_task(), priority in "[a-z]{1,12}") {
        prop_assume!(Priority::ALL.iter().all(|p| p.as_str() != priority));
        let mut rep = task.to_representation();
        rep.priority = priority;
        prop_assert!(Task::try_from(&rep).is_err());
    }
}
