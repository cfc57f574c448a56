//! In-memory keyed task collection.
//!
//! The [`TaskCollection`] holds one JSON record per key, the way the REST
//! endpoint exposes them: `GET /tasks.json` returns the whole map and
//! `PUT`/`DELETE /tasks/{key}.json` replace or remove a single record.
//! Records are kept as raw JSON so the collection can also hold data that
//! other writers produced, well-formed or not.

use std::collections::BTreeMap;

use serde_json::Value;
use tokio::sync::RwLock;

/// Thread-safe keyed collection of JSON task records.
#[derive(Debug, Default)]
pub struct TaskCollection {
    records: RwLock<BTreeMap<String, Value>>,
}

impl TaskCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous record.
    ///
    /// Returns `true` if the key was new.
    pub async fn put(&self, key: &str, value: Value) -> bool {
        let mut records = self.records.write().await;
        records.insert(key.to_string(), value).is_none()
    }

    /// Removes the record under `key`. Returns `true` if one existed.
    pub async fn remove(&self, key: &str) -> bool {
        let mut records = self.records.write().await;
        records.remove(key).is_some()
    }

    /// Returns the record under `key`.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.records.read().await.get(key).cloned()
    }

    /// Returns a copy of every record, keyed and ordered by key.
    pub async fn snapshot(&self) -> BTreeMap<String, Value> {
        self.records.read().await.clone()
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
