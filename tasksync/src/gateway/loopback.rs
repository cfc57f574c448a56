//! Loopback remote for testing.
//!
//! Keeps the remote collection in process, keyed the same way the REST
//! endpoint keys it, and serves it back as the same JSON document. Clones
//! share state, so a test can keep one handle while the gateway owns another.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use tasksync_proto::codec;
use tasksync_proto::task::{TaskId, TaskRepresentation};

use super::{Remote, TransportError};

#[derive(Debug, Default)]
struct Shared {
    records: Mutex<BTreeMap<String, serde_json::Value>>,
    raw_collection: Mutex<Option<Vec<u8>>>,
    offline: AtomicBool,
    requests: AtomicUsize,
}

/// In-process [`Remote`] backed by a keyed JSON collection.
#[derive(Debug, Clone, Default)]
pub struct LoopbackRemote {
    shared: Arc<Shared>,
}

impl LoopbackRemote {
    /// Creates an empty remote.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every request fail with [`TransportError::Unreachable`].
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.store(offline, Ordering::SeqCst);
    }

    /// Overrides the body returned by `fetch_collection`. `None` restores
    /// the real collection.
    pub fn serve_raw(&self, body: Option<Vec<u8>>) {
        *self.shared.raw_collection.lock() = body;
    }

    /// Stores an arbitrary JSON value under an arbitrary key.
    pub fn insert_raw(&self, key: impl Into<String>, value: serde_json::Value) {
        self.shared.records.lock().insert(key.into(), value);
    }

    /// Returns the decoded record stored under `id`, if any.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<TaskRepresentation> {
        let records = self.shared.records.lock();
        let value = records.get(&id.to_string())?.clone();
        drop(records);
        serde_json::from_value(value).ok()
    }

    /// Returns a copy of the whole collection.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, serde_json::Value> {
        self.shared.records.lock().clone()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of requests received, including failed ones.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.shared.requests.load(Ordering::SeqCst)
    }

    fn begin_request(&self) -> Result<(), TransportError> {
        self.shared.requests.fetch_add(1, Ordering::SeqCst);
        if self.shared.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable("loopback remote is offline".into()));
        }
        Ok(())
    }
}

impl Remote for LoopbackRemote {
    async fn fetch_collection(&self) -> Result<Vec<u8>, TransportError> {
        self.begin_request()?;
        if let Some(raw) = self.shared.raw_collection.lock().clone() {
            return Ok(raw);
        }

        let records = self.shared.records.lock().clone();
        if records.is_empty() {
            return Ok(b"null".to_vec());
        }
        serde_json::to_vec(&records).map_err(|e| TransportError::Client(e.to_string()))
    }

    async fn put(&self, id: &TaskId, body: Vec<u8>) -> Result<(), TransportError> {
        self.begin_request()?;
        // Reject bodies the real endpoint would reject.
        codec::decode(&body).map_err(|_| TransportError::Status(400))?;
        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|_| TransportError::Status(400))?;
        self.shared.records.lock().insert(id.to_string(), value);
        Ok(())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), TransportError> {
        self.begin_request()?;
        self.shared.records.lock().remove(&id.to_string());
        Ok(())
    }
}
