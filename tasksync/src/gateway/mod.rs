//! Synchronization with the remote task store.
//!
//! [`Remote`] is the raw transport seam: three HTTP-shaped operations that
//! move opaque bytes. [`SyncGateway`] layers the wire format and the
//! reconciler on top of any remote and reports every outcome as a typed
//! [`SyncError`].
//!
//! Implementations of [`Remote`]:
//! - [`http::HttpRemote`]: REST over HTTP(S) with `reqwest`
//! - [`loopback::LoopbackRemote`]: in-process keyed collection for testing

pub mod http;
pub mod loopback;

use tasksync_proto::codec::{self, CodecError};
use tasksync_proto::task::{InvalidTask, Task, TaskDraft, TaskId, TaskRepresentation};

use crate::store::{StoreError, TaskStore};
use crate::tasks::reconcile::{ReconcileReport, reconcile};

pub use http::HttpRemote;
pub use loopback::LoopbackRemote;

/// Errors that can occur while talking to the remote store.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote could not be reached.
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The remote answered with a non-success status.
    #[error("remote returned HTTP {0}")]
    Status(u16),

    /// The configured base URL cannot address a resource.
    #[error("invalid remote URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Any other client-side failure.
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Errors reported by [`SyncGateway`] operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The task has no identifier. Tasks get one at construction, so this
    /// indicates a caller bug.
    #[error("task has no identifier")]
    NoIdentifier,

    /// Network or connectivity failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The remote answered with an empty body.
    #[error("remote returned no data")]
    NoData,

    /// The remote payload is not a valid task collection.
    #[error("failed to decode remote tasks: {0}")]
    Decode(#[source] CodecError),

    /// The task is missing required fields or could not be serialized.
    #[error("failed to encode task: {0}")]
    Encode(String),

    /// The local store could not persist the reconciled tasks.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Async transport for the three remote operations.
///
/// Implementations move bytes only; encoding, decoding and reconciliation
/// happen in [`SyncGateway`].
pub trait Remote: Send + Sync {
    /// Reads the full keyed task collection. Returns the raw response body.
    fn fetch_collection(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Replaces or creates the task stored under `id` with `body`.
    fn put(
        &self,
        id: &TaskId,
        body: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Removes the task stored under `id`.
    fn delete(
        &self,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}

/// Something the gateway can send to the remote store.
///
/// Implemented for [`Task`], which always succeeds, and for [`TaskDraft`],
/// whose required fields may be missing.
pub trait Outgoing: Sync {
    /// The identifier the remote record is keyed by, if any.
    fn identifier(&self) -> Option<TaskId>;

    /// The wire representation.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTask`] when a required field is unset.
    fn representation(&self) -> Result<TaskRepresentation, InvalidTask>;
}

impl Outgoing for Task {
    fn identifier(&self) -> Option<TaskId> {
        Some(*self.id())
    }

    fn representation(&self) -> Result<TaskRepresentation, InvalidTask> {
        Ok(self.to_representation())
    }
}

impl Outgoing for TaskDraft {
    fn identifier(&self) -> Option<TaskId> {
        self.identifier
    }

    fn representation(&self) -> Result<TaskRepresentation, InvalidTask> {
        self.build().map(|task| task.to_representation())
    }
}

/// Result of a successful [`SyncGateway::fetch_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Every decoded representation, malformed ones included.
    pub representations: Vec<TaskRepresentation>,
    /// What the reconciler did with them.
    pub report: ReconcileReport,
}

/// Typed remote operations over a [`Remote`].
///
/// Every operation resolves exactly once and never retries. The local store
/// is passed in explicitly by the caller.
#[derive(Debug, Clone)]
pub struct SyncGateway<R> {
    remote: R,
}

impl<R: Remote> SyncGateway<R> {
    /// Creates a gateway over `remote`.
    pub const fn new(remote: R) -> Self {
        Self { remote }
    }

    /// Returns the underlying remote.
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Fetches the remote collection and reconciles it into `store`.
    ///
    /// On any error the store is left at its last committed state.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Transport`] if the request fails.
    /// - [`SyncError::NoData`] if the body is empty.
    /// - [`SyncError::Decode`] if the body is not a task collection.
    /// - [`SyncError::Store`] if the reconciled changes cannot be committed.
    pub async fn fetch_all<S: TaskStore + ?Sized>(
        &self,
        store: &mut S,
    ) -> Result<Fetched, SyncError> {
        let body = self.remote.fetch_collection().await.inspect_err(|e| {
            tracing::warn!(error = %e, "failed to fetch remote tasks");
        })?;

        if body.is_empty() {
            tracing::warn!("remote returned an empty body");
            return Err(SyncError::NoData);
        }

        let representations: Vec<TaskRepresentation> = codec::decode_collection(&body)
            .map_err(|e| {
                tracing::warn!(error = %e, "failed to decode remote tasks");
                SyncError::Decode(e)
            })?
            .into_values()
            .collect();

        let report = reconcile(store, &representations)?;
        Ok(Fetched {
            representations,
            report,
        })
    }

    /// Replaces or creates `task` on the remote.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NoIdentifier`] if the task has no identifier. No
    ///   request is made.
    /// - [`SyncError::Encode`] if a required field is unset.
    /// - [`SyncError::Transport`] if the request fails.
    pub async fn push<T: Outgoing + ?Sized>(&self, task: &T) -> Result<(), SyncError> {
        let id = task.identifier().ok_or(SyncError::NoIdentifier)?;
        let rep = task
            .representation()
            .map_err(|e| SyncError::Encode(e.to_string()))?;
        let body = codec::encode(&rep).map_err(|e| SyncError::Encode(e.to_string()))?;

        self.remote.put(&id, body).await.inspect_err(|e| {
            tracing::warn!(task_id = %id, error = %e, "failed to push task");
        })?;
        tracing::debug!(task_id = %id, "pushed task");
        Ok(())
    }

    /// Removes `task` from the remote.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NoIdentifier`] if the task has no identifier. No
    ///   request is made.
    /// - [`SyncError::Transport`] if the request fails.
    pub async fn delete<T: Outgoing + ?Sized>(&self, task: &T) -> Result<(), SyncError> {
        let id = task.identifier().ok_or(SyncError::NoIdentifier)?;

        self.remote.delete(&id).await.inspect_err(|e| {
            tracing::warn!(task_id = %id, error = %e, "failed to delete remote task");
        })?;
        tracing::debug!(task_id = %id, "deleted remote task");
        Ok(())
    }
}
