//! REST server core: shared state, routes, and handlers.
//!
//! Serves a single keyed task collection:
//!
//! | Method   | Path                 | Effect                                  |
//! |----------|----------------------|-----------------------------------------|
//! | `GET`    | `/tasks.json`        | whole collection, `null` when empty     |
//! | `PUT`    | `/tasks/{key}.json`  | replace or create the record at `key`   |
//! | `DELETE` | `/tasks/{key}.json`  | remove the record at `key` (idempotent) |
//!
//! `PUT` bodies must be a task representation whose `identifier` matches
//! the key; anything else is rejected with `400 Bad Request`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use tasksync_proto::codec;
use tokio::task::JoinHandle;

use crate::store::TaskCollection;

/// Default maximum accepted request body size in bytes (64 KB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Shared server state.
#[derive(Debug)]
pub struct ServerState {
    /// The task records served by the endpoint.
    pub tasks: TaskCollection,
    /// Maximum accepted request body size in bytes.
    max_payload_size: usize,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerState {
    /// Creates a state with an empty collection and the default body limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Creates a state with an empty collection and a custom body limit.
    #[must_use]
    pub fn with_config(max_payload_size: usize) -> Self {
        Self {
            tasks: TaskCollection::new(),
            max_payload_size,
        }
    }

    /// Returns the configured body limit.
    #[must_use]
    pub const fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }
}

/// Builds the router for `state`.
pub fn router(state: Arc<ServerState>) -> Router {
    let limit = state.max_payload_size;
    Router::new()
        .route("/tasks.json", get(list_tasks))
        .route("/tasks/{file}", put(put_task).delete(delete_task))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

/// Starts the server on the given address and returns the bound address
/// and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<(SocketAddr, JoinHandle<()>), Box<dyn std::error::Error + Send + Sync>> {
    start_server_with_state(addr, Arc::new(ServerState::new())).await
}

/// Starts the server with a pre-configured [`ServerState`].
///
/// Keep a clone of `state` to inspect or seed the collection while the
/// server runs.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<(SocketAddr, JoinHandle<()>), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "task server error");
        }
    });

    Ok((bound_addr, handle))
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// `{key}.json` → `key`.
fn record_key(file: &str) -> Option<&str> {
    file.strip_suffix(".json").filter(|key| !key.is_empty())
}

async fn list_tasks(State(state): State<Arc<ServerState>>) -> Response {
    let snapshot = state.tasks.snapshot().await;
    let body = if snapshot.is_empty() {
        Ok(b"null".to_vec())
    } else {
        serde_json::to_vec(&snapshot)
    };
    match body {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode task collection");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn put_task(
    State(state): State<Arc<ServerState>>,
    Path(file): Path<String>,
    body: Bytes,
) -> Response {
    let Some(key) = record_key(&file) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let rep = match codec::decode(&body) {
        Ok(rep) => rep,
        Err(e) => {
            tracing::warn!(key, error = %e, "rejected malformed task");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };
    if rep.identifier != key {
        tracing::warn!(key, identifier = %rep.identifier, "rejected task with mismatched identifier");
        return (StatusCode::BAD_REQUEST, "identifier does not match path").into_response();
    }

    let value = match serde_json::to_value(&rep) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(key, error = %e, "failed to store task");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let created = state.tasks.put(key, value).await;
    tracing::debug!(key, created, "stored task");

    json_response(StatusCode::OK, body.to_vec())
}

async fn delete_task(State(state): State<Arc<ServerState>>, Path(file): Path<String>) -> Response {
    let Some(key) = record_key(&file) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let existed = state.tasks.remove(key).await;
    tracing::debug!(key, existed, "deleted task");
    json_response(StatusCode::OK, b"null".to_vec())
}
