//! REST remote over HTTP(S).
//!
//! Addresses the collection as `{base}/tasks.json` and single records as
//! `{base}/tasks/{identifier}.json`. Writes use `PUT` (replace-or-create),
//! removals use `DELETE`.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tasksync_proto::task::TaskId;
use url::Url;

use super::{Remote, TransportError};

/// [`Remote`] that talks to the REST endpoint with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base: Url,
}

impl HttpRemote {
    /// Creates a remote rooted at `base_url`.
    ///
    /// `timeout` bounds each request. A missing trailing slash on the base
    /// path is added so relative resource paths nest under it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if `base_url` does not parse,
    /// or [`TransportError::Client`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { client, base })
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// URL of the whole collection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if the URL cannot be formed.
    pub fn collection_url(&self) -> Result<Url, TransportError> {
        Ok(self.base.join("tasks.json")?)
    }

    /// URL of the record keyed by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if the URL cannot be formed.
    pub fn task_url(&self, id: &TaskId) -> Result<Url, TransportError> {
        Ok(self.base.join(&format!("tasks/{id}.json"))?)
    }
}

/// Maps a `reqwest` send failure onto the transport taxonomy.
fn classify(error: &reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Unreachable(error.to_string())
    } else {
        TransportError::Client(error.to_string())
    }
}

/// Sends `request` and returns the body of a successful response.
async fn execute(request: reqwest::RequestBuilder) -> Result<Vec<u8>, TransportError> {
    let response = request.send().await.map_err(|e| classify(&e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()));
    }

    let body = response.bytes().await.map_err(|e| classify(&e))?;
    Ok(body.to_vec())
}

impl Remote for HttpRemote {
    async fn fetch_collection(&self) -> Result<Vec<u8>, TransportError> {
        let url = self.collection_url()?;
        tracing::debug!(%url, "GET task collection");
        execute(self.client.get(url)).await
    }

    async fn put(&self, id: &TaskId, body: Vec<u8>) -> Result<(), TransportError> {
        let url = self.task_url(id)?;
        tracing::debug!(%url, "PUT task");
        let request = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        execute(request).await.map(drop)
    }

    async fn delete(&self, id: &TaskId) -> Result<(), TransportError> {
        let url = self.task_url(id)?;
        tracing::debug!(%url, "DELETE task");
        execute(self.client.delete(url)).await.map(drop)
    }
}
