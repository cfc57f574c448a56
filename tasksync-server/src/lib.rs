//! `tasksync-server`: a small REST endpoint for tasksync clients.
//!
//! Serves one keyed task collection over HTTP. Used for local development
//! and as the remote in integration tests.

pub mod config;
pub mod server;
pub mod store;
