//! `tasksync`: a local task list kept in sync with a remote REST collection.

pub mod config;
pub mod gateway;
pub mod service;
pub mod store;
pub mod tasks;
