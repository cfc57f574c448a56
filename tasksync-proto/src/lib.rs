//! Task data model and wire format shared by the tasksync client and server.

pub mod codec;
pub mod task;
