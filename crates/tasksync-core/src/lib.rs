//! # tasksync-core
//!
//! Foundation types for the task synchronization engine: the task record,
//! store mutation events, and the JSON wire protocol spoken over WebSocket.

#![deny(unsafe_code)]

pub mod event;
pub mod protocol;
pub mod task;

pub use event::MutationEvent;
pub use protocol::{translate, ClientRequest, ServerMessage};
pub use task::{NewTask, Task, TaskPatch};
