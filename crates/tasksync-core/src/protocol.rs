//! JSON wire protocol spoken between the server and sync clients, and the
//! translation from store mutation events into outbound messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::MutationEvent;
use crate::task::Task;

/// Machine-readable code for a request the server could not act on.
pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
/// Machine-readable code for a server-side failure answering a request.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

/// A message sent by a client over the sync socket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// Request a point-in-time snapshot of the owner's tasks.
    #[serde(rename = "INITIAL_TASKS")]
    InitialTasks {
        /// Owner whose tasks the snapshot covers.
        #[serde(rename = "userEmail")]
        user_email: String,
    },
}

impl ClientRequest {
    /// Decode a raw text frame into a request.
    ///
    /// Fails on malformed JSON, an unknown `type`, or a missing
    /// `userEmail`; the caller replies with an [`ServerMessage::Error`]
    /// and keeps the session open.
    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        serde_json::from_str(raw).map_err(RequestError::Malformed)
    }
}

/// Why a client frame could not be decoded into a request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Not valid JSON, unknown message type, or missing a required field.
    #[error("malformed request: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// A message pushed to a client over the sync socket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Snapshot reply to an `INITIAL_TASKS` request.
    #[serde(rename = "INITIAL_TASKS")]
    InitialTasks {
        /// The owner's tasks at the moment of the read.
        data: Vec<Task>,
    },
    /// A task was inserted into the collection.
    #[serde(rename = "TASK_ADDED")]
    TaskAdded {
        /// The new document.
        data: Task,
    },
    /// A task was rewritten; the payload is the full post-update document.
    #[serde(rename = "TASK_UPDATED")]
    TaskUpdated {
        /// The current document.
        data: Task,
    },
    /// A task was removed; only its identity remains.
    #[serde(rename = "TASK_DELETED")]
    TaskDeleted {
        /// Reference to the removed task.
        data: DeletedTask,
    },
    /// A recoverable error answering a specific client request.
    #[serde(rename = "ERROR")]
    Error {
        /// Code and human-readable message.
        data: ErrorBody,
    },
}

/// Identity-only payload of a `TASK_DELETED` message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedTask {
    /// Identity of the removed task.
    #[serde(rename = "_id")]
    pub id: String,
}

/// Structured error payload of an `ERROR` message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code, e.g. `INVALID_REQUEST`.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ServerMessage {
    /// Build an `ERROR` message.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            data: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

/// Map one mutation event to its outbound wire message.
///
/// Pure and stateless. Returns `None` for event kinds that are not part of
/// the client protocol; the caller treats that as end of delivery, not as
/// an error.
pub fn translate(event: &MutationEvent) -> Option<ServerMessage> {
    match event {
        MutationEvent::Inserted(task) => Some(ServerMessage::TaskAdded { data: task.clone() }),
        MutationEvent::Updated(task) => Some(ServerMessage::TaskUpdated { data: task.clone() }),
        MutationEvent::Deleted { id } => Some(ServerMessage::TaskDeleted {
            data: DeletedTask { id: id.clone() },
        }),
        MutationEvent::Invalidated => None,
    }
}
