//! Store mutation events observed through a feed cursor.

use crate::task::Task;

/// One committed mutation of the task collection.
///
/// Events are observed in commit order. Insert and update carry the full
/// post-mutation document; delete carries identity only, since the record
/// no longer exists when the event is delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationEvent {
    /// A new task was inserted.
    Inserted(Task),
    /// An existing task was rewritten; the payload is the full current state.
    Updated(Task),
    /// A task was removed.
    Deleted {
        /// Identity of the removed task.
        id: String,
    },
    /// The feed source is shutting down; no further events will follow.
    Invalidated,
}

impl MutationEvent {
    /// Identity of the affected task, if the event names one.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Inserted(task) | Self::Updated(task) => Some(&task.id),
            Self::Deleted { id } => Some(id),
            Self::Invalidated => None,
        }
    }
}
