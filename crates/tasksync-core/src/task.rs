//! The task record and its create/update input shapes.

use serde::{Deserialize, Serialize};

/// A persisted task document as it appears on the wire.
///
/// The `_id` is assigned by the store at insert time and never changes.
/// All other fields are free text owned by the client UI; in particular
/// `category` doubles as the completion marker (clients move a task to
/// the `"Done"` category to complete it).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned identity, immutable for the life of the record.
    #[serde(rename = "_id")]
    pub id: String,
    /// Short summary line.
    pub title: String,
    /// Longer free-text body.
    pub description: String,
    /// Grouping label; `"Done"` marks completion by convention.
    pub category: String,
    /// Urgency ordinal, e.g. `"High"`, `"Medium"`, `"Low"`.
    pub priority: String,
    /// Owner identity, set once at creation.
    pub user_email: String,
}

/// Fields a client supplies when creating a task. The store assigns `_id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Short summary line.
    pub title: String,
    /// Longer free-text body.
    pub description: String,
    /// Grouping label.
    pub category: String,
    /// Urgency ordinal.
    pub priority: String,
    /// Owner identity.
    pub user_email: String,
}

/// Partial update for an existing task. `None` fields are left untouched.
/// Owner and identity are not patchable.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    /// New title, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New category, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// New priority, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl TaskPatch {
    /// True when no field is set; a no-op update.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.priority.is_none()
    }
}
