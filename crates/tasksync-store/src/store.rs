//! Task CRUD that publishes one feed event per committed mutation.
//!
//! All SQL runs through [`Database::with_conn`]; IDs are time-ordered
//! `uuid::Uuid::now_v7()` values with a `task-` prefix.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tasksync_core::{MutationEvent, NewTask, Task, TaskPatch};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{FeedError, StoreError};
use crate::feed::{FeedCursor, MutationFeed};

/// Generate a prefixed UUID v7 ID.
fn generate_id() -> String {
    format!("task-{}", Uuid::now_v7())
}

/// Current UTC timestamp as ISO 8601 string.
fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn task_from_row(row: &Row<'_>) -> Result<Task, rusqlite::Error> {
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        priority: row.get("priority")?,
        user_email: row.get("user_email")?,
    })
}

/// The shared task collection plus its live mutation feed.
///
/// One instance per process, shared as `Arc<TaskStore>`. Mutations commit
/// to SQLite first; the feed event is published only after the commit
/// succeeds, so cursors never observe a mutation that did not persist.
pub struct TaskStore {
    db: Database,
    feed: MutationFeed,
}

impl TaskStore {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            db: Database::open(path)?,
            feed: MutationFeed::new(),
        })
    }

    /// In-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            db: Database::in_memory()?,
            feed: MutationFeed::new(),
        })
    }

    /// Open a cursor over all mutations committed after this call.
    pub fn watch(&self) -> Result<FeedCursor, FeedError> {
        self.feed.subscribe()
    }

    /// Number of open feed cursors.
    pub fn watcher_count(&self) -> usize {
        self.feed.cursor_count()
    }

    /// Shut the feed down ahead of process exit. Cursors drain and close;
    /// the SQLite handle stays usable for any in-flight reads.
    pub fn shutdown(&self) {
        info!("task store feed invalidated");
        self.feed.invalidate();
    }

    /// Insert a new task and publish [`MutationEvent::Inserted`].
    pub fn create(&self, new: &NewTask) -> Result<Task, StoreError> {
        let id = generate_id();
        let now = now_iso();

        let task = self.db.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO tasks (id, title, description, category, priority, user_email,
                 created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    id,
                    new.title,
                    new.description,
                    new.category,
                    new.priority,
                    new.user_email,
                    now,
                ],
            )?;
            Self::fetch(conn, &id)?.ok_or_else(|| StoreError::NotFound(id.clone()))
        })?;

        debug!(task_id = %task.id, "task created");
        self.feed.publish(MutationEvent::Inserted(task.clone()));
        Ok(task)
    }

    /// Fetch one task by ID.
    pub fn get(&self, id: &str) -> Result<Option<Task>, StoreError> {
        self.db.with_conn(|conn| Self::fetch(conn, id))
    }

    /// All tasks belonging to an owner, oldest first.
    pub fn find_by_owner(&self, user_email: &str) -> Result<Vec<Task>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE user_email = ?1 ORDER BY created_at, id",
            )?;
            let tasks = stmt
                .query_map(params![user_email], task_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }

    /// An owner's tasks in one category, oldest first.
    pub fn find_by_owner_and_category(
        &self,
        user_email: &str,
        category: &str,
    ) -> Result<Vec<Task>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM tasks WHERE user_email = ?1 AND category = ?2
                 ORDER BY created_at, id",
            )?;
            let tasks = stmt
                .query_map(params![user_email, category], task_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tasks)
        })
    }

    /// Apply a partial update and publish [`MutationEvent::Updated`] with
    /// the full post-update document. Returns `None` if the task does not
    /// exist. An empty patch is a read, not a mutation; nothing is
    /// published.
    pub fn update(&self, id: &str, patch: &TaskPatch) -> Result<Option<Task>, StoreError> {
        if patch.is_empty() {
            return self.get(id);
        }

        let updated = self.db.with_conn(|conn| {
            // Build dynamic SET clause
            let mut sets: Vec<String> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(ref title) = patch.title {
                sets.push("title = ?".to_string());
                values.push(Box::new(title.clone()));
            }
            if let Some(ref desc) = patch.description {
                sets.push("description = ?".to_string());
                values.push(Box::new(desc.clone()));
            }
            if let Some(ref category) = patch.category {
                sets.push("category = ?".to_string());
                values.push(Box::new(category.clone()));
            }
            if let Some(ref priority) = patch.priority {
                sets.push("priority = ?".to_string());
                values.push(Box::new(priority.clone()));
            }

            sets.push("updated_at = ?".to_string());
            values.push(Box::new(now_iso()));
            values.push(Box::new(id.to_string()));

            let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
            let params_refs: Vec<&dyn rusqlite::types::ToSql> =
                values.iter().map(AsRef::as_ref).collect();
            let changed = conn.execute(&sql, params_refs.as_slice())?;

            if changed == 0 {
                return Ok(None);
            }
            Self::fetch(conn, id)
        })?;

        if let Some(ref task) = updated {
            debug!(task_id = %task.id, "task updated");
            self.feed.publish(MutationEvent::Updated(task.clone()));
        }
        Ok(updated)
    }

    /// Delete a task and publish [`MutationEvent::Deleted`]. Returns
    /// whether a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let changed = self
            .db
            .with_conn(|conn| Ok(conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?))?;

        let deleted = changed > 0;
        if deleted {
            debug!(task_id = %id, "task deleted");
            self.feed.publish(MutationEvent::Deleted { id: id.to_string() });
        }
        Ok(deleted)
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<Task>, StoreError> {
        let task = conn
            .query_row("SELECT * FROM tasks WHERE id = ?1", params![id], task_from_row)
            .optional()?;
        Ok(task)
    }
}
