//! Error types for persistence and the mutation feed.

/// Failure in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Database(String),

    /// The named record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem failure while opening the database.
    #[error("IO error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Failure observing the live mutation feed.
///
/// All variants are fatal to the observing session only; the feed itself
/// and other sessions are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The feed source has shut down; no cursor can be opened.
    #[error("mutation feed unavailable")]
    Unavailable,

    /// The cursor fell behind and missed the given number of events;
    /// its view is no longer gap-free.
    #[error("cursor lagged, skipped {0} events")]
    Lagged(u64),

    /// The feed closed while the cursor was waiting.
    #[error("mutation feed closed")]
    Closed,
}
