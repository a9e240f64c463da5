//! # tasksync-store
//!
//! SQLite-backed task persistence plus the live mutation feed that sync
//! sessions subscribe to. Every committed create/update/delete publishes
//! exactly one [`MutationEvent`](tasksync_core::MutationEvent) to all open
//! feed cursors, in commit order.

#![deny(unsafe_code)]

pub mod database;
pub mod error;
pub mod feed;
pub mod schema;
pub mod store;

pub use database::Database;
pub use error::{FeedError, StoreError};
pub use feed::{FeedCursor, MutationFeed};
pub use store::TaskStore;
