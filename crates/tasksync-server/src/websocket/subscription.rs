//! Per-session binding to the store's mutation feed.

use tasksync_core::MutationEvent;
use tasksync_store::{FeedCursor, FeedError, TaskStore};
use tracing::debug;

/// One session's view of the live mutation feed.
///
/// Owned exclusively by its session task, which is the only caller of
/// [`recv`](Self::recv) and [`close`](Self::close). That single-owner rule
/// is what guarantees no event is delivered after `close` returns; no lock
/// is involved.
pub struct Subscription {
    cursor: Option<FeedCursor>,
}

impl Subscription {
    /// Open a cursor over all mutations committed from now on.
    ///
    /// Fails with [`FeedError::Unavailable`] once the store has shut down.
    pub fn open(store: &TaskStore) -> Result<Self, FeedError> {
        let cursor = store.watch()?;
        debug!("subscription opened");
        Ok(Self {
            cursor: Some(cursor),
        })
    }

    /// Whether the subscription still holds a live cursor.
    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    /// Await the next mutation event in commit order.
    ///
    /// After [`close`](Self::close) this returns [`FeedError::Closed`]
    /// immediately.
    pub async fn recv(&mut self) -> Result<MutationEvent, FeedError> {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.recv().await,
            None => Err(FeedError::Closed),
        }
    }

    /// Release the cursor. Idempotent; safe to call whether or not any
    /// event was ever received.
    pub fn close(&mut self) {
        if self.cursor.take().is_some() {
            debug!("subscription closed");
        }
    }
}
