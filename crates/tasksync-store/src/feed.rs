//! Live mutation feed fan-out.
//!
//! One ordered stream of [`MutationEvent`]s with any number of independent
//! cursors. A cursor only observes events published after it was opened;
//! a slow cursor that falls behind observes [`FeedError::Lagged`] rather
//! than stalling publishers.

use parking_lot::RwLock;
use tasksync_core::MutationEvent;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::FeedError;

/// Events buffered per cursor before a slow reader starts lagging.
const FEED_CAPACITY: usize = 256;

/// Publisher side of the mutation feed.
///
/// The sender is dropped on invalidation so draining cursors observe
/// [`FeedError::Closed`] after the final event instead of waiting forever.
pub struct MutationFeed {
    tx: RwLock<Option<broadcast::Sender<MutationEvent>>>,
}

impl MutationFeed {
    /// Create an open feed with no cursors.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            tx: RwLock::new(Some(tx)),
        }
    }

    /// Open a cursor positioned after the most recently published event.
    pub fn subscribe(&self) -> Result<FeedCursor, FeedError> {
        match self.tx.read().as_ref() {
            Some(tx) => Ok(FeedCursor { rx: tx.subscribe() }),
            None => Err(FeedError::Unavailable),
        }
    }

    /// Publish one committed mutation to every open cursor.
    ///
    /// A feed with no cursors silently drops the event; that is not an
    /// error for the publisher. Publishing after invalidation is a no-op.
    pub fn publish(&self, event: MutationEvent) {
        if let Some(tx) = self.tx.read().as_ref() {
            match tx.send(event) {
                Ok(receivers) => debug!(receivers, "mutation published"),
                Err(_) => debug!("mutation published with no cursors open"),
            }
        }
    }

    /// Shut the feed down: pending cursors observe one final
    /// [`MutationEvent::Invalidated`] and then [`FeedError::Closed`];
    /// later `subscribe` calls fail with [`FeedError::Unavailable`].
    /// Idempotent.
    pub fn invalidate(&self) {
        if let Some(tx) = self.tx.write().take() {
            let _ = tx.send(MutationEvent::Invalidated);
        }
    }

    /// Number of currently open cursors.
    pub fn cursor_count(&self) -> usize {
        self.tx
            .read()
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }
}

impl Default for MutationFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer side of the mutation feed. Dropping the cursor closes it.
pub struct FeedCursor {
    rx: broadcast::Receiver<MutationEvent>,
}

impl FeedCursor {
    /// Await the next event in commit order.
    pub async fn recv(&mut self) -> Result<MutationEvent, FeedError> {
        match self.rx.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Err(FeedError::Lagged(skipped)),
            Err(broadcast::error::RecvError::Closed) => Err(FeedError::Closed),
        }
    }
}
