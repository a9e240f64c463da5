//! Decode one client frame and produce the reply message.

use metrics::counter;
use tasksync_core::protocol::{self, ClientRequest, ServerMessage};
use tasksync_store::TaskStore;
use tracing::{debug, warn};

use crate::metrics::{REQUEST_ERRORS_TOTAL, SNAPSHOT_REQUESTS_TOTAL};

/// Handle one text frame from a client.
///
/// Always produces a reply: either the requested snapshot or an `ERROR`
/// message. Request failures are recoverable by design; the caller keeps
/// the session open either way.
pub fn handle_frame(raw: &str, store: &TaskStore) -> ServerMessage {
    let request = match ClientRequest::parse(raw) {
        Ok(request) => request,
        Err(err) => {
            debug!(%err, "dropping malformed client frame");
            counter!(REQUEST_ERRORS_TOTAL).increment(1);
            return ServerMessage::error(protocol::INVALID_REQUEST, err.to_string());
        }
    };

    match request {
        ClientRequest::InitialTasks { user_email } => {
            if user_email.trim().is_empty() {
                counter!(REQUEST_ERRORS_TOTAL).increment(1);
                return ServerMessage::error(
                    protocol::INVALID_REQUEST,
                    "userEmail must not be empty",
                );
            }
            match store.find_by_owner(&user_email) {
                Ok(tasks) => {
                    counter!(SNAPSHOT_REQUESTS_TOTAL).increment(1);
                    debug!(owner = %user_email, count = tasks.len(), "snapshot served");
                    ServerMessage::InitialTasks { data: tasks }
                }
                Err(err) => {
                    warn!(%err, "snapshot read failed");
                    counter!(REQUEST_ERRORS_TOTAL).increment(1);
                    ServerMessage::error(protocol::INTERNAL_ERROR, "failed to load tasks")
                }
            }
        }
    }
}
