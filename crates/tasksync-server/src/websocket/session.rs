//! WebSocket session lifecycle: one task per connected client, from
//! upgrade through disconnect.

use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tasksync_core::{protocol, ServerMessage};
use tasksync_store::FeedError;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::handler::handle_frame;
use super::subscription::Subscription;
use crate::metrics::{
    FEED_EVENTS_DELIVERED_TOTAL, FEED_LAGGED_SESSIONS_TOTAL, WS_CONNECTIONS_ACTIVE,
    WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL, WS_SESSION_DURATION_SECONDS,
};
use crate::server::AppState;

/// Run a sync session for one connected client.
///
/// Opens the feed subscription once at connect time, then drives a single
/// select loop over four signals: the next client frame, the next feed
/// event, the heartbeat tick, and server shutdown. Whatever ends the loop,
/// the subscription is closed before the task returns.
#[instrument(skip_all, fields(session_id = %session_id))]
pub async fn run_session(ws: WebSocket, session_id: String, state: AppState) {
    let started = Instant::now();
    info!("client connected");
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
    let _ = state
        .active_connections
        .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

    let mut subscription = match Subscription::open(&state.store) {
        Ok(sub) => sub,
        Err(err) => {
            // Fatal to this session only; the client may reconnect.
            warn!(%err, "could not open feed subscription");
            close_socket(ws).await;
            finish(&state, started);
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = ws.split();

    let ping_every = Duration::from_secs(state.config.heartbeat_interval_secs);
    let pong_timeout = Duration::from_secs(state.config.heartbeat_timeout_secs);
    let mut ping_interval = tokio::time::interval(ping_every);
    // Skip the immediate first tick
    let _ = ping_interval.tick().await;
    let mut last_pong = Instant::now();

    let shutdown = state.shutdown.token();

    let close_reason = loop {
        tokio::select! {
            frame = ws_rx.next() => {
                match frame {
                    None => break "client disconnected",
                    Some(Err(err)) => {
                        debug!(%err, "transport error");
                        break "transport error";
                    }
                    Some(Ok(msg)) => {
                        let text = match msg {
                            Message::Text(ref t) => Some(t.to_string()),
                            Message::Binary(ref data) => match std::str::from_utf8(data) {
                                Ok(s) => Some(s.to_string()),
                                Err(_) => {
                                    debug!(len = data.len(), "ignoring non-UTF8 binary frame");
                                    None
                                }
                            },
                            Message::Close(_) => break "client sent close frame",
                            Message::Ping(_) | Message::Pong(_) => {
                                last_pong = Instant::now();
                                None
                            }
                        };
                        let Some(text) = text else { continue };

                        let reply = handle_frame(&text, &state.store);
                        if !send(&mut ws_tx, &reply).await {
                            break "write failed";
                        }
                    }
                }
            }
            event = subscription.recv() => {
                match event {
                    Ok(event) => match protocol::translate(&event) {
                        Some(msg) => {
                            if !send(&mut ws_tx, &msg).await {
                                break "write failed";
                            }
                            counter!(FEED_EVENTS_DELIVERED_TOTAL).increment(1);
                        }
                        // Invalidated: the feed is shutting down
                        None => break "feed invalidated",
                    },
                    Err(FeedError::Lagged(skipped)) => {
                        warn!(skipped, "session fell behind the feed");
                        counter!(FEED_LAGGED_SESSIONS_TOTAL).increment(1);
                        break "feed lagged";
                    }
                    Err(err) => {
                        debug!(%err, "feed ended");
                        break "feed closed";
                    }
                }
            }
            _ = ping_interval.tick() => {
                if last_pong.elapsed() > pong_timeout {
                    warn!("client unresponsive for {pong_timeout:?}, disconnecting");
                    break "heartbeat timeout";
                }
                if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                    break "write failed";
                }
            }
            () = shutdown.cancelled() => break "server shutdown",
        }
    };

    // The subscription must not outlive the session, whatever ended it.
    subscription.close();
    let _ = ws_tx.close().await;

    info!(close_reason, "client disconnected");
    finish(&state, started);
}

/// Serialize and send one message; false means the socket is dead.
async fn send<S>(ws_tx: &mut S, msg: &ServerMessage) -> bool
where
    S: SinkExt<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => ws_tx.send(Message::Text(json.into())).await.is_ok(),
        Err(err) => {
            warn!(%err, "failed to serialize outbound message");
            true
        }
    }
}

async fn close_socket(mut ws: WebSocket) {
    let _ = ws.close().await;
}

fn finish(state: &AppState, started: Instant) {
    let _ = state
        .active_connections
        .fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_SESSION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
}

/// Generate a session identifier for logging.
pub fn next_session_id() -> String {
    format!("conn-{}", Uuid::now_v7())
}
