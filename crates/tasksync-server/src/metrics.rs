//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Call once at server startup before any metrics are recorded; returns
/// `None` if a recorder is already installed (e.g. in tests).
pub fn install_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("prometheus metrics recorder installed");
            Some(handle)
        }
        Err(err) => {
            info!(%err, "metrics recorder not installed");
            None
        }
    }
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Session duration seconds (histogram).
pub const WS_SESSION_DURATION_SECONDS: &str = "ws_session_duration_seconds";
/// Mutation events delivered to clients total (counter).
pub const FEED_EVENTS_DELIVERED_TOTAL: &str = "feed_events_delivered_total";
/// Sessions torn down because their cursor lagged (counter).
pub const FEED_LAGGED_SESSIONS_TOTAL: &str = "feed_lagged_sessions_total";
/// Snapshot requests served total (counter).
pub const SNAPSHOT_REQUESTS_TOTAL: &str = "snapshot_requests_total";
/// Recoverable request errors sent to clients (counter).
pub const REQUEST_ERRORS_TOTAL: &str = "request_errors_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_render() {
        // Build a recorder + handle (no global install to avoid test conflicts).
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = handle.render();
        assert!(output.is_empty() || output.contains('#') || output.contains('\n'));
    }

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            WS_CONNECTIONS_TOTAL,
            WS_DISCONNECTIONS_TOTAL,
            WS_CONNECTIONS_ACTIVE,
            WS_SESSION_DURATION_SECONDS,
            FEED_EVENTS_DELIVERED_TOTAL,
            FEED_LAGGED_SESSIONS_TOTAL,
            SNAPSHOT_REQUESTS_TOTAL,
            REQUEST_ERRORS_TOTAL,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
