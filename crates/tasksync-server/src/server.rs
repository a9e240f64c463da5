//! `TaskSyncServer`: Axum HTTP + WebSocket server wiring.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tasksync_store::TaskStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::rest;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session;
use crate::{metrics as srv_metrics, websocket};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The task store every handler and session reads and mutates.
    pub store: Arc<TaskStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Live WebSocket connection count.
    pub active_connections: Arc<AtomicUsize>,
    /// Prometheus render handle, if a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The sync server.
///
/// Holds the one long-lived store handle; sessions and REST handlers all
/// receive it through [`AppState`] rather than any process-global.
pub struct TaskSyncServer {
    config: ServerConfig,
    store: Arc<TaskStore>,
    shutdown: Arc<ShutdownCoordinator>,
    active_connections: Arc<AtomicUsize>,
    metrics: Option<PrometheusHandle>,
    start_time: Instant,
}

impl TaskSyncServer {
    /// Create a new server around an open store.
    pub fn new(config: ServerConfig, store: Arc<TaskStore>) -> Self {
        Self {
            config,
            store,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            active_connections: Arc::new(AtomicUsize::new(0)),
            metrics: None,
            start_time: Instant::now(),
        }
    }

    /// Install the global Prometheus recorder and expose `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self) -> Self {
        self.metrics = srv_metrics::install_recorder();
        self
    }

    fn state(&self) -> AppState {
        AppState {
            store: self.store.clone(),
            config: Arc::new(self.config.clone()),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
            active_connections: self.active_connections.clone(),
            metrics: self.metrics.clone(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/tasks", get(rest::list_tasks).post(rest::create_task))
            .route(
                "/tasks/{id}",
                axum::routing::put(rest::update_task).delete(rest::delete_task),
            )
            .route("/tasks/category/{category}", get(rest::list_tasks_by_category))
            .with_state(self.state())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind and start serving. Returns once the listener is accepting.
    pub async fn serve(&self) -> Result<ServerHandle, std::io::Error> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "sync server listening");

        let router = self.router();
        let token = self.shutdown.token();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(err) = result {
                warn!(%err, "server exited with error");
            }
        });

        Ok(ServerHandle {
            port: local_addr.port(),
            server,
        })
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared store handle.
    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Signal shutdown: stop accepting, invalidate the feed so every
    /// session drains, and wait for the accept loop to exit.
    pub async fn stop(&self, handle: ServerHandle) {
        self.store.shutdown();
        self.shutdown.shutdown();
        let _ = handle.server.await;
    }
}

/// Handle returned by [`TaskSyncServer::serve`].
pub struct ServerHandle {
    /// Port actually bound (useful with port 0).
    pub port: u16,
    /// The accept-loop task.
    pub server: tokio::task::JoinHandle<()>,
}

/// GET /ws — upgrade and spawn the session task.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.shutdown.is_shutting_down()
        || state.active_connections.load(Ordering::SeqCst) >= state.config.max_connections
    {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let max_message_size = state.config.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| {
            websocket::run_session(socket, session::next_session_id(), state)
        })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.active_connections.load(Ordering::SeqCst);
    Json(health::health_check(state.start_time, connections))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(ref handle) => srv_metrics::render(handle).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
