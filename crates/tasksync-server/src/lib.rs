//! # tasksync-server
//!
//! Axum HTTP + `WebSocket` server for live task synchronization.
//!
//! - REST endpoints: task CRUD, health check, Prometheus metrics
//! - `WebSocket` gateway: one session task per client, snapshot requests,
//!   live mutation delivery through a per-session feed subscription
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod rest;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{AppState, ServerHandle, TaskSyncServer};
pub use shutdown::ShutdownCoordinator;
