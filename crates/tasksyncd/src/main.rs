//! # tasksyncd
//!
//! TaskSync server binary: opens the task store and starts the
//! HTTP/WebSocket sync server.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tasksync_server::{ServerConfig, TaskSyncServer};
use tasksync_store::TaskStore;
use tracing_subscriber::EnvFilter;

/// TaskSync server.
#[derive(Parser, Debug)]
#[command(name = "tasksyncd", about = "Live task synchronization server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "5000")]
    port: u16,

    /// Path to the `SQLite` database.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Maximum concurrent WebSocket connections.
    #[arg(long)]
    max_connections: Option<usize>,
}

impl Cli {
    fn default_db_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".tasksync").join("tasks.db")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();

    let db_path = args.db_path.unwrap_or_else(Cli::default_db_path);
    let store =
        Arc::new(TaskStore::open(&db_path).context("Failed to open task database")?);

    let mut config = ServerConfig {
        host: args.host,
        port: args.port,
        ..ServerConfig::default()
    };
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }

    let server = TaskSyncServer::new(config, store).with_metrics();
    let handle = server.serve().await.context("Failed to bind server")?;

    tracing::info!(port = handle.port, "tasksyncd listening");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server.stop(handle).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
