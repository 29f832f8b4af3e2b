//! lanwatch - LAN service-health dashboard backend.
//!
//! Polls a fixed set of HTTP/ping endpoints and GPU telemetry, caches
//! sweep results, persists check history plus a ticket/idea tracker, and
//! serves a JSON REST API.

mod cache;
mod check;
mod config;
mod db;
mod gpu;
mod heartbeat;
mod monitor;
mod registry;
mod uptime;
mod web;

use config::ServerConfig;
use db::Store;
use monitor::Monitor;
use registry::Registry;
use web::Server;

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ALERT_RETENTION_DAYS: i64 = 7;
const ALERT_PRUNE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lanwatch=info".parse()?),
        )
        .init();

    let cfg = ServerConfig::load();
    tracing::info!("Starting lanwatch on port {}...", cfg.http_port);

    // Durable storage must come up, or the process exits non-zero.
    std::fs::create_dir_all(&cfg.data_dir)?;
    let store = Store::new(cfg.db_path())?;
    tracing::info!("Database initialized at {}", cfg.db_path().display());

    let registry = Registry::builtin();
    tracing::info!("Monitoring {} targets", registry.targets().len());
    let monitor = Arc::new(Monitor::new(registry, store.clone()));

    heartbeat::spawn(store.clone());
    spawn_alert_pruner(store);

    let server = Server::new(cfg, monitor);
    server.start().await?;

    Ok(())
}

fn spawn_alert_pruner(store: Store) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ALERT_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            match store.prune_alerts(ALERT_RETENTION_DAYS) {
                Ok(0) => {}
                Ok(removed) => tracing::info!("Pruned {} old alerts", removed),
                Err(e) => tracing::error!("Alert pruning failed: {}", e),
            }
        }
    });
}
