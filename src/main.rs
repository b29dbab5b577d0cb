//! questlog - Game Character Backend
//!
//! Maintenance daemon for the event-sourced character store. Runs the
//! snapshot sweep and activity feed trim on a schedule; command handlers
//! are driven by the services embedding the library.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use questlog::event_store::PgEventStore;
use questlog::jobs::{JobScheduler, JobSchedulerConfig};
use questlog::repository::AggregateRepository;
use questlog::snapshot::{PgSnapshotStore, SnapshotStrategy};
use questlog::{db, Config};

/// Initialize tracing/logging
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "questlog=debug,sqlx=warn".into());

    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting questlog maintenance daemon");
    tracing::info!("Connecting to database...");

    // Create database pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    // Verify database schema
    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    let repository = Arc::new(AggregateRepository::new(
        Arc::new(PgEventStore::new(pool.clone())),
        Arc::new(PgSnapshotStore::new(pool.clone())),
        SnapshotStrategy::new(config.snapshot_config()),
    ));

    let scheduler_config = JobSchedulerConfig {
        snapshot_sweep_interval: Duration::from_secs(config.sweep_interval_secs),
        sweep_batch_size: config.sweep_batch_size,
        ..JobSchedulerConfig::default()
    };
    let scheduler = JobScheduler::with_config(pool.clone(), repository, scheduler_config);
    let scheduler_handle = scheduler.start();

    shutdown_signal().await;

    // Cleanup
    tracing::info!("Daemon shutting down...");
    scheduler_handle.abort();
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
