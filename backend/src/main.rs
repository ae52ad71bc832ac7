//! Mango Surveillance Platform - Backend Server
//!
//! Plant-health surveillance for mango farms: sample-size planning and
//! timed survey sessions.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use shared::SystemClock;
use sqlx::postgres::PgPoolOptions;
use surveillance_backend::{
    create_app,
    services::{MaintenanceService, MemoryStore, PgStore, SurveillanceStore},
    AppState, Config,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mango_server=debug,surveillance_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load().context("failed to load configuration")?;

    tracing::info!("Starting Mango Surveillance Server");
    tracing::info!("Environment: {}", config.environment);

    let store: Arc<dyn SurveillanceStore> = match &config.database.url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(url)
                .await?;
            tracing::info!("Database connection established");

            // Run migrations in development
            if config.environment == "development" {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("./migrations").run(&db_pool).await?;
                tracing::info!("Migrations completed");
            }

            Arc::new(PgStore::new(db_pool))
        }
        None => {
            tracing::warn!("No database URL configured, keeping data in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, Arc::new(SystemClock), config.clone());

    // Background stale-session sweep
    let cancel = CancellationToken::new();
    let sweeper = MaintenanceService::new(
        state.store.clone(),
        state.clock.clone(),
        config.surveillance.clone(),
    );
    let sweeper_handle = tokio::spawn(sweeper.run_sweeper(cancel.clone()));

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    sweeper_handle.await?;

    Ok(())
}
