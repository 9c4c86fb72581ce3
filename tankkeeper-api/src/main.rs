//! # Tankkeeper API Server
//!
//! Serves the fish, tank and user operation catalogue over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/tankkeeper JWT_SECRET=... cargo run -p tankkeeper-api
//! STORAGE_BACKEND=memory JWT_SECRET=... cargo run -p tankkeeper-api
//! ```

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tankkeeper_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat, StorageBackend},
};
use tankkeeper_shared::db::{migrations, pool};
use tankkeeper_shared::store::{DataStore, MemoryStore, PostgresStore};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "tankkeeper_api=debug,tankkeeper_shared=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        storage = config.storage.as_str(),
        "Tankkeeper API server starting"
    );

    let (store, pg_pool) = open_store(&config).await?;
    let bind_address = config.bind_address();
    let app = build_router(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!(address = %bind_address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pg_pool) = pg_pool {
        pool::close_pool(&pg_pool).await;
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

/// Opens the configured store; the pool is returned so it can be closed on shutdown
async fn open_store(config: &Config) -> anyhow::Result<(Arc<dyn DataStore>, Option<PgPool>)> {
    match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory store, data will not survive a restart");
            let store: Arc<dyn DataStore> = Arc::new(MemoryStore::new());
            Ok((store, None))
        }
        StorageBackend::Postgres => {
            let url = config
                .database
                .url
                .clone()
                .context("DATABASE_URL is required for the postgres backend")?;

            migrations::ensure_database_exists(&url)
                .await
                .context("Failed to create database")?;

            let pg_pool = pool::create_pool(
                pool::DatabaseConfig::new(url).with_max_connections(config.database.max_connections),
            )
            .await
            .context("Failed to connect to database")?;

            migrations::run_migrations(&pg_pool)
                .await
                .context("Failed to run migrations")?;

            let store: Arc<dyn DataStore> = Arc::new(PostgresStore::new(pg_pool.clone()));
            Ok((store, Some(pg_pool)))
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
