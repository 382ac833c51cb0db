//! HTTP server initialization and runtime setup.
//!
//! Handles the record store, resolution cache, click worker and Axum server
//! lifecycle.

use crate::config::{Config, StorageBackend};
use crate::domain::click_event::ClickRecorder;
use crate::domain::click_worker::run_click_worker;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::ResolutionCache;
use crate::infrastructure::persistence::{InMemoryLinkRepository, PgLinkRepository};
use crate::routes::app_router;
use crate::state::AppState;
use crate::utils::clock::{Clock, SystemClock};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// How long shutdown waits for queued clicks to be persisted.
const CLICK_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - The record store (PostgreSQL with migrations, or in-memory)
/// - The resolution cache and its sweep task
/// - Background click worker
/// - Axum HTTP server with graceful shutdown
///
/// On shutdown the click queue is drained before the cache sweep is stopped.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let repository = build_repository(&config).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(ResolutionCache::new(config.cache_ttl(), clock.clone()));
    cache.start();

    let (click_recorder, click_rx) = ClickRecorder::channel(config.click_queue_capacity);
    let worker = tokio::spawn(run_click_worker(
        click_rx,
        repository.clone(),
        config.click_worker_concurrency,
    ));
    info!("Click worker started");

    let state = AppState::new(
        repository,
        cache.clone(),
        clock,
        click_recorder,
        &config.service_settings(),
    );

    let app = app_router(state);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last click senders; the worker now drains and exits.
    match tokio::time::timeout(CLICK_DRAIN_TIMEOUT, worker).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Click worker failed: {}", e),
        Err(_) => warn!(
            "Click worker did not drain within {}s, pending clicks are lost",
            CLICK_DRAIN_TIMEOUT.as_secs()
        ),
    }

    cache.stop().await;
    info!("Server stopped");

    Ok(())
}

/// Creates the record store selected by `STORAGE_BACKEND`.
async fn build_repository(config: &Config) -> Result<Arc<dyn LinkRepository>> {
    match config.storage_backend {
        StorageBackend::Memory => {
            warn!("Using in-memory record store, links are lost on restart");
            Ok(Arc::new(InMemoryLinkRepository::new()))
        }
        StorageBackend::Postgres => {
            let pool = connect_database(config).await?;
            Ok(Arc::new(PgLinkRepository::new(Arc::new(pool))))
        }
    }
}

/// Opens the connection pool and applies pending migrations.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is missing, the database is
/// unreachable, or a migration fails.
pub async fn connect_database(config: &Config) -> Result<PgPool> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required for the postgres backend")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(url)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;

    Ok(pool)
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
