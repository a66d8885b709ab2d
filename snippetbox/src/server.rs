//! Server startup and shutdown

use crate::auth::PasswordService;
use crate::config::{AppConfig, SessionBackend};
use crate::middleware::session::SessionLayer;
use crate::models::{PgSnippetRepository, PgUserRepository};
use crate::routes::{self, RouterConfig};
use crate::state::AppState;
use crate::store::{spawn_cleanup_task, MemoryStore, PostgresStore, SessionStore};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Connect to the database, build the router and serve until shutdown
///
/// # Errors
///
/// Returns error if the database, migrations or listener fail.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.dsn)
        .await
        .context("Failed to connect to database")?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;
    }

    let passwords = PasswordService::with_params(
        config.password.memory_cost,
        config.password.time_cost,
        config.password.parallelism,
    )
    .context("Invalid password hashing parameters")?;

    let state = AppState::new(
        Arc::new(PgUserRepository::new(pool.clone(), passwords)),
        Arc::new(PgSnippetRepository::new(pool.clone())),
    );

    let store: Arc<dyn SessionStore> = match config.session.store {
        SessionBackend::Memory => Arc::new(MemoryStore::new()),
        SessionBackend::Postgres => Arc::new(PostgresStore::new(pool.clone())),
    };
    let cleanup = match config.session.cleanup_interval() {
        Some(interval) => Some(spawn_cleanup_task(store.clone(), interval)),
        None => {
            tracing::warn!("Expired session cleanup disabled");
            None
        }
    };
    let sessions = SessionLayer::with_config(store, config.session.middleware_config());

    let app = routes::router(
        state,
        sessions,
        &RouterConfig {
            static_dir: config.server.static_dir.clone(),
            debug: config.debug,
            csrf: config.session.csrf_config(),
        },
    );

    let listener = TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.addr))?;

    tracing::info!(addr = %config.server.addr, "Starting server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(cleanup) = cleanup {
        cleanup.abort();
    }
    pool.close().await;
    tracing::info!("Gracefully shutdown");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!("Failed to listen for SIGTERM: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
