//! # StockaDoodle API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         API Server Startup                              │
//! │                                                                         │
//! │  init_tracing ──► ApiConfig::load ──► Database::new (+ migrations)     │
//! │                                             │                           │
//! │                                             ▼                           │
//! │                              bootstrap admin (empty user table)         │
//! │                                             │                           │
//! │                                             ▼                           │
//! │  Client ───► HTTP (5000) ───► /api/v1 router ───► SQLite               │
//! │                                                                         │
//! │  Ctrl+C / SIGTERM ──► graceful shutdown ──► pool closed                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::Context;
use stockadoodle_api::auth::LogDelivery;
use stockadoodle_api::{bootstrap, build_router, ApiConfig, AppState};
use stockadoodle_db::{Database, DbConfig};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting StockaDoodle API server...");

    // Load configuration
    let config = ApiConfig::load().context("Invalid configuration")?;
    info!(
        addr = %config.listen_addr(),
        database = %config.database_path,
        "Configuration loaded"
    );
    if config.uses_dev_secret() {
        warn!("JWT_SECRET not set, using the development secret");
    }

    // Open database (runs migrations)
    let db_config = DbConfig::new(&config.database_path).max_connections(config.db_max_connections);
    let db = Database::new(db_config)
        .await
        .context("Failed to open database")?;
    info!("Database ready");

    if let Some(admin) = &config.bootstrap_admin {
        if bootstrap::ensure_admin(&db, admin)
            .await
            .context("Failed to create bootstrap admin")?
            .is_none()
        {
            info!("Users already exist, bootstrap admin skipped");
        }
    }

    let listener = tokio::net::TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr()))?;
    info!(addr = %config.listen_addr(), "Starting HTTP server");

    let state = AppState::new(db.clone(), config, Arc::new(LogDelivery));
    let router = build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Verbose debugging
/// - `RUST_LOG=info` - Normal operation (default)
/// - `RUST_LOG=warn` - Warnings only
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockadoodle=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
