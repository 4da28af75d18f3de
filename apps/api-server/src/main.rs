//! # Petbox API Server
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Initialize tracing (RUST_LOG, default info,petbox=debug,sqlx=warn) │
//! │  2. Load + validate ServerConfig        → abort on ConfigError         │
//! │  3. Connect to SQLite & run migrations                                 │
//! │  4. Spawn ExpirySweeper + RenewalScheduler                             │
//! │  5. Serve HTTP until Ctrl+C / SIGTERM                                  │
//! │  6. Stop workers, close pool                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use petbox_api::config::CONFIG_PATH_ENV;
use petbox_api::{router, AppState, ServerConfig};
use petbox_db::Database;
use petbox_engine::{
    DeferredCaptureGateway, Engine, ExpirySweeper, PublicBucketResolver, RenewalScheduler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,petbox=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    info!("Starting Petbox API server...");

    // Load configuration
    let config_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
    let config = ServerConfig::load(config_path).context("invalid configuration")?;
    let addr = config.bind_addr()?;
    let engine_config = config.engine_config();
    info!(
        %addr,
        db_path = %config.database.path.display(),
        "Configuration loaded"
    );

    // Connect to database
    let db = Database::new(config.db_config())
        .await
        .context("failed to open database")?;
    info!("Database ready");

    // Background workers
    let (sweeper, sweeper_handle) = ExpirySweeper::new(db.clone(), engine_config.sweep_interval);
    let (renewals, renewal_handle) = RenewalScheduler::new(
        db.clone(),
        Arc::new(DeferredCaptureGateway),
        engine_config.renewal_interval,
    );
    let sweeper_task = tokio::spawn(sweeper.run());
    let renewal_task = tokio::spawn(renewals.run());

    // HTTP
    let images = Arc::new(PublicBucketResolver::new(config.images.base_url.clone()));
    let engine = Engine::new(db.clone(), &engine_config, images);
    let app = router(AppState::new(engine, db.clone()));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop workers
    for handle in [&sweeper_handle, &renewal_handle] {
        if let Err(e) = handle.shutdown().await {
            warn!(worker = handle.name(), ?e, "Worker already stopped");
        }
    }
    let _ = tokio::join!(sweeper_task, renewal_task);

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(?e, "Failed to install Ctrl+C handler");
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
                warn!(?e, "Failed to install SIGTERM handler");
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
