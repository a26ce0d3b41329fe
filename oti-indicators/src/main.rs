//! oti-indicators - Indicator ingestion and versioning service
//!
//! Serves the indicator store over HTTP, loads uploaded indicator files and
//! hands calculation jobs to the external worker through the dispatch relay.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use oti_common::config::{resolve_root_folder, ServiceConfig, ROOT_FOLDER_ENV};
use oti_common::db::{init_database, DatabaseOptions};
use oti_common::engine::QueueDispatcher;
use oti_indicators::relay::run_relay;
use oti_indicators::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};

/// Command-line arguments for oti-indicators
#[derive(Parser, Debug)]
#[command(name = "oti-indicators")]
#[command(about = "Indicator ingestion and versioning service")]
#[command(version)]
struct Args {
    /// Root folder holding the indicator database
    #[arg(short, long)]
    root_folder: Option<String>,

    /// Service config file (defaults to the platform config location)
    #[arg(short, long, env = "OTI_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,oti_indicators=debug,tower_http=info".into()),
        )
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting oti-indicators v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config = ServiceConfig::load(args.config.as_deref()).context("Failed to load config")?;
    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);
    info!("Root folder: {}", root_folder.display());

    let db_path = config.database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let options = DatabaseOptions {
        busy_timeout: Duration::from_millis(config.busy_timeout_ms),
        ..DatabaseOptions::default()
    };
    let pool = match init_database(&db_path, &options).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let (dispatcher, receiver) = QueueDispatcher::channel(config.dispatch_queue_capacity);
    match &config.worker_url {
        Some(url) => info!("Dispatching indicator jobs to {}", url),
        None => info!("No worker_url configured; indicator jobs will not be calculated"),
    }
    tokio::spawn(run_relay(receiver, config.worker_url.clone()));

    let state = AppState::new(pool.clone(), Arc::new(dispatcher), config.max_lock_wait_ms);
    let app = build_router(state);

    let bind_address = args.bind.unwrap_or(config.bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("oti-indicators listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
