//! Learning-roadmap generation service
//!
//! Single-binary service that:
//! 1. Loads multiple generation API keys into the rate-limited pool
//! 2. Serves roadmap generation and course expansion over HTTP
//! 3. Persists to Postgres when configured, a local JSON file otherwise

mod config;
mod error;
mod metrics;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use keypool::KeyPool;
use roadmap::Generator;
use store::{LocalStore, Storage};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::routes::{AppState, build_router};

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting roadmap-api");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        model = %config.gemini.model,
        keys = config.api_keys.len(),
        database = config.database_url.is_some(),
        "configuration loaded"
    );

    let pool = Arc::new(
        KeyPool::new(config.api_keys.clone(), config.pool_config())
            .context("failed to build key pool")?,
    );

    let client = gemini::Client::new(reqwest::Client::new(), config.client_config());
    let generator = Arc::new(Generator::gemini(
        pool.clone(),
        client,
        config.batch_options(),
    ));

    let backend = match &config.database_url {
        Some(url) => match store::backend::create_pool(url.expose_str()).await {
            Ok(db) => {
                store::backend::migrate(&db)
                    .await
                    .context("database migration failed")?;
                info!("database connected");
                Some(db)
            }
            Err(e) => {
                warn!(error = %e, "database unreachable at startup, continuing on local store");
                None
            }
        },
        None => None,
    };

    let local = LocalStore::load(config.storage.fallback_path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to open local store at {}",
                config.storage.fallback_path.display()
            )
        })?;
    let storage = Arc::new(Storage::new(backend, local));

    let state = AppState {
        pool,
        generator,
        storage,
        prometheus,
    };
    let app = build_router(state, config.server.max_connections);

    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.server.listen_addr))?;

    info!(addr = %config.server.listen_addr, "accepting requests");

    // Graceful shutdown: stop accepting on SIGTERM/SIGINT, then race the
    // drain against DRAIN_TIMEOUT so a slow client cannot block exit.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
