//! Resilient Gateway - local proxy over a remote HTTP API
//!
//! Forwards `/proxy/*` through retry, circuit breaking and response caching,
//! and serves admin endpoints for the resilience state.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resilient_gateway::{create_router, spawn_cleanup_task, AppState, Config};

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the HTTP transport and resilient client
/// 4. Start background expiry sweep
/// 5. Serve the router until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resilient_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resilient Gateway");

    let config = Config::from_env();
    info!(
        "Configuration loaded: upstream={}, port={}, cache_max_entries={}, max_retries={}, failure_threshold={}",
        config.upstream_base_url,
        config.server_port,
        config.cache_max_entries,
        config.max_retries,
        config.failure_threshold
    );

    let state = AppState::from_config(&config).context("failed to build HTTP transport")?;

    let cleanup_handle = spawn_cleanup_task(state.context().cache.clone(), config.cleanup_interval);
    info!("Background expiry sweep started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Gateway listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then aborts the sweep task.
async fn shutdown_signal(cleanup_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cleanup_handle.abort();
    warn!("Expiry sweep aborted");
}
