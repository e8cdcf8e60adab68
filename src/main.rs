//! Cache Layer server
//!
//! Serves the operational HTTP surface over the selected backend.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_layer::api::create_router;
use cache_layer::lifecycle::{
    disconnect_with_deadline, on_shutdown, serve_with_drain_deadline, shutdown_signal, Shutdown,
    DISCONNECT_DEADLINE, DRAIN_DEADLINE,
};
use cache_layer::{AppState, Config};

/// Main entry point for the cache layer server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Select and connect the backend
/// 4. Start HTTP server on configured port
/// 5. On SIGINT/SIGTERM, drain requests for a bounded time and disconnect the backend
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_layer=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cache Layer");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, rate_limit_max={}, rate_limit_window={}s",
        config.server_port, config.rate_limit_max, config.rate_limit_window
    );

    let state = AppState::from_config(&config);
    let driver = state.client.connect().await;
    info!(backend = %driver.kind(), "Cache backend ready");

    let client = state.client.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(on_shutdown(&shutdown));

    let served = serve_with_drain_deadline(server, &shutdown, DRAIN_DEADLINE).await;

    disconnect_with_deadline(&client, DISCONNECT_DEADLINE).await;
    served.context("server error")?;
    info!("Server shutdown complete");
    Ok(())
}
