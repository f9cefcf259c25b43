//! HTTP server: shared context, router, middleware and route handlers.

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;

use anistream_core::config::Config;
use anistream_core::{Error, Result};

use self::context::AppContext;

/// Start the anistream server.
///
/// Returns once a shutdown signal has been received and in-flight requests
/// have drained.
pub async fn start(config: Config) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid server address: {e}")))?;

    let ctx = AppContext::from_config(config)?;
    let cancel = ctx.shutdown.clone();
    let app = router::build_router(ctx);

    tracing::info!("Starting server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for SIGINT, SIGTERM or `cancel`, then cancel every in-flight request.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
    // Open relays would otherwise hold graceful shutdown forever.
    cancel.cancel();
}
