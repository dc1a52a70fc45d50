//! Serve command - run the HTTP API until a shutdown signal

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wallet_core::config::Config;
use wallet_core::services::EntryPoint;

use super::get_context;
use crate::http::{self, AppState};

pub async fn run(config: Config) -> Result<()> {
    let addr = config.server.bind_addr();
    let grace = config.server.shutdown_timeout;
    let ctx = Arc::new(get_context(config, EntryPoint::Api)?);

    let shutdown = CancellationToken::new();
    let app = http::router(AppState::new(Arc::clone(&ctx), shutdown.clone()));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        addr = %addr,
        env = %ctx.config.env,
        database = %ctx.config.database.location,
        "walletd listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(drain(shutdown.clone(), grace))
        .await
        .context("server error")?;

    shutdown.cancel();
    tracing::info!("walletd stopped");
    Ok(())
}

/// Resolves on the first shutdown signal, which stops the listener. In-flight
/// requests get `grace` to finish before the root token cancels them.
async fn drain(shutdown: CancellationToken, grace: Duration) {
    shutdown_signal().await;
    tracing::info!(grace_ms = grace.as_millis() as u64, "shutdown signal received, draining");

    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(grace) => {
                tracing::warn!("shutdown grace period elapsed, cancelling in-flight requests");
                shutdown.cancel();
            }
            _ = shutdown.cancelled() => {}
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
}
