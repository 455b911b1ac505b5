//! HTTP surface: FAQ answers and price lookups over shared, read-only state.

pub mod handlers;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::fact::FactStore;
use crate::core::price::PriceSource;

/// Shared application state. Both fields are immutable after startup, so
/// handlers read them without locking.
#[derive(Clone)]
pub struct AppState {
    pub facts: Arc<FactStore>,
    pub prices: Arc<dyn PriceSource>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/faq", get(handlers::faq))
        .route("/stock", post(handlers::stock))
        .route("/crypto", post(handlers::crypto))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    serve_with_shutdown(listener, state, shutdown_signal()).await
}

pub async fn serve_with_shutdown<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
