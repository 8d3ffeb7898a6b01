//! HTTP surface: the HTML page, `POST /agent` and a health probe.

mod dto;
mod error;
mod routes;
mod state;

pub use dto::{AgentRequest, AgentResponse, ErrorResponse};
pub use error::{ApiError, ServerError};
pub use state::ServerState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::NoteAgent;

/// Build the application router around a shared assistant.
pub fn router(agent: Arc<NoteAgent>) -> Router {
    Router::new()
        .route("/", get(routes::pages::index_handler))
        .route("/health", get(routes::pages::health_handler))
        .route("/agent", post(routes::agent::agent_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(ServerState::new(agent))
}

/// Bind `addr` and serve until Ctrl+C.
pub async fn serve(agent: Arc<NoteAgent>, addr: SocketAddr) -> Result<(), ServerError> {
    info!(%addr, "Binding HTTP server");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    serve_on(listener, agent).await
}

/// Serve on an already-bound listener until Ctrl+C.
pub async fn serve_on(listener: TcpListener, agent: Arc<NoteAgent>) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP server ready to accept connections");
    }

    axum::serve(listener, router(agent))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        // Without a signal handler, keep serving until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
