//! HTTP server module for the status API.
//!
//! Exposes the status read/write operations as small JSON endpoints.
//! Clients learn about changes only by polling; nothing is pushed.

pub mod routes;
pub mod state;

use crate::server::routes::{health, labels, status};
use crate::server::state::AppState;
use crate::service::StatusService;

use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Builds the router with all status routes.
pub fn router(service: StatusService) -> Router {
    let state = Arc::new(AppState::new(service));

    // CORS layer for browser frontends
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Status API
        .route("/api/get-status", post(status::get_status))
        .route("/api/update-status", post(status::update_status))
        .route("/api/update", post(status::update_status))
        .route("/api/verify-token", post(status::verify_token))
        .route("/api/labels", get(labels::get_labels))
        .layer(cors)
        .with_state(state)
}

/// Runs the axum server until `shutdown` resolves.
pub async fn run_server(
    addr: SocketAddr,
    service: StatusService,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if !service.requires_credential() {
        tracing::warn!("No driver token configured; status writes are open to any client");
    }

    let app = router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
