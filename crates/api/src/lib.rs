//! `api` crate — HTTP REST layer over the signature engine.
//!
//! Routes:
//!   POST   /api/v1/workflows                   create from a topology
//!   GET    /api/v1/workflows/{id}              full tree state
//!   DELETE /api/v1/workflows/{id}              permanent deletion
//!   GET    /api/v1/workflows/by-code/{code}    tree state by public code
//!   GET    /api/v1/workflows/{id}/audit        audit trail
//!   POST   /api/v1/workflows/{id}/actions      submit a signing action
//!   POST   /api/v1/workflows/{id}/cancel       external cancellation
//!   GET    /api/v1/signers/{id}/pending        pending-action inbox
//!
//! The HTTP surface is plumbing: handlers translate DTOs and status
//! codes, the engine owns every rule.

pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use engine::SignatureEngine;
use hooks::SignerDirectory;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SignatureEngine>,
    pub directory: Arc<dyn SignerDirectory>,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/workflows", post(handlers::workflows::create))
        .route(
            "/api/v1/workflows/:id",
            get(handlers::workflows::get_state).delete(handlers::workflows::remove),
        )
        .route(
            "/api/v1/workflows/by-code/:code",
            get(handlers::workflows::get_by_code),
        )
        .route("/api/v1/workflows/:id/audit", get(handlers::workflows::audit))
        .route("/api/v1/workflows/:id/actions", post(handlers::actions::submit))
        .route("/api/v1/workflows/:id/cancel", post(handlers::workflows::cancel))
        .route("/api/v1/signers/:id/pending", get(handlers::signers::pending))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(bind: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("API listening on {bind}");
    axum::serve(listener, router(state)).await
}
