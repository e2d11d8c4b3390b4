//! Civic Pulse web application library.
//!
//! The binary in `main.rs` wires configuration, logging and the chosen
//! backend into [`app`]; integration tests call [`app`] directly with
//! in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::path::Path;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, middleware::from_fn, routing::get};
use tower_http::services::ServeDir;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::middleware::rate_limit::RateLimiterLayer;
use crate::services::storage::UPLOADS_URL_PREFIX;
use crate::state::AppState;

/// Directory holding `css/` and `js/`.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the full application router.
///
/// `limiter` guards the sign-in and sign-up POSTs; it needs the peer address
/// (or a proxy header) on every request, so in-process callers pass `None`.
pub fn app<S>(
    state: AppState,
    session_layer: SessionManagerLayer<S>,
    limiter: Option<RateLimiterLayer>,
) -> Router
where
    S: SessionStore + Clone,
{
    let uploads = ServeDir::new(Path::new(&state.config().upload_dir));

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes(limiter))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .nest_service(UPLOADS_URL_PREFIX, uploads)
        .layer(session_layer)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .with_state(state)
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Pings the database when there is one; the memory backend is always ready.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
