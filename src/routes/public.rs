use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public router
///
/// Unauthenticated endpoints: the liveness probe and the identity gateway.
/// Everything that reads or mutates forum content lives behind the
/// authenticated router.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Monitoring/load-balancer probe; returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/register
        // Account creation. Always assigns the `user` role.
        .route("/auth/register", post(handlers::register))
        // POST /auth/token
        // Credential verification and JWT issuance.
        .route("/auth/token", post(handlers::login))
}
