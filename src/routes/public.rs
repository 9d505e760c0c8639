use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a credential: the liveness probe and the two
/// account-gateway operations. Everything else in the application sits behind
/// the authorization gate.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated liveness endpoint for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Creates an account. Passwords are hashed before they reach the store.
        .route("/register", post(handlers::register))
        // POST /login
        // Exchanges email + password for a signed bearer token.
        .route("/login", post(handlers::login))
}
