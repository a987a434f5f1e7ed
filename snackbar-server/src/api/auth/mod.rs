//! Authentication Routes

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// /api/auth/login: public (no auth required)
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/auth/login", post(handler::login))
}
