//! HTTP handlers
//!
//! - `auth`: OAuth begin + callback
//! - `profile`: session-bound GitHub data endpoints
//! - `dto`: response shapes
//! - `metrics`: Prometheus exposition

pub mod auth;
pub mod dto;
pub mod metrics;
pub mod profile;

use axum::{
    Json, Router,
    routing::{delete, get, post},
};

use crate::AppState;

/// Create the `/api` router
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/", get(api_index))
        .route("/health", get(health))
        .route("/github/auth", get(auth::begin_auth))
        .route("/github/callback", get(auth::oauth_callback))
        .route("/github/profile/:session_id", get(profile::get_profile))
        .route("/github/commits/:session_id", get(profile::get_commits))
        .route("/github/refresh/:session_id", post(profile::refresh))
        .route(
            "/github/disconnect/:session_id",
            delete(profile::disconnect),
        )
}

/// GET /api
///
/// Service banner with the endpoint list.
async fn api_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "ChainGit GitHub OAuth API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "GET /api/health",
            "GET /api/github/auth",
            "GET /api/github/callback",
            "GET /api/github/profile/:sessionId",
            "GET /api/github/commits/:sessionId",
            "POST /api/github/refresh/:sessionId",
            "DELETE /api/github/disconnect/:sessionId",
        ],
    }))
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
