//! ChainGit - GitHub OAuth session and profile aggregation service
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - OAuth begin/callback                                     │
//! │  - Session-bound profile/commits/refresh/disconnect         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Profile aggregation (fan-out + merge)                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - In-memory session store (TTL + hourly sweep)             │
//! │  - GitHub REST client (reqwest)                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers for the OAuth flow and profile endpoints
//! - `service`: Profile aggregation logic
//! - `github`: Typed GitHub REST client
//! - `session`: Session store and sweep
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod config;
pub mod error;
pub mod github;
pub mod metrics;
pub mod service;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains the session
/// store and the GitHub client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Session store (in-memory today, trait-abstracted for tests)
    pub sessions: Arc<dyn session::SessionStore>,

    /// GitHub REST client
    pub github: Arc<github::GitHubClient>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Build the GitHub client with a bounded per-request timeout
    /// 2. Create the in-memory session store
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let github = github::GitHubClient::new(
            &config.github,
            Duration::from_secs(config.http.timeout_seconds),
        )?;

        let sessions = session::InMemorySessionStore::new(Duration::from_secs(
            config.session.ttl_seconds,
        ));

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            github: Arc::new(github),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

    Router::new()
        .nest("/api", api::api_router())
        .layer(axum::middleware::from_fn(api::metrics::track_requests))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(api::metrics::metrics_router())
}

/// Spawn the periodic session sweep task
///
/// The returned handle is owned by the server lifecycle; aborting it
/// stops the sweep on shutdown. The first tick is consumed so the
/// initial sweep runs one interval after boot.
pub fn spawn_sweep_task(state: AppState) -> tokio::task::JoinHandle<()> {
    let interval_secs = state.config.session.sweep_interval_seconds;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.tick().await;

        loop {
            interval.tick().await;

            let removed = state.sessions.sweep_expired().await;
            if removed > 0 {
                tracing::info!(removed, "Swept expired sessions");
            } else {
                tracing::debug!("Sweep found no expired sessions");
            }
        }
    })
}
