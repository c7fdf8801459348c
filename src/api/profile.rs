//! Session-bound GitHub data endpoints
//!
//! Every handler here resolves the session first; an unknown or expired
//! id yields 401 before any upstream call is made.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::AppState;
use crate::api::dto::{AckResponse, AggregatedProfile, CommitsResponse};
use crate::error::{AppError, Result};
use crate::service::profile as profile_service;
use crate::session::SessionRecord;

/// Resolve a live session or reject with 401
async fn require_session(state: &AppState, session_id: &str) -> Result<SessionRecord> {
    state
        .sessions
        .get(session_id)
        .await
        .ok_or(AppError::InvalidSession)
}

/// GET /api/github/profile/:session_id
///
/// Aggregated profile: user detail, repositories, derived stats, recent
/// activity, and recent commits in one payload.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<AggregatedProfile>> {
    let session = require_session(&state, &session_id).await?;

    let profile = profile_service::aggregate_profile(&state.github, &session.access_token).await?;

    Ok(Json(profile))
}

/// GET /api/github/commits/:session_id
///
/// Merged recent commits across the user's most recently updated
/// repositories. The repository list itself is required; individual
/// repositories that fail are skipped.
pub async fn get_commits(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CommitsResponse>> {
    let session = require_session(&state, &session_id).await?;

    let repositories = state
        .github
        .fetch_repositories(&session.access_token)
        .await
        .map_err(|error| {
            tracing::error!(%error, "Failed to fetch repository list");
            AppError::GitHubFetch
        })?;

    let commits = profile_service::recent_commits(
        &state.github,
        &session.access_token,
        &session.user.login,
        &repositories,
    )
    .await;

    Ok(Json(CommitsResponse { commits }))
}

/// POST /api/github/refresh/:session_id
///
/// Acknowledgement only; the frontend re-fetches the data itself.
pub async fn refresh(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<AckResponse>> {
    require_session(&state, &session_id).await?;

    Ok(Json(AckResponse {
        success: true,
        message: "Data refresh triggered".to_string(),
    }))
}

/// DELETE /api/github/disconnect/:session_id
///
/// Invalidates the session. 404 when the id was never issued or has
/// already been removed.
pub async fn disconnect(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<AckResponse>> {
    if !state.sessions.delete(&session_id).await {
        return Err(AppError::SessionNotFound);
    }

    tracing::info!(session_id = %session_id, "Session disconnected");

    Ok(Json(AckResponse {
        success: true,
        message: "GitHub account disconnected".to_string(),
    }))
}
