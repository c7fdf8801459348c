//! GitHub OAuth flow
//!
//! Implements the authorization-code handshake: `/github/auth` hands the
//! frontend an authorization URL, `/github/callback` turns the returned
//! code into a server-side session.

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::AppState;
use crate::api::dto::AuthBeginResponse;
use crate::session::{SessionRecord, generate_session_id, generate_state_nonce};

/// GET /api/github/auth
///
/// Returns the GitHub authorization URL with a fresh anti-forgery
/// `state` nonce. The nonce is handed to the caller; the callback does
/// not verify it (see DESIGN.md).
pub async fn begin_auth(State(state): State<AppState>) -> Json<AuthBeginResponse> {
    let nonce = generate_state_nonce();
    let auth_url = state.github.authorize_url(&nonce);

    Json(AuthBeginResponse {
        auth_url,
        state: nonce,
    })
}

/// Query parameters from the GitHub callback
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    /// Returned nonce; accepted but not verified (see DESIGN.md)
    pub state: Option<String>,
}

/// GET /api/github/callback
///
/// Exchanges the authorization code for an access token, fetches the
/// authenticated user, mints a session, and redirects the browser to
/// the dashboard. Every failure path redirects to the configured error
/// page with an `error` query parameter and creates no session.
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    use crate::metrics::OAUTH_CALLBACKS_TOTAL;

    let error_url = &state.config.frontend.error_url;

    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        tracing::warn!("OAuth callback without authorization code");
        OAUTH_CALLBACKS_TOTAL
            .with_label_values(&["access_denied"])
            .inc();
        return found(&format!("{error_url}?error=access_denied"));
    };

    let token = match state.github.exchange_code(&code).await {
        Ok(response) => response.access_token.filter(|token| !token.is_empty()),
        Err(error) => {
            tracing::error!(%error, "OAuth code exchange failed");
            OAUTH_CALLBACKS_TOTAL
                .with_label_values(&["oauth_error"])
                .inc();
            return found(&format!("{error_url}?error=oauth_error"));
        }
    };

    let Some(access_token) = token else {
        tracing::warn!("OAuth code exchange returned no access token");
        OAUTH_CALLBACKS_TOTAL
            .with_label_values(&["token_error"])
            .inc();
        return found(&format!("{error_url}?error=token_error"));
    };

    let user = match state.github.fetch_user(&access_token).await {
        Ok(user) => user,
        Err(error) => {
            tracing::error!(%error, "Failed to fetch authenticated user");
            OAUTH_CALLBACKS_TOTAL
                .with_label_values(&["oauth_error"])
                .inc();
            return found(&format!("{error_url}?error=oauth_error"));
        }
    };

    let session_id = generate_session_id();
    let record = SessionRecord {
        session_id: session_id.clone(),
        access_token,
        user,
        created_at: chrono::Utc::now(),
    };

    // The record must be visible to `get` before the browser ever sees
    // the session id.
    state.sessions.put(record).await;

    OAUTH_CALLBACKS_TOTAL.with_label_values(&["success"]).inc();
    tracing::info!(session_id = %session_id, "Session created");

    let dashboard_url = &state.config.frontend.dashboard_url;
    found(&format!("{dashboard_url}?session={session_id}&success=true"))
}

/// 302 Found redirect
///
/// `axum::response::Redirect` emits 303/307/308; the browser contract
/// here is a plain 302.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
