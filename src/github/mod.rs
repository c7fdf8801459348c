//! GitHub REST client
//!
//! Thin typed wrapper over reqwest for the handful of endpoints the
//! service consumes. Base URLs come from configuration so integration
//! tests can point the client at a local mock upstream.

pub mod models;

use std::time::Duration;

use crate::config::GitHubConfig;
use crate::error::AppError;
use models::{Commit, Event, GitHubUser, Repository, TokenResponse};

/// Typed GitHub API client
///
/// One instance is shared across all handlers via `AppState`. Every
/// request carries an explicit bounded timeout; a timeout surfaces as
/// the same error as any other failed call.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    callback_url: String,
    api_base: String,
    oauth_base: String,
}

impl GitHubClient {
    /// Build a client from OAuth configuration
    pub fn new(config: &GitHubConfig, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent("ChainGit/0.1.0")
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            callback_url: config.callback_url.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            oauth_base: config.oauth_base.trim_end_matches('/').to_string(),
        })
    }

    /// Build the authorization URL the browser is sent to
    ///
    /// Scopes match what the dashboard needs: repo metadata, commits,
    /// and the user's public profile.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/login/oauth/authorize?client_id={}&redirect_uri={}&scope={}&state={}",
            self.oauth_base,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.callback_url),
            urlencoding::encode("repo,user,read:user"),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an access token
    ///
    /// GitHub reports bad codes inside a 200 body, so callers must check
    /// `access_token` on the returned payload.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let url = format!("{}/login/oauth/access_token", self.oauth_base);

        let response = self
            .instrumented("exchange_code", || {
                self.http
                    .post(&url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .json(&serde_json::json!({
                        "client_id": self.client_id,
                        "client_secret": self.client_secret,
                        "code": code,
                        "redirect_uri": self.callback_url,
                    }))
                    .send()
            })
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// `GET /user` — authenticated user detail
    pub async fn fetch_user(&self, access_token: &str) -> Result<GitHubUser, AppError> {
        let url = format!("{}/user", self.api_base);

        let response = self
            .instrumented("fetch_user", || {
                self.http
                    .get(&url)
                    .header(reqwest::header::AUTHORIZATION, format!("token {access_token}"))
                    .send()
            })
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// `GET /user/repos` — most recently updated first, capped at 10
    pub async fn fetch_repositories(&self, access_token: &str) -> Result<Vec<Repository>, AppError> {
        let url = format!("{}/user/repos", self.api_base);

        let response = self
            .instrumented("fetch_repositories", || {
                self.http
                    .get(&url)
                    .header(reqwest::header::AUTHORIZATION, format!("token {access_token}"))
                    .query(&[("sort", "updated"), ("per_page", "10")])
                    .send()
            })
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// `GET /repos/{full_name}/commits` — commits authored by `author`
    /// since the given instant, capped at 10
    pub async fn fetch_repo_commits(
        &self,
        access_token: &str,
        full_name: &str,
        author: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Commit>, AppError> {
        let url = format!("{}/repos/{}/commits", self.api_base, full_name);

        let response = self
            .instrumented("fetch_repo_commits", || {
                self.http
                    .get(&url)
                    .header(reqwest::header::AUTHORIZATION, format!("token {access_token}"))
                    .query(&[
                        ("author", author),
                        ("since", &since.to_rfc3339()),
                        ("per_page", "10"),
                    ])
                    .send()
            })
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// `GET /users/{login}/events/public` — capped at 10 events
    pub async fn fetch_public_events(
        &self,
        access_token: &str,
        login: &str,
    ) -> Result<Vec<Event>, AppError> {
        let url = format!("{}/users/{}/events/public", self.api_base, login);

        let response = self
            .instrumented("fetch_public_events", || {
                self.http
                    .get(&url)
                    .header(reqwest::header::AUTHORIZATION, format!("token {access_token}"))
                    .query(&[("per_page", "10")])
                    .send()
            })
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    /// Run an upstream call with request counters and a duration histogram
    async fn instrumented<F, Fut>(
        &self,
        operation: &str,
        send: F,
    ) -> Result<reqwest::Response, reqwest::Error>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        use crate::metrics::{GITHUB_REQUEST_DURATION_SECONDS, GITHUB_REQUESTS_TOTAL};

        let timer = GITHUB_REQUEST_DURATION_SECONDS
            .with_label_values(&[operation])
            .start_timer();
        let result = send().await;
        timer.observe_duration();

        let status = match &result {
            Ok(response) => response.status().as_str().to_string(),
            Err(_) => "error".to_string(),
        };
        GITHUB_REQUESTS_TOTAL
            .with_label_values(&[operation, &status])
            .inc();

        result
    }
}
