//! Common test utilities for E2E tests
//!
//! Spins up the real router on an ephemeral port next to a scripted
//! GitHub upstream, so the OAuth flow and the aggregation fan-out run
//! end to end without touching the network.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use chaingit::session::InMemorySessionStore;
use chaingit::{AppState, config};
use chrono::Utc;
use tokio::net::TcpListener;

/// Access token the mock upstream hands out for a valid code
pub const MOCK_TOKEN: &str = "gho_mock_token";
/// Authorization code the mock upstream accepts
pub const GOOD_CODE: &str = "good-code";
/// Code the mock exchanges into a response with no access token
pub const EMPTY_TOKEN_CODE: &str = "bad-code";
/// Code that makes the mock token endpoint fail outright
pub const EXPLODING_CODE: &str = "boom";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    /// Concrete store handle, for direct inspection in tests
    pub store: Arc<InMemorySessionStore>,
    pub github: Arc<MockGitHub>,
    pub client: reqwest::Client,
}

/// Register the metric instruments once per test binary
static METRICS_INIT: std::sync::Once = std::sync::Once::new();

impl TestServer {
    /// Create a new test server instance backed by a mock GitHub
    pub async fn new() -> Self {
        METRICS_INIT.call_once(chaingit::metrics::init_metrics);

        let github = Arc::new(MockGitHub::default());
        let github_addr = spawn_mock_github(github.clone()).await;

        let config = test_config(&github_addr);

        let store = Arc::new(InMemorySessionStore::new(Duration::from_secs(
            config.session.ttl_seconds,
        )));

        let state = AppState {
            config: Arc::new(config.clone()),
            sessions: store.clone(),
            github: Arc::new(
                chaingit::github::GitHubClient::new(
                    &config.github,
                    Duration::from_secs(config.http.timeout_seconds),
                )
                .unwrap(),
            ),
        };

        // Redirects stay observable: the OAuth callback is asserted on
        // its 302 Location rather than followed.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = chaingit::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        Self {
            addr: addr_str,
            state,
            store,
            github,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Run the full OAuth flow and return the minted session id
    pub async fn oauth_session(&self) -> String {
        let response = self
            .client
            .get(self.url(&format!("/api/github/callback?code={GOOD_CODE}&state=xyz")))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 302);
        let location = response
            .headers()
            .get("location")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(
            location.contains("success=true"),
            "expected success redirect, got {location}"
        );

        let url = url::Url::parse(location).unwrap();
        url.query_pairs()
            .find(|(key, _)| key == "session")
            .map(|(_, value)| value.to_string())
            .expect("redirect should carry a session id")
    }
}

fn test_config(github_addr: &str) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        frontend: config::FrontendConfig {
            dashboard_url: "http://localhost:5173/dashboard".to_string(),
            error_url: "http://localhost:3000".to_string(),
        },
        github: config::GitHubConfig {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            callback_url: "http://localhost:5000/api/github/callback".to_string(),
            api_base: github_addr.to_string(),
            oauth_base: github_addr.to_string(),
        },
        session: config::SessionConfig {
            ttl_seconds: 3600,
            sweep_interval_seconds: 3600,
        },
        http: config::HttpConfig { timeout_seconds: 8 },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

// =============================================================================
// Mock GitHub upstream
// =============================================================================

/// Scripted GitHub upstream
///
/// Serves fixture payloads for the endpoints the service consumes and
/// counts every hit so tests can assert on upstream traffic.
#[derive(Default)]
pub struct MockGitHub {
    hits: Mutex<HashMap<String, usize>>,
    /// Repos (by full_name) whose commit route returns 500
    fail_commits_for: Mutex<HashSet<String>>,
    /// When set, the public events route returns 500
    fail_events: std::sync::atomic::AtomicBool,
}

impl MockGitHub {
    fn record(&self, endpoint: &str) {
        *self.hits.lock().unwrap().entry(endpoint.to_string()).or_insert(0) += 1;
    }

    /// Number of requests the mock served for an endpoint label
    pub fn hits(&self, endpoint: &str) -> usize {
        self.hits.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    /// Total requests across all endpoints
    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }

    /// Make the commit route for a repo fail with 500
    pub fn fail_commits(&self, full_name: &str) {
        self.fail_commits_for
            .lock()
            .unwrap()
            .insert(full_name.to_string());
    }

    /// Make the public events route fail with 500
    pub fn fail_events(&self) {
        self.fail_events
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

async fn spawn_mock_github(mock: Arc<MockGitHub>) -> String {
    let app = Router::new()
        .route("/login/oauth/access_token", post(token_endpoint))
        .route("/user", get(user_endpoint))
        .route("/user/repos", get(repos_endpoint))
        .route("/repos/:owner/:repo/commits", get(commits_endpoint))
        .route("/users/:login/events/public", get(events_endpoint))
        .with_state(mock);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("token {MOCK_TOKEN}"))
}

async fn token_endpoint(
    State(mock): State<Arc<MockGitHub>>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    mock.record("token");

    match body.get("code").and_then(|c| c.as_str()) {
        Some(GOOD_CODE) => Json(serde_json::json!({
            "access_token": MOCK_TOKEN,
            "token_type": "bearer",
            "scope": "repo,user,read:user",
        }))
        .into_response(),
        Some(EXPLODING_CODE) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => Json(serde_json::json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired.",
        }))
        .into_response(),
    }
}

async fn user_endpoint(
    State(mock): State<Arc<MockGitHub>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    mock.record("user");

    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    Json(serde_json::json!({
        "login": "octocat",
        "id": 583231,
        "name": "The Octocat",
        "avatar_url": "https://avatars.example.com/u/583231",
        "html_url": "https://github.com/octocat",
        "bio": "Test fixture",
        "public_repos": 8,
        "followers": 100,
        "following": 9,
    }))
    .into_response()
}

async fn repos_endpoint(
    State(mock): State<Arc<MockGitHub>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    mock.record("repos");

    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    Json(serde_json::json!([
        {
            "name": "hello-world",
            "full_name": "octocat/hello-world",
            "description": "My first repository",
            "language": "Rust",
            "stargazers_count": 5,
            "forks_count": 2,
            "updated_at": "2025-08-10T12:00:00Z",
            "html_url": "https://github.com/octocat/hello-world",
            "private": false,
            "topics": ["demo"],
        },
        {
            "name": "spoon-knife",
            "full_name": "octocat/spoon-knife",
            "description": null,
            "language": "JavaScript",
            "stargazers_count": 3,
            "forks_count": 1,
            "updated_at": "2025-08-09T12:00:00Z",
            "html_url": "https://github.com/octocat/spoon-knife",
            "private": false,
            "topics": [],
        },
        {
            "name": "test-repo",
            "full_name": "octocat/test-repo",
            "description": "Scratch space",
            "language": null,
            "stargazers_count": 0,
            "forks_count": 0,
            "updated_at": "2025-08-08T12:00:00Z",
            "html_url": "https://github.com/octocat/test-repo",
            "private": true,
            "topics": [],
        },
    ]))
    .into_response()
}

async fn commits_endpoint(
    State(mock): State<Arc<MockGitHub>>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    mock.record("commits");

    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let full_name = format!("{owner}/{repo}");
    if mock.fail_commits_for.lock().unwrap().contains(&full_name) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let commits = match repo.as_str() {
        "hello-world" => vec![
            fixture_commit(
                "1111111aaaaaaa",
                "Fix broken link",
                Utc::now() - chrono::Duration::hours(1),
            ),
            fixture_commit(
                "2222222bbbbbbb",
                "Add readme section",
                Utc::now() - chrono::Duration::hours(5),
            ),
        ],
        "spoon-knife" => vec![fixture_commit(
            "3333333ccccccc",
            "Update fork instructions",
            Utc::now() - chrono::Duration::hours(3),
        )],
        _ => vec![],
    };

    Json(serde_json::Value::Array(commits)).into_response()
}

fn fixture_commit(
    sha: &str,
    message: &str,
    date: chrono::DateTime<Utc>,
) -> serde_json::Value {
    serde_json::json!({
        "sha": sha,
        "commit": {
            "message": message,
            "author": {
                "name": "The Octocat",
                "date": date.to_rfc3339(),
            },
        },
        "html_url": format!("https://github.com/octocat/commit/{sha}"),
    })
}

async fn events_endpoint(
    State(mock): State<Arc<MockGitHub>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    mock.record("events");

    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    if mock.fail_events.load(std::sync::atomic::Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    Json(serde_json::json!([
        {
            "type": "PushEvent",
            "repo": { "name": "octocat/hello-world" },
            "payload": {
                "ref": "refs/heads/main",
                "commits": [{}, {}],
            },
            "created_at": "2025-08-10T11:00:00Z",
        },
        {
            "type": "WatchEvent",
            "repo": { "name": "rust-lang/rust" },
            "payload": {},
            "created_at": "2025-08-10T10:00:00Z",
        },
    ]))
    .into_response()
}
