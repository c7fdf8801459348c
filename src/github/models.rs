//! Serde types for GitHub REST payloads
//!
//! Only the fields the aggregator reads are modeled; everything else in
//! the upstream payloads is ignored during deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token endpoint response
///
/// GitHub reports OAuth errors with a 200 status and an `error` field,
/// so `access_token` is optional rather than guaranteed.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Authenticated user, as returned by `GET /user`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_repos: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Repository entry from `GET /user/repos`
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub html_url: String,
    pub private: bool,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Commit entry from `GET /repos/{full_name}/commits`
#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub commit: CommitDetail,
    pub html_url: String,
    /// Only present on single-commit responses; zero when absent
    pub stats: Option<CommitStats>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub message: String,
    pub author: CommitAuthor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    pub name: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitStats {
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
}

/// Public event from `GET /users/{login}/events/public`
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    pub repo: EventRepo,
    #[serde(default)]
    pub payload: EventPayload,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRepo {
    pub name: String,
}

/// Event payload; fields are populated per event type
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    /// PushEvent: pushed ref ("refs/heads/main")
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    /// PushEvent: pushed commits
    pub commits: Option<Vec<serde_json::Value>>,
    /// CreateEvent: "branch", "tag", or "repository"
    pub ref_type: Option<String>,
    /// IssuesEvent / PullRequestEvent: "opened", "closed", ...
    pub action: Option<String>,
    pub issue: Option<EventIssue>,
    pub pull_request: Option<EventPullRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventIssue {
    pub number: u64,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventPullRequest {
    pub number: u64,
}
