//! Response DTOs
//!
//! JSON shapes consumed by the dashboard frontend. Field names follow
//! the frontend contract, so some are camelCase while the repository
//! summaries keep GitHub's snake_case keys.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::github::models::GitHubUser;

/// Everything the dashboard renders for one user, in a single payload
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedProfile {
    pub user: GitHubUser,
    pub repositories: Vec<RepositorySummary>,
    pub stats: ProfileStats,
    #[serde(rename = "recentActivity")]
    pub recent_activity: Vec<ActivityEntry>,
    #[serde(rename = "recentCommits")]
    pub recent_commits: Vec<CommitSummary>,
}

/// Repository summary, reduced from the upstream repo object
#[derive(Debug, Clone, Serialize)]
pub struct RepositorySummary {
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub html_url: String,
    pub private: bool,
    pub topics: Vec<String>,
}

/// Derived counters over the aggregated data
///
/// `total_commits` counts only the merged recent-commit sequence (the
/// trailing 2-day window over the 5 most recently updated repos), not
/// the user's historical total.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileStats {
    #[serde(rename = "totalCommits")]
    pub total_commits: usize,
    #[serde(rename = "totalStars")]
    pub total_stars: u64,
    #[serde(rename = "totalForks")]
    pub total_forks: u64,
    #[serde(rename = "contributedTo")]
    pub contributed_to: usize,
}

/// One public event, reduced to a display line
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub event_type: String,
    pub repo: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// One commit across the user's recently updated repositories
#[derive(Debug, Clone, Serialize)]
pub struct CommitSummary {
    pub repo: String,
    pub message: String,
    /// 7-character abbreviated identifier
    pub sha: String,
    pub date: DateTime<Utc>,
    pub url: String,
    pub additions: u64,
    pub deletions: u64,
}

/// Body for `GET /api/github/commits/:session_id`
#[derive(Debug, Clone, Serialize)]
pub struct CommitsResponse {
    pub commits: Vec<CommitSummary>,
}

/// Body for `GET /api/github/auth`
#[derive(Debug, Clone, Serialize)]
pub struct AuthBeginResponse {
    #[serde(rename = "authUrl")]
    pub auth_url: String,
    pub state: String,
}

/// Generic acknowledgement body (refresh, disconnect)
#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}
