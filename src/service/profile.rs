//! Profile aggregation
//!
//! Fans out over the GitHub REST endpoints and merges the results into
//! the single payload the dashboard consumes. User detail and the repo
//! list are fatal if they fail; per-repository commit fetches and the
//! event stream degrade gracefully.

use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use futures::stream::{self, StreamExt};

use crate::api::dto::{
    ActivityEntry, AggregatedProfile, CommitSummary, ProfileStats, RepositorySummary,
};
use crate::error::{AppError, Result};
use crate::github::GitHubClient;
use crate::github::models::{Commit, Event, Repository};

/// Trailing window for the recent-commit scan
const COMMIT_WINDOW_DAYS: i64 = 2;
/// Only the most recently updated repos are scanned for commits
const COMMIT_REPO_LIMIT: usize = 5;
/// Concurrent per-repo commit fetches
const COMMIT_FETCH_CONCURRENCY: usize = 5;
/// Caps on the merged sequences in the profile payload
const RECENT_ITEM_LIMIT: usize = 10;

/// Assemble the full profile payload for a session's access token
///
/// Every call hits GitHub fresh; there is deliberately no caching or
/// staleness policy in front of the upstream API.
pub async fn aggregate_profile(
    github: &GitHubClient,
    access_token: &str,
) -> Result<AggregatedProfile> {
    // User detail and repo list are independent; both are required to
    // assemble the response, so either failure aborts the request.
    let (user, repositories) = tokio::try_join!(
        github.fetch_user(access_token),
        github.fetch_repositories(access_token),
    )
    .map_err(|error| {
        tracing::error!(%error, "Failed to fetch user or repository list");
        AppError::GitHubFetch
    })?;

    // Commits and activity are independent of each other but both need
    // the login (and commits need the repo list), so they run after.
    let (mut recent_commits, recent_activity) = tokio::join!(
        recent_commits(github, access_token, &user.login, &repositories),
        recent_activity(github, access_token, &user.login),
    );
    recent_commits.truncate(RECENT_ITEM_LIMIT);

    let stats = ProfileStats {
        total_commits: recent_commits.len(),
        total_stars: repositories.iter().map(|r| r.stargazers_count).sum(),
        total_forks: repositories.iter().map(|r| r.forks_count).sum(),
        contributed_to: repositories.len(),
    };

    Ok(AggregatedProfile {
        user,
        repositories: repositories.iter().map(summarize_repository).collect(),
        stats,
        recent_activity,
        recent_commits,
    })
}

/// Fetch and merge commits across the most recently updated repositories
///
/// Scans the first `COMMIT_REPO_LIMIT` repos for commits authored by
/// `login` within the trailing window. A failing repo is logged and
/// skipped; its commits simply do not appear in the merged sequence.
/// Returns the merged list sorted newest first, not yet truncated.
pub fn recent_commits<'a>(
    github: &'a GitHubClient,
    access_token: &'a str,
    login: &'a str,
    repositories: &'a [Repository],
) -> futures::future::BoxFuture<'a, Vec<CommitSummary>> {
    // Returns a boxed future (rather than being an `async fn`) to work
    // around rust-lang/rust#102211: the buffered stream's opaque future
    // type otherwise fails axum's `Send` handler check.
    let since = commit_window_start(Utc::now());

    // The per-repo futures are boxed too, with the closure's return
    // type spelled out, so the `Send` proof never has to reason about
    // the closure's opaque async block.
    let fetch = move |repo: &'a Repository| -> futures::future::BoxFuture<'a, Option<(String, Vec<Commit>)>> {
        async move {
            match github
                .fetch_repo_commits(access_token, &repo.full_name, login, since)
                .await
            {
                Ok(commits) => Some((repo.name.clone(), commits)),
                Err(error) => {
                    tracing::warn!(
                        repo = %repo.full_name,
                        %error,
                        "Skipping repository after commit fetch failure"
                    );
                    None
                }
            }
        }
        .boxed()
    };

    // Mapping on the plain iterator keeps the closure out of the
    // stream's type; the boxed futures stay inert until polled.
    let fetches: Vec<_> = repositories
        .iter()
        .take(COMMIT_REPO_LIMIT)
        .map(fetch)
        .collect();

    async move {
        let per_repo: Vec<Option<(String, Vec<Commit>)>> = stream::iter(fetches)
            .buffer_unordered(COMMIT_FETCH_CONCURRENCY)
            .collect()
            .await;

        merge_commits(per_repo.into_iter().flatten().collect())
    }
    .boxed()
}

/// Fetch the user's public event stream as display entries
///
/// A failure here degrades to an empty activity list rather than
/// failing the whole aggregation.
pub async fn recent_activity(
    github: &GitHubClient,
    access_token: &str,
    login: &str,
) -> Vec<ActivityEntry> {
    match github.fetch_public_events(access_token, login).await {
        Ok(events) => {
            // GitHub already returns events newest first; keep that
            // order instead of re-sorting.
            let mut entries: Vec<ActivityEntry> = events.iter().map(describe_event).collect();
            entries.truncate(RECENT_ITEM_LIMIT);
            entries
        }
        Err(error) => {
            tracing::warn!(%error, "Failed to fetch public events; returning empty activity");
            Vec::new()
        }
    }
}

/// Start of the trailing commit window relative to `now`
fn commit_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(COMMIT_WINDOW_DAYS)
}

/// Flatten per-repo commit lists and sort newest first
fn merge_commits(per_repo: Vec<(String, Vec<Commit>)>) -> Vec<CommitSummary> {
    let mut merged: Vec<CommitSummary> = per_repo
        .into_iter()
        .flat_map(|(repo_name, commits)| {
            commits
                .into_iter()
                .map(move |commit| summarize_commit(&repo_name, commit))
        })
        .collect();

    merged.sort_by(|a, b| b.date.cmp(&a.date));
    merged
}

fn summarize_commit(repo_name: &str, commit: Commit) -> CommitSummary {
    let stats = commit.stats.unwrap_or_default();
    CommitSummary {
        repo: repo_name.to_string(),
        message: commit.commit.message,
        sha: commit.sha.chars().take(7).collect(),
        date: commit.commit.author.date,
        url: commit.html_url,
        additions: stats.additions,
        deletions: stats.deletions,
    }
}

fn summarize_repository(repo: &Repository) -> RepositorySummary {
    RepositorySummary {
        name: repo.name.clone(),
        description: repo.description.clone(),
        language: repo.language.clone(),
        stargazers_count: repo.stargazers_count,
        forks_count: repo.forks_count,
        updated_at: repo.updated_at,
        html_url: repo.html_url.clone(),
        private: repo.private,
        topics: repo.topics.clone(),
    }
}

/// Reduce a raw event to a display entry
///
/// The output `type` is the lowercased event type with the "Event"
/// suffix stripped ("PushEvent" -> "push").
fn describe_event(event: &Event) -> ActivityEntry {
    ActivityEntry {
        event_type: event
            .event_type
            .to_lowercase()
            .trim_end_matches("event")
            .to_string(),
        repo: event.repo.name.clone(),
        description: event_description(event),
        timestamp: event.created_at,
    }
}

fn event_description(event: &Event) -> String {
    match event.event_type.as_str() {
        "PushEvent" => {
            let count = event
                .payload
                .commits
                .as_ref()
                .map(|commits| commits.len())
                .filter(|&n| n > 0)
                .unwrap_or(1);
            let branch = event
                .payload
                .git_ref
                .as_deref()
                .map(|r| r.trim_start_matches("refs/heads/"))
                .unwrap_or("main");
            let plural = if count > 1 { "s" } else { "" };
            format!("Pushed {count} commit{plural} to {branch}")
        }
        "CreateEvent" => {
            let ref_type = event.payload.ref_type.as_deref().unwrap_or_default();
            let git_ref = event.payload.git_ref.as_deref().unwrap_or_default();
            format!("Created {ref_type} {git_ref}")
        }
        "WatchEvent" => format!("Starred {}", event.repo.name),
        "ForkEvent" => format!("Forked {}", event.repo.name),
        "IssuesEvent" => {
            let action = event.payload.action.as_deref().unwrap_or_default();
            match &event.payload.issue {
                Some(issue) => {
                    format!("{action} issue #{}: {}", issue.number, issue.title)
                }
                None => format!("{action} issue"),
            }
        }
        "PullRequestEvent" => {
            let action = event.payload.action.as_deref().unwrap_or_default();
            match &event.payload.pull_request {
                Some(pr) => format!("{action} pull request #{}", pr.number),
                None => format!("{action} pull request"),
            }
        }
        other => format!("{other} in {}", event.repo.name),
    }
}
