//! Session store
//!
//! Sessions are minted by the OAuth callback and hold the GitHub access
//! token server-side; the browser only ever sees the opaque session id.
//! The store is volatile and cleared on restart.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use tokio::sync::RwLock;

use crate::github::models::GitHubUser;

/// Credentials and identity captured at token-exchange time
///
/// `access_token` never leaves process memory: it is not serialized,
/// not logged, and redacted from `Debug` output.
#[derive(Clone)]
pub struct SessionRecord {
    /// Opaque random id, primary key into the store
    pub session_id: String,
    /// GitHub access token, server-side only
    pub access_token: String,
    /// Identity snapshot from token-exchange time
    pub user: GitHubUser,
    /// Creation time, sole basis for expiry
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("session_id", &self.session_id)
            .field("access_token", &"<redacted>")
            .field("user", &self.user.login)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl SessionRecord {
    /// Check whether the record has outlived the TTL
    pub fn is_expired(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.created_at);
        age.num_seconds() >= ttl.as_secs() as i64
    }
}

/// Generate an opaque random session id (32 alphanumeric chars)
pub fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Generate a random anti-forgery state nonce for the OAuth redirect
pub fn generate_state_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// Key-value store for session records
///
/// Abstracted behind a trait so handlers can be tested against a
/// deterministic fake and production can later swap in a durable store
/// without changing call sites.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a record; visible to `get` as soon as this returns
    async fn put(&self, record: SessionRecord);

    /// Look up a live record
    ///
    /// Returns `None` for unknown ids and for records past the TTL,
    /// even if the sweep has not removed them yet.
    async fn get(&self, session_id: &str) -> Option<SessionRecord>;

    /// Remove a record; returns whether it existed
    async fn delete(&self, session_id: &str) -> bool;

    /// Remove every expired record, returning how many were removed
    async fn sweep_expired(&self) -> usize;
}

/// In-memory session store
///
/// A `RwLock<HashMap>` is enough here: profile requests are concurrent
/// reads, callbacks are single-key writes, and no operation ever touches
/// more than one record.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    /// Create a new store with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of records currently held, expired or not
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, record: SessionRecord) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(record.session_id.clone(), record);

        use crate::metrics::SESSIONS_ACTIVE;
        SESSIONS_ACTIVE.set(sessions.len() as i64);
    }

    async fn get(&self, session_id: &str) -> Option<SessionRecord> {
        let sessions = self.sessions.read().await;
        // TTL is checked at read time so an expired-but-unswept record
        // can never authorize a request.
        sessions
            .get(session_id)
            .filter(|record| !record.is_expired(self.ttl))
            .cloned()
    }

    async fn delete(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(session_id).is_some();

        if removed {
            use crate::metrics::{SESSIONS_ACTIVE, SESSIONS_SWEPT_TOTAL};
            SESSIONS_SWEPT_TOTAL.with_label_values(&["disconnect"]).inc();
            SESSIONS_ACTIVE.set(sessions.len() as i64);
        }

        removed
    }

    async fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, record| !record.is_expired(ttl));
        let removed = before - sessions.len();

        if removed > 0 {
            use crate::metrics::{SESSIONS_ACTIVE, SESSIONS_SWEPT_TOTAL};
            SESSIONS_SWEPT_TOTAL
                .with_label_values(&["expired"])
                .inc_by(removed as u64);
            SESSIONS_ACTIVE.set(sessions.len() as i64);
        }

        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn test_user(login: &str) -> GitHubUser {
        GitHubUser {
            login: login.to_string(),
            id: 1,
            name: Some("Test User".to_string()),
            avatar_url: Some("https://example.com/avatar.png".to_string()),
            ..GitHubUser::default()
        }
    }

    fn record_with_age(session_id: &str, age_seconds: i64) -> SessionRecord {
        SessionRecord {
            session_id: session_id.to_string(),
            access_token: "gho_test_token".to_string(),
            user: test_user("octocat"),
            created_at: Utc::now() - ChronoDuration::seconds(age_seconds),
        }
    }

    #[tokio::test]
    async fn put_then_get_returns_record() {
        let store = InMemorySessionStore::new(Duration::from_secs(3600));
        store.put(record_with_age("abc123", 0)).await;

        let record = store.get("abc123").await.expect("record should be live");
        assert_eq!(record.user.login, "octocat");
    }

    #[tokio::test]
    async fn get_unknown_id_returns_none() {
        let store = InMemorySessionStore::new(Duration::from_secs(3600));
        assert!(store.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn get_rejects_expired_but_unswept_record() {
        let store = InMemorySessionStore::new(Duration::from_secs(3600));
        store.put(record_with_age("old", 7200)).await;

        // No sweep has run, but the TTL check at read time still rejects it.
        assert!(store.get("old").await.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delete_reports_whether_record_existed() {
        let store = InMemorySessionStore::new(Duration::from_secs(3600));
        store.put(record_with_age("abc123", 0)).await;

        assert!(store.delete("abc123").await);
        assert!(!store.delete("abc123").await);
        assert!(store.get("abc123").await.is_none());
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_records() {
        let store = InMemorySessionStore::new(Duration::from_secs(3600));
        store.put(record_with_age("fresh", 10)).await;
        store.put(record_with_age("stale-1", 7200)).await;
        store.put(record_with_age("stale-2", 4000)).await;

        assert_eq!(store.sweep_expired().await, 2);
        assert_eq!(store.len().await, 1);
        assert!(store.get("fresh").await.is_some());
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let store = InMemorySessionStore::new(Duration::from_secs(3600));
        store.put(record_with_age("stale", 7200)).await;

        assert_eq!(store.sweep_expired().await, 1);
        assert_eq!(store.sweep_expired().await, 0);
    }

    #[tokio::test]
    async fn generated_session_ids_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(generate_session_id()));
        }
    }

    #[test]
    fn debug_output_redacts_access_token() {
        let record = record_with_age("abc123", 0);
        let output = format!("{record:?}");
        assert!(output.contains("<redacted>"));
        assert!(!output.contains("gho_test_token"));
    }
}
