//! Server-side session registry.
//!
//! Sessions are opaque 256-bit tokens, hex-encoded, mapping to a user.
//! Expiry is enforced on every lookup; [`SessionRegistry::sweep_expired`]
//! only reclaims memory for sessions nobody asks about again.

use std::time::Duration;

use dashmap::DashMap;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use time::OffsetDateTime;

use mocktodo_storage::User;

/// Number of random bytes in a session id.
const SESSION_ID_BYTES: usize = 32;

/// A logged-in browser session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// Returns `true` if the session is past its expiry at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Concurrency-safe map of live sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session for `user` that expires after `ttl`.
    pub fn create(&self, user: &User, ttl: Duration) -> Session {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng.fill_bytes(&mut bytes);

        let now = OffsetDateTime::now_utc();
        let session = Session {
            id: hex::encode(bytes),
            user_id: user.id,
            username: user.username.clone(),
            created_at: now,
            expires_at: now + ttl,
        };

        self.sessions.insert(session.id.clone(), session.clone());
        tracing::debug!(user_id = user.id, "Session created");
        session
    }

    /// Looks up a live session. An expired entry is removed and reported
    /// as absent.
    pub fn get(&self, id: &str) -> Option<Session> {
        let now = OffsetDateTime::now_utc();

        if let Some(entry) = self.sessions.get(id)
            && !entry.is_expired_at(now)
        {
            return Some(entry.clone());
        }

        // Either missing or expired; the guard above is dropped by now.
        self.sessions.remove_if(id, |_, s| s.is_expired_at(now));
        None
    }

    /// Deletes a session. Deleting an unknown id is a no-op.
    pub fn delete(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Removes every expired session and returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired_at(now));
        before.saturating_sub(self.sessions.len())
    }

    /// Number of stored sessions, expired ones included until swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
