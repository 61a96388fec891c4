//! In-memory session store.
//!
//! Sessions are created at login and restored per request by the gate
//! stage. Each record binds a fingerprint of the client environment
//! (user-agent, tenant, server secret) — a request presenting a session
//! whose fingerprint does not match its own environment is a fixation
//! attempt and is denied. Each record also carries the CSRF token that
//! mutating requests must echo in the `X-Tx-Csrf` header.
//!
//! The store is a concurrent map; the 5-minute retirement job calls
//! [`SessionStore::retire_expired`] to drop records past their TTL.

use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use dashmap::DashMap;
use sha1::{Digest, Sha1};
use uuid::Uuid;

use tabula_core::{TenantId, UserIdentity};

/// A live session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Opaque session identifier carried in the cookie.
    pub session_id: String,
    /// The user the session belongs to.
    pub user: UserIdentity,
    /// Environment fingerprint bound at login.
    pub fingerprint: String,
    /// Token mutating requests must echo.
    pub csrf_token: String,
    /// Last time the session was touched.
    pub last_seen: Instant,
}

/// Concurrent session store with TTL retirement.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, SessionRecord>,
    secret: String,
    ttl: Duration,
}

impl SessionStore {
    /// Creates a store with the given server secret and session TTL.
    #[must_use]
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            secret: secret.into(),
            ttl,
        }
    }

    /// Creates a session for a user, binding the client fingerprint.
    ///
    /// Returns the new record; the caller sets the cookie from
    /// `session_id` and exposes `csrf_token` to the editor UI.
    pub fn create(
        &self,
        user: UserIdentity,
        user_agent: &str,
        tenant: &TenantId,
    ) -> SessionRecord {
        let session_id = Uuid::now_v7().simple().to_string();
        let record = SessionRecord {
            fingerprint: self.fingerprint(user_agent, tenant),
            csrf_token: self.derive_csrf_token(&session_id),
            session_id: session_id.clone(),
            user,
            last_seen: Instant::now(),
        };
        self.sessions.insert(session_id, record.clone());
        record
    }

    /// Restores a session by id, touching its TTL.
    ///
    /// Returns `None` for unknown or expired sessions; expired records
    /// are removed on the way out.
    #[must_use]
    pub fn restore(&self, session_id: &str) -> Option<SessionRecord> {
        let expired = {
            let mut entry = self.sessions.get_mut(session_id)?;
            if entry.last_seen.elapsed() > self.ttl {
                true
            } else {
                entry.last_seen = Instant::now();
                return Some(entry.clone());
            }
        };
        if expired {
            self.sessions.remove(session_id);
        }
        None
    }

    /// Removes a session (logout).
    pub fn remove(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// Drops every session past its TTL. Returns the number retired.
    pub fn retire_expired(&self) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|_, record| record.last_seen.elapsed() <= ttl);
        before - self.sessions.len()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no sessions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Computes the environment fingerprint for a request.
    #[must_use]
    pub fn fingerprint(&self, user_agent: &str, tenant: &TenantId) -> String {
        let mut hasher = Sha1::new();
        hasher.update(user_agent.as_bytes());
        hasher.update(b"|");
        hasher.update(tenant.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(self.secret.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    fn derive_csrf_token(&self, session_id: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(session_id.as_bytes());
        hasher.update(b"|csrf|");
        hasher.update(self.secret.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}
