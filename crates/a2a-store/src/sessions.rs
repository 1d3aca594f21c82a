use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::instrument;

use a2a_core::ids::SessionToken;

use crate::clock::{Clock, SystemClock};
use crate::error::SessionError;

/// Fixed lifetime of a session, advertised to clients on `initialize`.
pub const SESSION_TTL: std::time::Duration = std::time::Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: SessionToken,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub initialized: bool,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-memory session table. A session is usable while `now < expires_at`;
/// expired entries are evicted lazily on lookup or by [`purge_expired`].
///
/// [`purge_expired`]: SessionRegistry::purge_expired
pub struct SessionRegistry {
    sessions: DashMap<SessionToken, Session>,
    clock: Arc<dyn Clock>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            clock,
        }
    }

    /// Issue a fresh session.
    #[instrument(skip(self))]
    pub fn create(&self) -> Session {
        let now = self.clock.now();
        let expires_at = now + ttl();
        loop {
            let token = SessionToken::new();
            if let Entry::Vacant(slot) = self.sessions.entry(token.clone()) {
                let session = Session {
                    token,
                    created_at: now,
                    expires_at,
                    initialized: false,
                };
                slot.insert(session.clone());
                tracing::debug!(session = %session.token, "session created");
                return session;
            }
        }
    }

    /// Validate a token. The returned snapshot must not outlive the current
    /// operation; the session can expire concurrently.
    pub fn require(&self, token: Option<&SessionToken>) -> Result<Session, SessionError> {
        let token = present(token)?;
        let now = self.clock.now();

        let session = self
            .sessions
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::UnknownToken)?;

        if session.is_expired_at(now) {
            self.evict_if_expired(token, now);
            return Err(SessionError::ExpiredToken);
        }
        Ok(session)
    }

    /// Flip the `initialized` flag on a live session.
    #[instrument(skip(self))]
    pub fn mark_initialized(&self, token: Option<&SessionToken>) -> Result<Session, SessionError> {
        let token = present(token)?;
        let now = self.clock.now();

        {
            let mut entry = self
                .sessions
                .get_mut(token)
                .ok_or(SessionError::UnknownToken)?;
            if !entry.is_expired_at(now) {
                entry.initialized = true;
                return Ok(entry.value().clone());
            }
        }

        self.evict_if_expired(token, now);
        Err(SessionError::ExpiredToken)
    }

    /// False for unknown or expired tokens. Never evicts.
    pub fn is_initialized(&self, token: &SessionToken) -> bool {
        let now = self.clock.now();
        self.sessions
            .get(token)
            .is_some_and(|s| s.initialized && !s.is_expired_at(now))
    }

    pub fn ttl_seconds(&self) -> u64 {
        SESSION_TTL.as_secs()
    }

    /// Remove a session explicitly. Returns whether it existed.
    pub fn clear(&self, token: &SessionToken) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired_at(now));
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::info!(removed, "purged expired sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_if_expired(&self, token: &SessionToken, now: DateTime<Utc>) {
        if self
            .sessions
            .remove_if(token, |_, s| s.is_expired_at(now))
            .is_some()
        {
            tracing::debug!(session = %token, "evicted expired session");
        }
    }
}

fn ttl() -> chrono::Duration {
    chrono::Duration::seconds(SESSION_TTL.as_secs() as i64)
}

fn present(token: Option<&SessionToken>) -> Result<&SessionToken, SessionError> {
    token
        .filter(|t| !t.is_blank())
        .ok_or(SessionError::MissingToken)
}
