use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::instrument;

use a2a_core::ids::{LoginToken, SessionToken};

use crate::clock::{Clock, SystemClock};
use crate::error::LoginError;

/// A delegated login produced by `authorize`. No TTL; lives until revoked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoginRecord {
    pub token: LoginToken,
    pub session: SessionToken,
    pub auth_code: String,
    pub created_at: DateTime<Utc>,
}

pub struct LoginRegistry {
    logins: DashMap<LoginToken, LoginRecord>,
    clock: Arc<dyn Clock>,
}

impl Default for LoginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            logins: DashMap::new(),
            clock,
        }
    }

    #[instrument(skip(self, auth_code), fields(session = %session))]
    pub fn create(&self, session: &SessionToken, auth_code: &str) -> LoginRecord {
        let created_at = self.clock.now();
        loop {
            let token = LoginToken::new();
            if let Entry::Vacant(slot) = self.logins.entry(token.clone()) {
                let record = LoginRecord {
                    token,
                    session: session.clone(),
                    auth_code: auth_code.to_string(),
                    created_at,
                };
                slot.insert(record.clone());
                tracing::info!(login = %record.token, "login session created");
                return record;
            }
        }
    }

    pub fn require(&self, token: &LoginToken) -> Result<LoginRecord, LoginError> {
        self.logins
            .get(token)
            .map(|r| r.value().clone())
            .ok_or(LoginError::UnknownLogin)
    }

    /// True if the login existed and was removed.
    #[instrument(skip(self), fields(login = %token))]
    pub fn revoke(&self, token: &LoginToken) -> bool {
        let removed = self.logins.remove(token).is_some();
        if removed {
            tracing::info!("login session revoked");
        }
        removed
    }

    pub fn is_active(&self, token: &LoginToken) -> bool {
        self.logins.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.logins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn create_and_require() {
        let reg = LoginRegistry::new();
        let session = SessionToken::new();
        let record = reg.create(&session, "X");
        assert_eq!(record.session, session);
        assert_eq!(record.auth_code, "X");

        let found = reg.require(&record.token).unwrap();
        assert_eq!(found, record);
    }

    #[test]
    fn require_unknown() {
        let reg = LoginRegistry::new();
        let err = reg.require(&LoginToken::from_raw("missing")).unwrap_err();
        assert_eq!(err, LoginError::UnknownLogin);
    }

    #[test]
    fn revoke_lifecycle() {
        let reg = LoginRegistry::new();
        let record = reg.create(&SessionToken::new(), "X");
        assert!(reg.is_active(&record.token));

        assert!(reg.revoke(&record.token));
        assert!(!reg.is_active(&record.token));
        // Absence is reported, not swallowed.
        assert!(!reg.revoke(&record.token));
    }

    #[test]
    fn tokens_are_distinct_per_login() {
        let reg = LoginRegistry::new();
        let session = SessionToken::new();
        let a = reg.create(&session, "a");
        let b = reg.create(&session, "a");
        assert_ne!(a.token, b.token);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn created_at_comes_from_clock() {
        let clock = Arc::new(ManualClock::default());
        let reg = LoginRegistry::with_clock(clock.clone());
        clock.advance(chrono::Duration::hours(3));
        let record = reg.create(&SessionToken::new(), "X");
        assert_eq!(record.created_at, clock.now());
    }

    #[test]
    fn record_serializes() {
        let reg = LoginRegistry::new();
        let record = reg.create(&SessionToken::from_raw("s1"), "code");
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["session"], "s1");
        assert_eq!(v["auth_code"], "code");
    }
}
