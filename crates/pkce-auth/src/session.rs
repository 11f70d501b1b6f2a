//! Authenticated session context
//!
//! A `Session` is created once per successful code exchange and passed
//! explicitly to everything that calls the resource API. There is no global
//! token: dropping the session drops (and zeroizes) the credential.

use std::time::{Duration, Instant};

use common::Secret;
use uuid::Uuid;

/// Opaque bearer credential returned by the token endpoint.
#[derive(Debug, Clone)]
pub struct AccessToken {
    value: Secret<String>,
    expires_at: Instant,
}

impl AccessToken {
    /// Wrap a token valid for `lifetime` from now.
    pub fn new(token: Secret<String>, lifetime: Duration) -> Self {
        Self {
            value: token,
            expires_at: Instant::now() + lifetime,
        }
    }

    /// Value for the `Authorization: Bearer` header.
    pub fn bearer(&self) -> &str {
        self.value.expose()
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Time left before the provider stops accepting this token.
    pub fn expires_in(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// One authenticated page session. Lives no longer than its token.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    token: AccessToken,
    created_at: Instant,
}

impl Session {
    pub fn new(token: AccessToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            token,
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.token
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn is_expired(&self) -> bool {
        self.token.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(value: &str, lifetime: Duration) -> AccessToken {
        AccessToken::new(Secret::new(value.into()), lifetime)
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let token = token("BQD", Duration::from_secs(3600));
        let a = Session::new(token.clone());
        let b = Session::new(token);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.access_token().bearer(), "BQD");
    }

    #[test]
    fn debug_never_prints_token() {
        let session = Session::new(token("BQD-secret", Duration::from_secs(3600)));
        let debug = format!("{session:?}");
        assert!(!debug.contains("BQD-secret"), "got: {debug}");
    }

    #[test]
    fn session_expires_with_its_token() {
        let live = Session::new(token("BQD", Duration::from_secs(3600)));
        assert!(!live.is_expired());
        assert!(live.age() < Duration::from_secs(5));

        let spent = Session::new(token("BQD", Duration::ZERO));
        assert!(spent.is_expired());
        assert_eq!(spent.access_token().expires_in(), Duration::ZERO);
    }
}
