//! Live authenticated sessions
//!
//! Sessions are created by a successful sign-in and live as long as their
//! access token. There is no refresh: an expired session is evicted and the
//! user signs in again.

use std::collections::HashMap;
use std::sync::Arc;

use pkce_auth::Session;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, evicting expired ones, and return the number of
    /// live sessions.
    pub async fn insert(&self, session: Session) -> usize {
        let mut sessions = self.sessions.write().await;
        sweep(&mut sessions);
        sessions.insert(session.id(), session);
        sessions.len()
    }

    /// Look up a live session. An expired session is removed and reported
    /// as absent.
    pub async fn get(&self, id: Uuid) -> Option<Session> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&id) {
                None => return None,
                Some(session) if !session.is_expired() => return Some(session.clone()),
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        if sessions.get(&id).is_some_and(Session::is_expired) {
            sessions.remove(&id);
            debug!(session_id = %id, "evicted expired session");
        }
        None
    }

    /// Number of live sessions, after evicting expired ones.
    pub async fn len(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        sweep(&mut sessions);
        sessions.len()
    }
}

fn sweep(sessions: &mut HashMap<Uuid, Session>) {
    let before = sessions.len();
    sessions.retain(|_, session| !session.is_expired());
    let evicted = before - sessions.len();
    if evicted > 0 {
        debug!(evicted, remaining = sessions.len(), "swept expired sessions");
    }
}
