use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::chat::{ChatId, PrincipalId};
use crate::session::state::Session;

/// Process-wide table of in-progress sessions, keyed by principal. The outer
/// lock is held only for map operations; per-session work serializes on the
/// session's own mutex.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<PrincipalId, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, principal: PrincipalId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(&principal).cloned()
    }

    /// Fetch the principal's session, creating a fresh one when absent.
    /// A principal never owns more than one entry.
    pub async fn get_or_create(
        &self,
        principal: PrincipalId,
        chat: ChatId,
    ) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(principal)
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(principal, chat))))
            .clone()
    }

    /// Drop the principal's entry, handing the record back to the caller so
    /// temp-file release happens in the same critical section as removal.
    pub async fn remove(&self, principal: PrincipalId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.write().await.remove(&principal)
    }

    /// Replace the principal's session with a fresh one, returning the old
    /// record (if any) for cleanup.
    pub async fn replace(
        &self,
        principal: PrincipalId,
        chat: ChatId,
    ) -> (Arc<Mutex<Session>>, Option<Arc<Mutex<Session>>>) {
        let fresh = Arc::new(Mutex::new(Session::new(principal, chat)));
        let old = self
            .sessions
            .write()
            .await
            .insert(principal, Arc::clone(&fresh));
        (fresh, old)
    }

    /// Principals whose sessions have been idle past the horizon. Used by
    /// the background reaper; termination goes through the orchestrator.
    pub async fn idle_principals(&self, horizon: Duration) -> Vec<PrincipalId> {
        let sessions = self.sessions.read().await;
        let mut idle = Vec::new();
        for (principal, session) in sessions.iter() {
            // try_lock: a session busy in a stage is by definition active.
            if let Ok(guard) = session.try_lock() {
                if guard.idle_for() > horizon {
                    idle.push(*principal);
                }
            }
        }
        idle
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
