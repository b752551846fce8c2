//! Session storage.
//!
//! The store is the only owner of [`Session`] values; callers work on cloned
//! snapshots and write them back with [`SessionStore::put`].

use super::types::Session;
use std::collections::HashMap;
use std::sync::Mutex;

/// Keyed session storage, one session per user id.
///
/// Implementations must be safe to share across concurrent requests. The
/// engine assumes at most one in-flight message per user (Synology delivers a
/// user's messages sequentially), so implementations serialize individual
/// operations but not whole get-mutate-put cycles.
pub trait SessionStore: Send + Sync {
    /// Get a snapshot of the session for a user, if one exists.
    fn get(&self, user_id: &str) -> Option<Session>;

    /// Insert or replace the session for a user.
    fn put(&self, user_id: &str, session: Session);

    /// Remove the session for a user. Removing an absent session is a no-op.
    fn delete(&self, user_id: &str);

    /// Number of live sessions.
    fn len(&self) -> usize;

    /// Whether the store holds no sessions.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory session store.
///
/// State lives for process uptime and is wiped on restart; that is the
/// contract, not an oversight. Swap in another [`SessionStore`] behind the
/// same trait if durability is ever required.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        // A poisoned map is still structurally valid; recover it.
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, user_id: &str) -> Option<Session> {
        self.lock().get(user_id).cloned()
    }

    fn put(&self, user_id: &str, session: Session) {
        self.lock().insert(user_id.to_string(), session);
    }

    fn delete(&self, user_id: &str) {
        self.lock().remove(user_id);
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
