//! In-memory session storage.
//!
//! Thread-safe implementation of the `SessionStore` trait. State lives for
//! the lifetime of the store; nothing is persisted.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{SessionState, SessionUpdate};
use crate::error::Result;
use crate::storage::SessionStore;

/// In-memory session store.
///
/// Every read-modify-write holds the write lock for the whole step, so
/// per-session updates are atomic and inheritance copies a consistent
/// snapshot of the parent.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    /// Session storage.
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl MemorySessionStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    // A panic while holding the lock cannot leave a half-written entry
    // behind (entries are replaced whole), so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SessionState>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SessionState>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the number of sessions in the store.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn create_state(&self, session_id: &str, initial: &SessionUpdate) -> Result<SessionState> {
        let state = SessionState::with_update(session_id, initial);
        self.write().insert(session_id.to_string(), state.clone());
        Ok(state)
    }

    fn get_state(&self, session_id: &str) -> Result<Option<SessionState>> {
        Ok(self.read().get(session_id).cloned())
    }

    fn set_state(&self, session_id: &str, update: &SessionUpdate) -> Result<SessionState> {
        let mut sessions = self.write();
        let state = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(session_id));
        update.apply_to(state);
        Ok(state.clone())
    }

    fn delete_state(&self, session_id: &str) -> Result<()> {
        self.write().remove(session_id);
        Ok(())
    }

    fn inherit_parent_state(
        &self,
        session_id: &str,
        parent_id: &str,
    ) -> Result<Option<SessionState>> {
        let mut sessions = self.write();
        let Some(child) = sessions.get(parent_id).map(|parent| parent.inherit(session_id)) else {
            return Ok(None);
        };
        sessions.insert(session_id.to_string(), child.clone());
        Ok(Some(child))
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        let sessions = self.read();
        let mut states: Vec<&SessionState> = sessions.values().collect();

        // Sort by updated_at descending (most recent first)
        states.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(states.into_iter().map(|s| s.id.clone()).collect())
    }

    fn record_modified_file(&self, session_id: &str, path: &str) -> Result<SessionState> {
        let mut sessions = self.write();
        let state = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(session_id));
        state.record_modified_file(path);
        Ok(state.clone())
    }
}
