//! Session storage traits for jjgate.
//!
//! This module defines the `SessionStore` trait for session state.

use std::sync::Arc;

use crate::core::{SessionState, SessionUpdate};
use crate::error::Result;

/// Trait for session state stores.
///
/// Each method is atomic per session: a reader never sees a partially
/// applied update.
pub trait SessionStore: Send + Sync {
    /// Create (or replace) a session's state from defaults plus `initial`.
    fn create_state(&self, session_id: &str, initial: &SessionUpdate) -> Result<SessionState>;

    /// Retrieve a session's state.
    ///
    /// Returns `Ok(None)` if the session has no state.
    fn get_state(&self, session_id: &str) -> Result<Option<SessionState>>;

    /// Merge `update` into a session's state, creating it when absent.
    fn set_state(&self, session_id: &str, update: &SessionUpdate) -> Result<SessionState>;

    /// Delete a session's state.
    ///
    /// Returns `Ok(())` even if the session doesn't exist.
    fn delete_state(&self, session_id: &str) -> Result<()>;

    /// Copy a parent's state to a child with a fresh `modified_files`.
    ///
    /// Returns `Ok(None)`, storing nothing, when the parent has no state.
    fn inherit_parent_state(
        &self,
        session_id: &str,
        parent_id: &str,
    ) -> Result<Option<SessionState>>;

    /// List session ids, most recently updated first.
    fn list_sessions(&self) -> Result<Vec<String>>;

    /// Append a file to a session's `modified_files` unless already present.
    fn record_modified_file(&self, session_id: &str, path: &str) -> Result<SessionState>;

    /// Check if a session has state.
    fn has_state(&self, session_id: &str) -> Result<bool> {
        Ok(self.get_state(session_id)?.is_some())
    }

    /// Explicitly relock a session's gate.
    fn relock(&self, session_id: &str) -> Result<SessionState> {
        self.set_state(session_id, &SessionUpdate::relock())
    }

    /// Ids of sessions inherited from `parent_id`.
    fn children_of(&self, parent_id: &str) -> Result<Vec<String>> {
        let mut children = Vec::new();
        for id in self.list_sessions()? {
            if let Some(state) = self.get_state(&id)? {
                if state.parent_session_id.as_deref() == Some(parent_id) {
                    children.push(id);
                }
            }
        }
        Ok(children)
    }
}

/// Blanket implementation of SessionStore for Arc-wrapped stores.
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn create_state(&self, session_id: &str, initial: &SessionUpdate) -> Result<SessionState> {
        (**self).create_state(session_id, initial)
    }

    fn get_state(&self, session_id: &str) -> Result<Option<SessionState>> {
        (**self).get_state(session_id)
    }

    fn set_state(&self, session_id: &str, update: &SessionUpdate) -> Result<SessionState> {
        (**self).set_state(session_id, update)
    }

    fn delete_state(&self, session_id: &str) -> Result<()> {
        (**self).delete_state(session_id)
    }

    fn inherit_parent_state(
        &self,
        session_id: &str,
        parent_id: &str,
    ) -> Result<Option<SessionState>> {
        (**self).inherit_parent_state(session_id, parent_id)
    }

    fn list_sessions(&self) -> Result<Vec<String>> {
        (**self).list_sessions()
    }

    fn record_modified_file(&self, session_id: &str, path: &str) -> Result<SessionState> {
        (**self).record_modified_file(session_id, path)
    }
}
