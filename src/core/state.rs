//! Session state types for jjgate.
//!
//! A `SessionState` is the gate's cached view of one agent session: whether
//! its jj working copy has been given a purpose yet, which change it is on,
//! and which files it has touched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default jj workspace name.
pub const DEFAULT_WORKSPACE: &str = "default";

/// Per-session gate state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    /// Session identifier from the host.
    pub id: String,
    /// Whether modifying tools may run.
    pub gate_unlocked: bool,
    /// Short jj change id of `@`, if known.
    pub change_id: Option<String>,
    /// Description of `@`. Empty until described.
    pub change_description: String,
    /// Whether the session's directory is a jj repository.
    #[serde(default = "default_true")]
    pub is_repo: bool,
    /// Files this session modified, in first-touch order.
    #[serde(default)]
    pub modified_files: Vec<String>,
    /// Bookmark the session publishes to, if any.
    pub bookmark: Option<String>,
    /// jj workspace name.
    pub workspace: String,
    /// Filesystem path of the workspace.
    #[serde(default)]
    pub workspace_path: String,
    /// Set when inherited from a parent (subagent) session.
    pub parent_session_id: Option<String>,
    /// When the state was created.
    pub created_at: DateTime<Utc>,
    /// When the state was last updated.
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl SessionState {
    /// Create a locked state for a session.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            gate_unlocked: false,
            change_id: None,
            change_description: String::new(),
            is_repo: true,
            modified_files: Vec::new(),
            bookmark: None,
            workspace: DEFAULT_WORKSPACE.to_string(),
            workspace_path: String::new(),
            parent_session_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a state with `update` applied over the defaults.
    pub fn with_update(id: impl Into<String>, update: &SessionUpdate) -> Self {
        let mut state = Self::new(id);
        update.apply_to(&mut state);
        state
    }

    /// Derive a child session's state from this one.
    ///
    /// Everything is copied except `modified_files`, which starts empty, and
    /// the timestamps, which start now.
    pub fn inherit(&self, child_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: child_id.into(),
            modified_files: Vec::new(),
            parent_session_id: Some(self.id.clone()),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Record a modified file. Returns false if it was already recorded.
    pub fn record_modified_file(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.modified_files.contains(&path) {
            return false;
        }
        self.modified_files.push(path);
        self.touch();
        true
    }

    /// Whether this state was inherited from a parent session.
    pub fn is_subagent(&self) -> bool {
        self.parent_session_id.is_some()
    }

    /// Update the session's updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Partial update for a [`SessionState`]. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub gate_unlocked: Option<bool>,
    pub change_id: Option<String>,
    pub change_description: Option<String>,
    pub is_repo: Option<bool>,
    pub modified_files: Option<Vec<String>>,
    pub bookmark: Option<String>,
    pub workspace: Option<String>,
    pub workspace_path: Option<String>,
}

impl SessionUpdate {
    /// An update that only unlocks the gate.
    pub fn unlock() -> Self {
        Self {
            gate_unlocked: Some(true),
            ..Self::default()
        }
    }

    /// An update that only relocks the gate.
    pub fn relock() -> Self {
        Self {
            gate_unlocked: Some(false),
            ..Self::default()
        }
    }

    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the set fields into `state` and bump `updated_at`.
    pub fn apply_to(&self, state: &mut SessionState) {
        if let Some(unlocked) = self.gate_unlocked {
            state.gate_unlocked = unlocked;
        }
        if let Some(ref change_id) = self.change_id {
            state.change_id = Some(change_id.clone());
        }
        if let Some(ref description) = self.change_description {
            state.change_description = description.clone();
        }
        if let Some(is_repo) = self.is_repo {
            state.is_repo = is_repo;
        }
        if let Some(ref files) = self.modified_files {
            state.modified_files = files.clone();
        }
        if let Some(ref bookmark) = self.bookmark {
            state.bookmark = Some(bookmark.clone());
        }
        if let Some(ref workspace) = self.workspace {
            state.workspace = workspace.clone();
        }
        if let Some(ref path) = self.workspace_path {
            state.workspace_path = path.clone();
        }
        state.touch();
    }
}

/// Repository facts captured at a refresh point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSnapshot {
    pub is_repo: bool,
    pub change_id: Option<String>,
    pub description: String,
    pub has_changes: bool,
    pub bookmark: Option<String>,
}

impl RepoSnapshot {
    /// Snapshot of a directory that is not a jj repository.
    pub fn not_a_repository() -> Self {
        Self::default()
    }

    /// Fill in `bookmark` when no bookmark points at the working copy.
    ///
    /// Outside a repository the snapshot is returned unchanged.
    pub fn or_bookmark(mut self, fallback: Option<&str>) -> Self {
        if self.is_repo && self.bookmark.is_none() {
            self.bookmark = fallback.map(str::to_string);
        }
        self
    }

    /// A described or already-modified change unlocks the gate.
    pub fn unlocks(&self) -> bool {
        self.is_repo && (!self.description.is_empty() || self.has_changes)
    }

    /// Update mirroring this snapshot into a session.
    ///
    /// Never carries `gate_unlocked: Some(false)`: a refresh can unlock but
    /// not relock.
    pub fn to_update(&self) -> SessionUpdate {
        if !self.is_repo {
            return SessionUpdate {
                is_repo: Some(false),
                ..SessionUpdate::default()
            };
        }
        SessionUpdate {
            gate_unlocked: self.unlocks().then_some(true),
            change_id: self.change_id.clone(),
            change_description: Some(self.description.clone()),
            is_repo: Some(true),
            bookmark: self.bookmark.clone(),
            ..SessionUpdate::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn described_snapshot() -> RepoSnapshot {
        RepoSnapshot {
            is_repo: true,
            change_id: Some("qpvuntsm".to_string()),
            description: "Add gate".to_string(),
            has_changes: false,
            bookmark: None,
        }
    }

    #[test]
    fn test_new_state_defaults() {
        let state = SessionState::new("s1");
        assert_eq!(state.id, "s1");
        assert!(!state.gate_unlocked);
        assert!(state.change_id.is_none());
        assert!(state.change_description.is_empty());
        assert!(state.is_repo);
        assert!(state.modified_files.is_empty());
        assert_eq!(state.workspace, "default");
        assert!(state.parent_session_id.is_none());
    }

    #[test]
    fn test_update_merges_only_set_fields() {
        let mut state = SessionState::new("s1");
        state.change_description = "keep me".to_string();

        let update = SessionUpdate {
            gate_unlocked: Some(true),
            bookmark: Some("feature".to_string()),
            ..SessionUpdate::default()
        };
        update.apply_to(&mut state);

        assert!(state.gate_unlocked);
        assert_eq!(state.bookmark.as_deref(), Some("feature"));
        assert_eq!(state.change_description, "keep me");
    }

    #[test]
    fn test_relock_is_explicit() {
        let mut state = SessionState::with_update("s1", &SessionUpdate::unlock());
        assert!(state.gate_unlocked);

        SessionUpdate::default().apply_to(&mut state);
        assert!(state.gate_unlocked);

        SessionUpdate::relock().apply_to(&mut state);
        assert!(!state.gate_unlocked);
    }

    #[test]
    fn test_inherit_copies_gate_but_not_files() {
        let mut parent = SessionState::with_update("parent", &described_snapshot().to_update());
        parent.record_modified_file("src/lib.rs");
        parent.workspace_path = "/work/repo".to_string();

        let child = parent.inherit("child");

        assert_eq!(child.id, "child");
        assert!(child.gate_unlocked);
        assert_eq!(child.is_repo, parent.is_repo);
        assert_eq!(child.change_id, parent.change_id);
        assert_eq!(child.change_description, "Add gate");
        assert_eq!(child.workspace_path, "/work/repo");
        assert!(child.modified_files.is_empty());
        assert_eq!(child.parent_session_id.as_deref(), Some("parent"));
        assert!(child.is_subagent());
        assert!(!parent.is_subagent());
    }

    #[test]
    fn test_record_modified_file_dedups_in_order() {
        let mut state = SessionState::new("s1");
        assert!(state.record_modified_file("b.rs"));
        assert!(state.record_modified_file("a.rs"));
        assert!(!state.record_modified_file("b.rs"));
        assert_eq!(state.modified_files, vec!["b.rs", "a.rs"]);
    }

    #[test]
    fn test_snapshot_unlocks() {
        assert!(described_snapshot().unlocks());

        let modified = RepoSnapshot {
            is_repo: true,
            has_changes: true,
            ..RepoSnapshot::default()
        };
        assert!(modified.unlocks());

        let pristine = RepoSnapshot {
            is_repo: true,
            ..RepoSnapshot::default()
        };
        assert!(!pristine.unlocks());
        assert!(!RepoSnapshot::not_a_repository().unlocks());
    }

    #[test]
    fn test_snapshot_update_never_relocks() {
        let pristine = RepoSnapshot {
            is_repo: true,
            change_id: Some("zzzz".to_string()),
            ..RepoSnapshot::default()
        };
        let update = pristine.to_update();
        assert_eq!(update.gate_unlocked, None);

        let mut state = SessionState::with_update("s1", &SessionUpdate::unlock());
        update.apply_to(&mut state);
        assert!(state.gate_unlocked);
        assert_eq!(state.change_id.as_deref(), Some("zzzz"));
    }

    #[test]
    fn test_or_bookmark_fills_only_missing() {
        let snapshot = described_snapshot().or_bookmark(Some("main"));
        assert_eq!(snapshot.bookmark.as_deref(), Some("main"));

        let snapshot = RepoSnapshot {
            bookmark: Some("feature".to_string()),
            ..described_snapshot()
        }
        .or_bookmark(Some("main"));
        assert_eq!(snapshot.bookmark.as_deref(), Some("feature"));

        let snapshot = RepoSnapshot::not_a_repository().or_bookmark(Some("main"));
        assert!(snapshot.bookmark.is_none());
    }

    #[test]
    fn test_not_a_repository_update() {
        let update = RepoSnapshot::not_a_repository().to_update();
        assert_eq!(update.is_repo, Some(false));
        assert_eq!(update.gate_unlocked, None);
        assert!(update.change_description.is_none());
    }

    #[test]
    fn test_state_serde_roundtrip() {
        let mut state = SessionState::with_update("s1", &described_snapshot().to_update());
        state.record_modified_file("README.md");

        let json = serde_json::to_string(&state).unwrap();
        let parsed: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, parsed);
    }

    #[test]
    fn test_empty_update() {
        assert!(SessionUpdate::default().is_empty());
        assert!(!SessionUpdate::unlock().is_empty());
    }
}
