//! Gate decision engine for jjgate.
//!
//! The gate keeps modifying tools locked until the session's jj working
//! copy has a purpose: a description, or changes already in progress.
//! Gate checks never fail; anything that goes wrong reads as locked.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::state::{RepoSnapshot, SessionState, SessionUpdate};
use crate::core::tools::ToolTaxonomy;
use crate::error::{Conservative, GateError, LockPhase, Result};
use crate::repo::Repository;
use crate::storage::SessionStore;

pub use crate::config::GateStrategy;

/// Shown when the working directory is not a jj repository.
pub const NOT_JJ_REPO_MESSAGE: &str = "This directory is not a jj repository. \
Run `jj git init` (or the jj_git_init tool) before modifying files.";

/// Shown when a modifying tool runs before the change is described.
pub const GATE_BLOCK_MESSAGE_PLANNING: &str = "The gate is locked: the current jj change has \
no description and no modifications. Describe what you are about to do first \
(`jj describe -m \"...\"` or `jj new -m \"...\"`), then retry.";

/// Shown when a file-editing tool runs before the change is described.
pub const GATE_BLOCK_MESSAGE_EXECUTION: &str = "Edit blocked: you are still planning. \
Files cannot be written until the current jj change states its intent. \
Run `jj describe -m \"...\"` (or `jj new -m \"...\"` for a fresh change), then retry the edit.";

/// Shown when a cached-strategy gate has no state for the session.
pub const SESSION_NOT_INITIALIZED_MESSAGE: &str = "The gate has no state for this session yet. \
Start the session through jjgate (session-start hook) so the repository can be inspected.";

/// Why a gate check denied a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    NotARepository,
    SessionNotInitialized,
    LockedPlanning,
    LockedExecution,
}

impl BlockReason {
    /// Locked reason for a tool.
    pub fn locked(is_execution: bool) -> Self {
        if is_execution {
            Self::LockedExecution
        } else {
            Self::LockedPlanning
        }
    }

    /// User-facing message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotARepository => NOT_JJ_REPO_MESSAGE,
            Self::SessionNotInitialized => SESSION_NOT_INITIALIZED_MESSAGE,
            Self::LockedPlanning => GATE_BLOCK_MESSAGE_PLANNING,
            Self::LockedExecution => GATE_BLOCK_MESSAGE_EXECUTION,
        }
    }

    /// Lock phase, for the two locked reasons.
    pub fn phase(&self) -> Option<LockPhase> {
        match self {
            Self::LockedPlanning => Some(LockPhase::Planning),
            Self::LockedExecution => Some(LockPhase::Execution),
            _ => None,
        }
    }

    /// The denial as an error, for callers that propagate it.
    pub fn into_error(self, session_id: &str, cwd: &Path) -> GateError {
        match self {
            Self::NotARepository => GateError::not_a_repository(cwd),
            Self::SessionNotInitialized => GateError::session_not_found(session_id),
            Self::LockedPlanning => GateError::gate_locked(LockPhase::Planning),
            Self::LockedExecution => GateError::gate_locked(LockPhase::Execution),
        }
    }
}

/// Verdict for one tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateCheckResult {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub is_execution: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<BlockReason>,
}

impl GateCheckResult {
    /// An approval.
    pub fn allow(is_execution: bool) -> Self {
        Self {
            allowed: true,
            message: None,
            is_execution,
            blocked_by: None,
        }
    }

    /// A denial with the reason's message.
    pub fn deny(reason: BlockReason, is_execution: bool) -> Self {
        Self {
            allowed: false,
            message: Some(reason.message().to_string()),
            is_execution,
            blocked_by: Some(reason),
        }
    }

    /// `Ok` when allowed, the denial as a [`GateError`] otherwise.
    pub fn into_result(self, session_id: &str, cwd: &Path) -> Result<()> {
        match self.blocked_by {
            None => Ok(()),
            Some(reason) => Err(reason.into_error(session_id, cwd)),
        }
    }
}

/// Mirror the repository into a session's state.
///
/// Creates the state when absent. An unlocked session stays unlocked even
/// if the repository no longer looks described.
pub fn refresh_session(
    store: &dyn SessionStore,
    repo: &dyn Repository,
    session_id: &str,
) -> Result<SessionState> {
    mirror_snapshot(store, session_id, &repo.snapshot())
}

fn mirror_snapshot(
    store: &dyn SessionStore,
    session_id: &str,
    snapshot: &RepoSnapshot,
) -> Result<SessionState> {
    let state = store.set_state(session_id, &snapshot.to_update())?;
    tracing::debug!(
        session_id,
        is_repo = state.is_repo,
        unlocked = state.gate_unlocked,
        change_id = state.change_id.as_deref().unwrap_or(""),
        "refreshed session"
    );
    Ok(state)
}

/// Decides whether tool calls may proceed.
pub struct GateEngine<'a> {
    store: &'a dyn SessionStore,
    repo: &'a dyn Repository,
    taxonomy: &'a ToolTaxonomy,
    strategy: GateStrategy,
    default_bookmark: Option<String>,
}

impl<'a> GateEngine<'a> {
    /// Create an engine using the cached strategy.
    pub fn new(
        store: &'a dyn SessionStore,
        repo: &'a dyn Repository,
        taxonomy: &'a ToolTaxonomy,
    ) -> Self {
        Self {
            store,
            repo,
            taxonomy,
            strategy: GateStrategy::default(),
            default_bookmark: None,
        }
    }

    /// Use a different strategy.
    pub fn with_strategy(mut self, strategy: GateStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Bookmark recorded on refresh when none points at the working copy.
    pub fn with_default_bookmark(mut self, bookmark: &str) -> Self {
        self.default_bookmark = (!bookmark.trim().is_empty()).then(|| bookmark.to_string());
        self
    }

    /// The active strategy.
    pub fn strategy(&self) -> GateStrategy {
        self.strategy
    }

    /// The taxonomy the engine consults.
    pub fn taxonomy(&self) -> &ToolTaxonomy {
        self.taxonomy
    }

    /// Decide whether `tool` may run in `session_id`.
    pub fn check_gate(&self, session_id: &str, tool: &str) -> GateCheckResult {
        if self.taxonomy.is_read_only(tool) {
            tracing::debug!(session_id, tool, "read-only tool allowed");
            return GateCheckResult::allow(false);
        }

        let is_execution = self.taxonomy.is_execution(tool);

        let verdict = match self.unlock_status(session_id) {
            Err(reason) => GateCheckResult::deny(reason, is_execution),
            Ok(true) => GateCheckResult::allow(is_execution),
            Ok(false) => GateCheckResult::deny(BlockReason::locked(is_execution), is_execution),
        };

        match verdict.blocked_by {
            None => tracing::debug!(session_id, tool, "gate open"),
            Some(reason) => tracing::info!(session_id, tool, ?reason, "gate denied tool"),
        }
        verdict
    }

    /// `Ok(unlocked)` when the repository is known, `Err` with the denial
    /// reason otherwise.
    fn unlock_status(&self, session_id: &str) -> std::result::Result<bool, BlockReason> {
        match self.strategy {
            GateStrategy::Live => {
                if !self.repo.is_repository() {
                    return Err(BlockReason::NotARepository);
                }
                let description = self.repo.current_description();
                Ok(!description.is_empty() || self.repo.has_uncommitted_changes())
            }
            GateStrategy::Cached => {
                let state = self
                    .store
                    .get_state(session_id)
                    .conservative_default("reading session state")
                    .ok_or(BlockReason::SessionNotInitialized)?;
                if !state.is_repo {
                    return Err(BlockReason::NotARepository);
                }
                Ok(state.gate_unlocked)
            }
        }
    }

    /// Check a tool, first initializing a missing cached state from the
    /// repository.
    ///
    /// A failed initialization leaves the session uninitialized, which
    /// denies.
    pub fn admit(&self, session_id: &str, tool: &str) -> GateCheckResult {
        if self.strategy == GateStrategy::Cached && self.taxonomy.is_gated(tool) {
            if let Err(e) = self.ensure_state(session_id) {
                tracing::warn!(session_id, error = %e, "could not initialize session state");
            }
        }
        self.check_gate(session_id, tool)
    }

    /// [`admit`](Self::admit), with a denial returned as an error.
    pub fn require(&self, session_id: &str, tool: &str, cwd: &Path) -> Result<()> {
        self.admit(session_id, tool).into_result(session_id, cwd)
    }

    /// Re-read the repository into the session's state.
    pub fn refresh(&self, session_id: &str) -> Result<SessionState> {
        let snapshot = self
            .repo
            .snapshot()
            .or_bookmark(self.default_bookmark.as_deref());
        mirror_snapshot(self.store, session_id, &snapshot)
    }

    /// The session's state, refreshing from the repository when absent.
    pub fn ensure_state(&self, session_id: &str) -> Result<SessionState> {
        match self.store.get_state(session_id)? {
            Some(state) => Ok(state),
            None => self.refresh(session_id),
        }
    }

    /// Explicitly relock a session.
    pub fn relock(&self, session_id: &str) -> Result<SessionState> {
        tracing::info!(session_id, "relocking gate");
        self.store.set_state(session_id, &SessionUpdate::relock())
    }
}
