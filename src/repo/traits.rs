//! Repository traits for jjgate.

use serde::{Deserialize, Serialize};

use crate::core::RepoSnapshot;
use crate::error::Result;

/// Change ids reported after creating a change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChange {
    /// The new change, if jj reported it.
    pub change_id: Option<String>,
    /// The change `@` pointed at before, when requested.
    pub parent_id: Option<String>,
}

/// The version-control operations the gate depends on.
///
/// Queries never fail: a broken or missing repository reads as "no",
/// empty or `None`. Mutations report failure through `Result`.
pub trait Repository: Send + Sync {
    /// Whether the working directory is inside a repository.
    fn is_repository(&self) -> bool;

    /// Short change id of the working-copy change.
    fn current_change_id(&self) -> Option<String>;

    /// Description of the working-copy change. Empty when undescribed.
    fn current_description(&self) -> String;

    /// Whether the working-copy change has modifications.
    fn has_uncommitted_changes(&self) -> bool;

    /// Diffstat of the working-copy change.
    fn diff_summary(&self) -> String;

    /// Paths modified in the working-copy change.
    fn diff_files(&self) -> Vec<String>;

    /// Human-readable status.
    fn status(&self) -> String;

    /// First bookmark pointing at the working-copy change.
    fn current_bookmark(&self) -> Option<String> {
        None
    }

    /// Fetch from the remote.
    fn fetch(&self) -> Result<()>;

    /// Start a new change on top of the base revision.
    fn new_change(&self, description: &str) -> Result<NewChange>;

    /// Start a new change on top of the working-copy change.
    fn new_change_from_current(&self, description: &str) -> Result<NewChange>;

    /// Set the working-copy change's description.
    fn describe(&self, message: &str) -> Result<()>;

    /// Abandon the working-copy change.
    fn abandon(&self) -> Result<()>;

    /// Point a bookmark at the working-copy change, creating it if needed.
    fn move_bookmark(&self, name: &str) -> Result<()>;

    /// Push a bookmark to the remote.
    fn push_bookmark(&self, name: &str) -> Result<()>;

    /// Initialize a repository in the working directory.
    fn init_repository(&self) -> Result<()>;

    /// Capture the facts the gate caches.
    fn snapshot(&self) -> RepoSnapshot {
        if !self.is_repository() {
            return RepoSnapshot::not_a_repository();
        }
        RepoSnapshot {
            is_repo: true,
            change_id: self.current_change_id(),
            description: self.current_description(),
            has_changes: self.has_uncommitted_changes(),
            bookmark: self.current_bookmark(),
        }
    }
}
