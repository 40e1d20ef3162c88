//! Jujutsu repository adapter.

use crate::config::RepoConfig;
use crate::error::{Conservative, Result};
use crate::repo::runner::CommandRunner;
use crate::repo::traits::{NewChange, Repository};

const CHANGE_ID_TEMPLATE: &str = "change_id.short()";
const DESCRIPTION_TEMPLATE: &str = "description";
const EMPTY_TEMPLATE: &str = "empty";
const COMMIT_ID_TEMPLATE: &str = "commit_id";
const BOOKMARKS_TEMPLATE: &str = "bookmarks";

/// [`Repository`] backed by the `jj` CLI.
#[derive(Debug, Clone)]
pub struct JjRepository<R> {
    runner: R,
    binary: String,
    base_revision: String,
}

impl<R: CommandRunner> JjRepository<R> {
    /// Adapter with default settings.
    pub fn new(runner: R) -> Self {
        Self::with_config(runner, &RepoConfig::default())
    }

    /// Adapter using the configured binary and base revision.
    pub fn with_config(runner: R, config: &RepoConfig) -> Self {
        Self {
            runner,
            binary: config.binary.clone(),
            base_revision: config.base_revision.clone(),
        }
    }

    /// The underlying runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn jj(&self, args: &[&str]) -> Result<String> {
        self.runner.capture_text(&self.binary, args)
    }

    fn log_template(&self, template: &str) -> Result<String> {
        self.jj(&["log", "-r", "@", "--no-graph", "-T", template])
    }

    fn change_id_after(&self, parent_id: Option<String>) -> NewChange {
        NewChange {
            change_id: self.current_change_id(),
            parent_id,
        }
    }
}

impl<R: CommandRunner> Repository for JjRepository<R> {
    fn is_repository(&self) -> bool {
        self.runner
            .run_nonfailing(&self.binary, &["root"])
            .map(|output| output.success())
            .conservative_default("jj root")
    }

    fn current_change_id(&self) -> Option<String> {
        let id = self
            .log_template(CHANGE_ID_TEMPLATE)
            .conservative_default("reading change id");
        (!id.is_empty()).then_some(id)
    }

    fn current_description(&self) -> String {
        self.log_template(DESCRIPTION_TEMPLATE)
            .conservative_default("reading description")
    }

    fn has_uncommitted_changes(&self) -> bool {
        self.log_template(EMPTY_TEMPLATE)
            .map(|empty| empty == "false")
            .conservative_default("reading working-copy status")
    }

    fn diff_summary(&self) -> String {
        self.jj(&["diff", "--stat"])
            .conservative_default("reading diffstat")
    }

    fn diff_files(&self) -> Vec<String> {
        self.jj(&["diff", "--name-only"])
            .map(|text| {
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(String::from)
                    .collect()
            })
            .conservative_default("listing modified files")
    }

    fn status(&self) -> String {
        self.jj(&["st"]).conservative_default("reading status")
    }

    fn current_bookmark(&self) -> Option<String> {
        let bookmarks = self
            .log_template(BOOKMARKS_TEMPLATE)
            .conservative_default("reading bookmarks");
        // Diverged or unpushed bookmarks carry a `*` or `?` suffix.
        bookmarks
            .split_whitespace()
            .next()
            .map(|name| name.trim_end_matches(['*', '?']).to_string())
            .filter(|name| !name.is_empty())
    }

    fn fetch(&self) -> Result<()> {
        self.jj(&["git", "fetch"]).map(drop)
    }

    fn new_change(&self, description: &str) -> Result<NewChange> {
        let based = self.jj(&["new", &self.base_revision, "-m", description]);
        if let Err(e) = based {
            tracing::debug!(
                base = %self.base_revision,
                error = %e,
                "base revision unavailable, starting change from @"
            );
            self.jj(&["new", "-m", description])?;
        }
        Ok(self.change_id_after(None))
    }

    fn new_change_from_current(&self, description: &str) -> Result<NewChange> {
        let parent_id = self.current_change_id();
        self.jj(&["new", "-m", description])?;
        Ok(self.change_id_after(parent_id))
    }

    fn describe(&self, message: &str) -> Result<()> {
        self.jj(&["describe", "-m", message]).map(drop)
    }

    fn abandon(&self) -> Result<()> {
        self.jj(&["abandon", "@"]).map(drop)
    }

    fn move_bookmark(&self, name: &str) -> Result<()> {
        let Err(move_err) = self.jj(&["bookmark", "move", name, "--to", "@"]) else {
            return Ok(());
        };
        self.jj(&["bookmark", "create", name, "-r", "@"])
            .map(drop)
            .map_err(|_| move_err)
    }

    fn push_bookmark(&self, name: &str) -> Result<()> {
        let Err(e) = self.jj(&["git", "push", "-b", name]) else {
            return Ok(());
        };
        tracing::debug!(bookmark = name, error = %e, "jj git push failed, pushing with git");

        let commit_id = self.log_template(COMMIT_ID_TEMPLATE)?;
        let refspec = format!("{}:{}", commit_id, name);
        self.runner
            .run("git", &["push", "origin", &refspec])
            .map(drop)
    }

    fn init_repository(&self) -> Result<()> {
        self.jj(&["git", "init"]).map(drop)
    }
}
