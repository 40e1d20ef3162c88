//! Foreign-VCS advisor.
//!
//! Spots `git` invocations in shell commands and suggests the `jj`
//! equivalent. Advisory only: it never blocks anything.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// git subcommand → jj equivalent.
pub const GIT_TO_JJ: &[(&str, &str)] = &[
    ("status", "jj st"),
    ("log", "jj log"),
    ("diff", "jj diff"),
    ("show", "jj show"),
    ("add", "(not needed - JJ auto-tracks all files)"),
    (
        "commit",
        "jj describe -m \"message\" (working copy is already a commit)",
    ),
    ("push", "jj_push() or jj git push -b <bookmark>"),
    ("checkout", "jj edit <change> or jj new <parent>"),
    ("switch", "jj edit <change>"),
    ("branch", "jj bookmark list / jj bookmark create"),
    ("reset", "jj restore or jj abandon"),
    ("reset --hard", "jj abandon"),
    ("stash", "(not needed - use jj new for parallel changes)"),
    ("cherry-pick", "jj rebase -r <change> -d <dest>"),
    ("revert", "jj backout -r <change>"),
    ("merge", "jj new <change1> <change2>"),
    ("rebase", "jj rebase -r <source> -d <dest>"),
    ("pull", "jj git fetch && jj rebase -d main@origin"),
    ("fetch", "jj git fetch"),
    ("clone", "jj git clone <url>"),
    ("init", "jj_git_init() or jj git init"),
    ("remote", "jj git remote"),
    ("tag", "jj bookmark (JJ uses bookmarks)"),
    ("clean", "jj restore --from @-"),
    ("blame", "jj file annotate <file>"),
    ("annotate", "jj file annotate <file>"),
    ("bisect", "(use jj log to find changes)"),
    ("am", "jj git import"),
    ("format-patch", "jj git export"),
];

// `git` must start a command, so `jj git fetch` is not reported.
static GIT_COMMAND: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[;&|(`\n])\s*(?:sudo\s+)?git\s+([a-z][a-z-]*)")
        .map_err(|e| tracing::warn!(error = %e, "git command pattern failed to compile"))
        .ok()
});

/// A detected git invocation and its jj counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignCommand {
    /// The git subcommand, lowercased.
    pub subcommand: String,
    /// Suggested jj command or explanatory note.
    pub suggestion: String,
}

impl ForeignCommand {
    /// One-line warning suitable for showing to the agent.
    pub fn message(&self) -> String {
        format!(
            "This is a jj repository: instead of `git {}`, use {}",
            self.subcommand, self.suggestion
        )
    }
}

/// Look up the jj equivalent for a git subcommand (case-insensitive).
pub fn suggestion_for(subcommand: &str) -> String {
    let key = subcommand.to_lowercase();
    GIT_TO_JJ
        .iter()
        .find(|(git, _)| *git == key)
        .map(|(_, jj)| (*jj).to_string())
        .unwrap_or_else(|| format!("jj {} (check jj --help)", key))
}

/// Detect a git invocation in `command`.
pub fn detect_foreign_command(command: &str) -> Option<ForeignCommand> {
    let captures = GIT_COMMAND.as_ref()?.captures(command)?;
    let subcommand = captures.get(1)?.as_str().to_lowercase();

    let suggestion = if subcommand == "reset" && command.contains("--hard") {
        suggestion_for("reset --hard")
    } else {
        suggestion_for(&subcommand)
    };

    Some(ForeignCommand {
        subcommand,
        suggestion,
    })
}
