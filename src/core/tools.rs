//! Tool taxonomy.
//!
//! Every tool the agent can call falls into one of four categories. Only
//! the gate-exempt set is listed positively; anything else is gated, so a
//! tool the taxonomy has never heard of cannot slip past the gate.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::GateConfig;

/// Tools that write file contents directly.
pub const EXECUTION_TOOLS: &[&str] = &[
    "write",
    "edit",
    "multiedit",
    "notebookedit",
    "lsp_rename",
    "lsp_code_action_resolve",
    "ast_grep_replace",
];

/// Tools that modify something. Includes all of [`EXECUTION_TOOLS`].
pub const MODIFYING_TOOLS: &[&str] = &[
    "write",
    "edit",
    "multiedit",
    "notebookedit",
    "lsp_rename",
    "lsp_code_action_resolve",
    "ast_grep_replace",
    "todowrite",
];

/// Pure inspection tools.
pub const INSPECTION_TOOLS: &[&str] = &[
    "read",
    "glob",
    "grep",
    "ls",
    "lsp_hover",
    "lsp_goto_definition",
    "lsp_find_references",
    "lsp_document_symbols",
    "lsp_workspace_symbols",
    "lsp_diagnostics",
    "lsp_servers",
    "lsp_prepare_rename",
    "lsp_code_actions",
    "ast_grep_search",
    "webfetch",
    "websearch",
    "context7_resolve-library-id",
    "context7_query-docs",
    "grep_app_searchgithub",
    "websearch_exa_web_search_exa",
    "supermemory",
    "todoread",
    "look_at",
];

/// Workflow tools the gate lets through even though they can change state:
/// they are how a session declares intent, delegates, or drives jj.
pub const WORKFLOW_TOOLS: &[&str] = &[
    "task",
    "background_task",
    "background_output",
    "background_cancel",
    "call_omo_agent",
    "interactive_bash",
    "jj",
    "jj_status",
    "jj_push",
    "jj_git_init",
    "jj_undo",
    "jj_describe",
    "jj_abandon",
    "jj_workspace",
    "jj_workspaces",
    "jj_cleanup",
    "skill",
    "slashcommand",
];

/// Tools that run free-text shell commands. Gated, but the host may let a
/// read-only command through after classifying it.
pub const SHELL_TOOLS: &[&str] = &["bash"];

/// How the gate treats a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Inspection only. Never gated.
    ReadOnly,
    /// Modifies state; gated. Unknown tools land here too.
    Modifying,
    /// Writes file contents directly; gated with the stricter message.
    Execution,
    /// Workflow tool exempt from the gate.
    Ungated,
}

impl ToolCategory {
    /// Category under the built-in taxonomy.
    pub fn of(tool: &str) -> Self {
        ToolTaxonomy::default().category(tool)
    }

    /// Whether tools in this category must pass the gate.
    pub fn is_gated(&self) -> bool {
        matches!(self, Self::Modifying | Self::Execution)
    }

    /// Name as used in config and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::Modifying => "modifying",
            Self::Execution => "execution",
            Self::Ungated => "ungated",
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn normalize(tool: &str) -> String {
    tool.trim().to_ascii_lowercase()
}

fn contains(set: &[&str], tool: &str) -> bool {
    let tool = normalize(tool);
    set.contains(&tool.as_str())
}

/// Whether the tool is in the built-in gate-exempt set.
pub fn is_read_only_tool(tool: &str) -> bool {
    contains(INSPECTION_TOOLS, tool) || contains(WORKFLOW_TOOLS, tool)
}

/// Whether the tool is in the built-in modifying set.
pub fn is_modifying_tool(tool: &str) -> bool {
    contains(MODIFYING_TOOLS, tool)
}

/// Whether the tool writes file contents directly.
pub fn is_execution_tool(tool: &str) -> bool {
    contains(EXECUTION_TOOLS, tool)
}

/// Whether the tool runs shell commands.
pub fn is_shell_tool(tool: &str) -> bool {
    contains(SHELL_TOOLS, tool)
}

/// Whether the tool must pass the gate. Derived, never listed separately.
pub fn is_gated_tool(tool: &str) -> bool {
    !is_read_only_tool(tool)
}

/// One-line explanation of how the gate treats a tool.
pub fn describe_tool(tool: &str, category: ToolCategory) -> String {
    match category {
        ToolCategory::ReadOnly => format!("{}: read-only, never gated", tool),
        ToolCategory::Ungated => format!("{}: workflow tool, exempt from the gate", tool),
        ToolCategory::Modifying => format!("{}: modifying, blocked while the gate is locked", tool),
        ToolCategory::Execution => format!(
            "{}: writes files, blocked until the change is described",
            tool
        ),
    }
}

/// The built-in taxonomy adjusted by project config.
#[derive(Debug, Clone, Default)]
pub struct ToolTaxonomy {
    extra_read_only: HashSet<String>,
    forced_gated: HashSet<String>,
}

impl ToolTaxonomy {
    /// Taxonomy with config overrides applied.
    ///
    /// `gated_tools` wins over both the built-in exempt set and
    /// `extra_read_only_tools`.
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            extra_read_only: config.extra_read_only_tools.iter().map(|t| normalize(t)).collect(),
            forced_gated: config.gated_tools.iter().map(|t| normalize(t)).collect(),
        }
    }

    /// Whether the tool is exempt from the gate.
    pub fn is_read_only(&self, tool: &str) -> bool {
        let key = normalize(tool);
        if self.forced_gated.contains(&key) {
            return false;
        }
        self.extra_read_only.contains(&key) || is_read_only_tool(&key)
    }

    /// Whether the tool must pass the gate.
    pub fn is_gated(&self, tool: &str) -> bool {
        !self.is_read_only(tool)
    }

    /// Whether a denial should use the execution message.
    pub fn is_execution(&self, tool: &str) -> bool {
        is_execution_tool(tool)
    }

    /// Categorize a tool.
    pub fn category(&self, tool: &str) -> ToolCategory {
        if self.is_gated(tool) {
            if is_execution_tool(tool) {
                ToolCategory::Execution
            } else {
                ToolCategory::Modifying
            }
        } else if contains(WORKFLOW_TOOLS, tool) {
            ToolCategory::Ungated
        } else {
            ToolCategory::ReadOnly
        }
    }
}
