//! Hook input types.
//!
//! These types represent the JSON the agent host passes to jjgate hooks
//! on stdin.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};

/// Common input fields shared by all hooks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HookInput {
    /// Unique session identifier.
    pub session_id: String,
    /// Current working directory.
    #[serde(default)]
    pub cwd: PathBuf,
}

impl HookInput {
    /// Create a new hook input.
    pub fn new(session_id: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            cwd: cwd.into(),
        }
    }
}

/// Input for session-start hook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionStartInput {
    /// Common hook input fields.
    #[serde(flatten)]
    pub common: HookInput,
    /// Set when the host spawned this session as a subagent.
    #[serde(default, alias = "parentSessionId", alias = "parent_id")]
    pub parent_session_id: Option<String>,
}

impl SessionStartInput {
    /// Create a new session-start input.
    pub fn new(common: HookInput) -> Self {
        Self {
            common,
            parent_session_id: None,
        }
    }

    /// Mark the session as a child of `parent`.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_session_id = Some(parent.into());
        self
    }
}

/// Input for pre-tool-use and post-tool-use hooks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolUseInput {
    /// Common hook input fields.
    #[serde(flatten)]
    pub common: HookInput,
    /// The name of the tool being invoked.
    pub tool_name: String,
    /// The tool input (as JSON value).
    #[serde(default)]
    pub tool_input: serde_json::Value,
}

impl ToolUseInput {
    /// Create a new tool-use input.
    pub fn new(common: HookInput, tool_name: impl Into<String>, tool_input: serde_json::Value) -> Self {
        Self {
            common,
            tool_name: tool_name.into(),
            tool_input,
        }
    }

    /// The shell command, for shell tools.
    pub fn command(&self) -> Option<&str> {
        self.string_field(&["command"])
    }

    /// The file a tool edits, under any of the names hosts use for it.
    pub fn file_path(&self) -> Option<&str> {
        self.string_field(&["file_path", "filePath", "path"])
    }

    fn string_field(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.tool_input.get(key).and_then(|v| v.as_str()))
            .filter(|s| !s.trim().is_empty())
    }
}

/// Input for pre-tool-use hook.
pub type PreToolUseInput = ToolUseInput;

/// Input for post-tool-use hook.
pub type PostToolUseInput = ToolUseInput;

/// Input for session-end hook.
pub type SessionEndInput = HookInput;

/// Parse hook input from JSON.
pub fn parse_input<T: for<'de> Deserialize<'de>>(json: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| GateError::serde(format!("Failed to parse hook input: {}", e)))
}
