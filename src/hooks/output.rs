//! Hook output types.
//!
//! These types represent the JSON jjgate writes to stdout for the agent
//! host.

use serde::{Deserialize, Serialize};

use crate::core::{BlockReason, GateCheckResult};
use crate::error::{exit_codes, GateError, Result};

/// Output for the pre-tool-use hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PreToolUseOutput {
    /// Whether to allow the tool invocation.
    #[serde(default = "default_true")]
    pub allow: bool,
    /// Block reason or advisory note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Why the gate denied, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<BlockReason>,
}

fn default_true() -> bool {
    true
}

impl PreToolUseOutput {
    /// Create an allow output.
    pub fn allow() -> Self {
        Self {
            allow: true,
            message: None,
            blocked_by: None,
        }
    }

    /// Create an allow output with a message.
    pub fn allow_with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::allow()
        }
    }

    /// Translate a gate verdict.
    pub fn from_gate(result: GateCheckResult) -> Self {
        Self {
            allow: result.allowed,
            message: result.message,
            blocked_by: result.blocked_by,
        }
    }

    /// Prepend an advisory note, keeping any existing message after it.
    pub fn with_advisory(mut self, advisory: Option<String>) -> Self {
        if let Some(note) = advisory {
            self.message = Some(match self.message.take() {
                Some(existing) => format!("{}\n\n{}", note, existing),
                None => note,
            });
        }
        self
    }

    /// Process exit code for this output.
    pub fn exit_code(&self) -> i32 {
        if self.allow {
            exit_codes::APPROVE
        } else {
            exit_codes::BLOCK
        }
    }
}

/// Output for the session-start hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionStartOutput {
    /// Additional context to inject into the session.
    #[serde(rename = "additionalContext", skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
    /// Optional message for logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SessionStartOutput {
    /// Create an empty output (no context injection).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create an output with additional context.
    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            additional_context: Some(context.into()),
            message: None,
        }
    }
}

/// Output for the post-tool-use hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PostToolUseOutput {
    /// Optional message for logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PostToolUseOutput {
    /// Create an empty output.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create an output with a message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

/// Output for the session-end hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionEndOutput {
    /// Optional message for logging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SessionEndOutput {
    /// Create an empty output.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create an output with a message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

/// Serialize output to JSON.
pub fn to_json<T: Serialize>(output: &T) -> Result<String> {
    serde_json::to_string(output)
        .map_err(|e| GateError::serde(format!("Failed to serialize output: {}", e)))
}

/// Serialize output to pretty JSON.
pub fn to_json_pretty<T: Serialize>(output: &T) -> Result<String> {
    serde_json::to_string_pretty(output)
        .map_err(|e| GateError::serde(format!("Failed to serialize output: {}", e)))
}
