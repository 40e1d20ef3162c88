//! Core types and logic for jjgate.
//!
//! This module contains the session state types, the tool taxonomy and
//! the gate decision engine.

pub mod gate;
pub mod state;
pub mod tools;

pub use gate::{
    refresh_session, BlockReason, GateCheckResult, GateEngine, GateStrategy,
    GATE_BLOCK_MESSAGE_EXECUTION, GATE_BLOCK_MESSAGE_PLANNING, NOT_JJ_REPO_MESSAGE,
    SESSION_NOT_INITIALIZED_MESSAGE,
};
pub use state::{RepoSnapshot, SessionState, SessionUpdate, DEFAULT_WORKSPACE};
pub use tools::{
    describe_tool, is_execution_tool, is_gated_tool, is_modifying_tool, is_read_only_tool, is_shell_tool,
    ToolCategory, ToolTaxonomy,
};
