//! jjgate - change-description gate for agent sessions
//!
//! jjgate keeps an agent from modifying a Jujutsu repository until the
//! working-copy change states its purpose. It classifies tool calls and
//! shell commands, mirrors repository state into per-session records, and
//! answers the agent host's hook events.

pub mod config;
pub mod core;
pub mod error;
pub mod hooks;
pub mod repo;
pub mod shell;
pub mod storage;

pub use config::{Config, GateStrategy};
pub use core::{
    BlockReason, GateCheckResult, GateEngine, RepoSnapshot, SessionState, SessionUpdate,
    ToolCategory, ToolTaxonomy,
};
pub use error::{GateError, LockPhase, Result};
pub use hooks::{HookRunner, HookType};
pub use repo::{CommandRunner, JjRepository, Repository, SystemRunner};
pub use shell::{classify, detect_foreign_command, CommandClassification, ForeignCommand};
pub use storage::{MemorySessionStore, SessionStore};
