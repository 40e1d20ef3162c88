//! Error types for jjgate.
//!
//! The gate itself never surfaces errors to its caller: a failed repository
//! query degrades to "not a repository" or "locked". Errors exist for the
//! layers around the gate (repository mutations, config, hook I/O) and are
//! turned into conservative defaults through [`Conservative`].

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Which part of the workflow a locked gate refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPhase {
    /// A general modifying tool before intent was declared.
    Planning,
    /// A direct edit tool before intent was declared.
    Execution,
}

impl std::fmt::Display for LockPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Planning => write!(f, "planning"),
            Self::Execution => write!(f, "execution"),
        }
    }
}

/// The main error type for jjgate operations.
#[derive(Error, Debug)]
pub enum GateError {
    /// The working directory is not under jj.
    #[error("not a jj repository: {path}")]
    NotARepository { path: PathBuf },

    /// A gated tool was attempted while the gate is locked.
    #[error("gate locked ({phase})")]
    GateLocked { phase: LockPhase },

    /// An external jj/git invocation failed or could not be spawned.
    #[error("repository command `{command}` failed: {message}")]
    RepositoryQuery { command: String, message: String },

    /// I/O errors from config or hook stream handling.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// Session not found in the store.
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },
}

/// A specialized Result type for jjgate operations.
pub type Result<T> = std::result::Result<T, GateError>;

impl GateError {
    /// Create a not-a-repository error.
    pub fn not_a_repository(path: impl Into<PathBuf>) -> Self {
        Self::NotARepository { path: path.into() }
    }

    /// Create a gate-locked error.
    pub fn gate_locked(phase: LockPhase) -> Self {
        Self::GateLocked { phase }
    }

    /// Create a repository query error.
    pub fn repository(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RepositoryQuery {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a session not found error.
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }
}

impl From<io::Error> for GateError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Recover a failed result to a conservative value.
///
/// Used wherever a failure must not reach the caller: the error is logged
/// and the fallback (usually "no", empty, or locked) is returned instead.
pub trait Conservative<T> {
    /// Log the error and return `T::default()`.
    fn conservative_default(self, context: &str) -> T
    where
        T: Default;

    /// Log the error and return the provided fallback.
    fn conservative_or(self, context: &str, fallback: T) -> T;
}

impl<T> Conservative<T> for Result<T> {
    fn conservative_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (using default)", context, err);
                T::default()
            }
        }
    }

    fn conservative_or(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the jjgate binary.
///
/// Hook hosts read these to decide whether the tool call proceeds.
pub mod exit_codes {
    /// Allow the action.
    pub const APPROVE: i32 = 0;

    /// Block the action; the reason is on stderr.
    pub const BLOCK: i32 = 2;

    /// The binary panicked.
    pub const CRASH: i32 = 3;
}
