//! Typed command execution.
//!
//! Everything jjgate learns about the repository comes from running
//! external programs. `CommandRunner` is the seam: production code uses
//! `SystemRunner`, tests script the outputs.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::error::{GateError, Result};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Trimmed stdout.
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }

    fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.status {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Render a command line for logs and errors.
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs external programs.
pub trait CommandRunner: Send + Sync {
    /// Run a command and return its output whatever the exit status.
    ///
    /// Fails only when the program could not be started.
    fn run_nonfailing(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Run a command, failing on a non-zero exit status.
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = self.run_nonfailing(program, args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(GateError::repository(
                command_line(program, args),
                output.failure_message(),
            ))
        }
    }

    /// Run a command and return its trimmed stdout.
    fn capture_text(&self, program: &str, args: &[&str]) -> Result<String> {
        Ok(self.run(program, args)?.text().to_string())
    }
}

/// Blanket implementation of CommandRunner for Arc-wrapped runners.
impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    fn run_nonfailing(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        (**self).run_nonfailing(program, args)
    }
}

/// Runs commands with `std::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    cwd: Option<PathBuf>,
}

impl SystemRunner {
    /// Runner using the process's current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner executing every command in `cwd`.
    pub fn in_dir(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
        }
    }

    /// Directory commands run in, if pinned.
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }
}

impl CommandRunner for SystemRunner {
    fn run_nonfailing(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut command = Command::new(program);
        command.args(args);
        if let Some(ref cwd) = self.cwd {
            command.current_dir(cwd);
        }

        tracing::debug!(command = %command_line(program, args), "running");

        let output = command
            .output()
            .map_err(|e| GateError::repository(command_line(program, args), e.to_string()))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
