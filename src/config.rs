//! Configuration loading for jjgate.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.jjgate/config.toml`)
//! 3. User config (`~/.jjgate/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GateError, Result};

/// Main configuration struct for jjgate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Gate behavior.
    pub gate: GateConfig,
    /// jj invocation settings.
    pub repo: RepoConfig,
    /// Foreign-VCS advisor settings.
    pub advisor: AdvisorConfig,
}

/// How the gate learns whether the working copy is unlocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStrategy {
    /// Read the session's cached state, refreshed at session start and
    /// after modifying tool calls.
    #[default]
    Cached,
    /// Query jj on every gated tool call.
    Live,
}

impl GateStrategy {
    /// Parse a strategy name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cached" => Some(Self::Cached),
            "live" => Some(Self::Live),
            _ => None,
        }
    }

    /// Name as written in config.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Live => "live",
        }
    }
}

/// Gate behavior configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    /// Where unlock status comes from.
    pub strategy: GateStrategy,
    /// Additional tools to exempt from the gate.
    pub extra_read_only_tools: Vec<String>,
    /// Tools to gate even if the built-in taxonomy exempts them.
    pub gated_tools: Vec<String>,
}

/// jj invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepoConfig {
    /// The jj executable.
    pub binary: String,
    /// Revision new changes start from when it exists.
    pub base_revision: String,
    /// Bookmark moved and pushed when publishing.
    pub default_bookmark: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            binary: "jj".to_string(),
            base_revision: "main@origin".to_string(),
            default_bookmark: "main".to_string(),
        }
    }
}

/// Foreign-VCS advisor settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Whether to attach git → jj hints to shell commands.
    pub enabled: bool,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(e) => {
                tracing::warn!(error = %e, "cwd unavailable, skipping project config");
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration for a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    fn load_user_config() -> Option<Config> {
        let path = jjgate_home()?.join("config.toml");
        Self::load_optional(&path)
    }

    fn load_project_config(cwd: &Path) -> Option<Config> {
        let path = project_config_dir(cwd).join("config.toml");
        Self::load_optional(&path)
    }

    /// A missing file is silent; a broken one is worth a warning.
    fn load_optional(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| GateError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| GateError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("JJGATE_STRATEGY") {
            match GateStrategy::parse(&val) {
                Some(strategy) => self.gate.strategy = strategy,
                None => tracing::warn!(
                    "Invalid JJGATE_STRATEGY value '{}'. Valid values: cached, live. Using '{}'.",
                    val,
                    self.gate.strategy.as_str()
                ),
            }
        }

        if let Ok(val) = env::var("JJGATE_JJ_BINARY") {
            if val.trim().is_empty() {
                tracing::warn!("JJGATE_JJ_BINARY is empty, using '{}'", self.repo.binary);
            } else {
                self.repo.binary = val;
            }
        }

        if let Ok(val) = env::var("JJGATE_BASE_REVISION") {
            if !val.trim().is_empty() {
                self.repo.base_revision = val;
            }
        }

        if let Ok(val) = env::var("JJGATE_BOOKMARK") {
            if !val.trim().is_empty() {
                self.repo.default_bookmark = val;
            }
        }

        if let Ok(val) = env::var("JJGATE_ADVISOR") {
            self.advisor.enabled = val == "true" || val == "1";
        }
    }

    /// Merge another config into this one, field by field.
    ///
    /// Values in `other` that differ from the defaults win; tool lists are
    /// unioned. A layer cannot set a value back to its default to undo a
    /// lower layer.
    fn merge(mut self, other: Config) -> Self {
        if other.gate.strategy != GateStrategy::default() {
            self.gate.strategy = other.gate.strategy;
        }
        union_into(
            &mut self.gate.extra_read_only_tools,
            other.gate.extra_read_only_tools,
        );
        union_into(&mut self.gate.gated_tools, other.gate.gated_tools);

        let default_repo = RepoConfig::default();
        if other.repo.binary != default_repo.binary {
            self.repo.binary = other.repo.binary;
        }
        if other.repo.base_revision != default_repo.base_revision {
            self.repo.base_revision = other.repo.base_revision;
        }
        if other.repo.default_bookmark != default_repo.default_bookmark {
            self.repo.default_bookmark = other.repo.default_bookmark;
        }

        if other.advisor.enabled != AdvisorConfig::default().enabled {
            self.advisor.enabled = other.advisor.enabled;
        }

        self
    }
}

fn union_into(target: &mut Vec<String>, extra: Vec<String>) {
    for item in extra {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

/// Get the jjgate home directory.
///
/// `JJGATE_HOME` if set and non-empty, otherwise `~/.jjgate`.
pub fn jjgate_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("JJGATE_HOME") {
        if home.is_empty() {
            tracing::warn!("JJGATE_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("JJGATE_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    dirs::home_dir().map(|home| home.join(".jjgate"))
}

/// Find the project root for a working directory.
///
/// The nearest ancestor holding `.jjgate/` wins, then the nearest holding
/// `.jj/`, then `cwd` itself.
pub fn find_project_root(cwd: &Path) -> PathBuf {
    for marker in [".jjgate", ".jj"] {
        if let Some(root) = cwd.ancestors().find(|a| a.join(marker).is_dir()) {
            return root.to_path_buf();
        }
    }
    cwd.to_path_buf()
}

/// The `.jjgate/` directory for a working directory.
pub fn project_config_dir(cwd: &Path) -> PathBuf {
    find_project_root(cwd).join(".jjgate")
}
