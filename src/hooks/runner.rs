//! Hook runner for jjgate.
//!
//! This module implements the hook dispatch and individual hook handlers.
//! Each handler reads one JSON event, consults the store and gate, and
//! produces the JSON reply plus the exit code the host acts on.

use std::io::{self, Read};
use std::path::Path;

use crate::config::Config;
use crate::core::gate::GateEngine;
use crate::core::state::{SessionState, SessionUpdate};
use crate::core::tools::{is_shell_tool, ToolCategory, ToolTaxonomy};
use crate::error::{exit_codes, Conservative, GateError, Result};
use crate::hooks::input::{
    parse_input, HookInput, PostToolUseInput, PreToolUseInput, SessionEndInput, SessionStartInput,
};
use crate::hooks::output::{
    to_json, PostToolUseOutput, PreToolUseOutput, SessionEndOutput, SessionStartOutput,
};
use crate::repo::{JjRepository, Repository, SystemRunner};
use crate::shell::{classify, declares_intent, detect_foreign_command};
use crate::storage::SessionStore;

/// Builds the repository for a hook's working directory.
pub type RepositoryFactory = Box<dyn Fn(&Path) -> Box<dyn Repository> + Send + Sync>;

/// Hook type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookType {
    /// Session start hook.
    SessionStart,
    /// Pre-tool-use hook.
    PreToolUse,
    /// Post-tool-use hook.
    PostToolUse,
    /// Session end hook.
    SessionEnd,
}

impl HookType {
    /// Parse hook type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "session-start" | "sessionstart" | "session_start" => Some(Self::SessionStart),
            "pre-tool-use" | "pretooluse" | "pre_tool_use" => Some(Self::PreToolUse),
            "post-tool-use" | "posttooluse" | "post_tool_use" => Some(Self::PostToolUse),
            "session-end" | "sessionend" | "session_end" => Some(Self::SessionEnd),
            _ => None,
        }
    }

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionStart => "session-start",
            Self::PreToolUse => "pre-tool-use",
            Self::PostToolUse => "post-tool-use",
            Self::SessionEnd => "session-end",
        }
    }
}

/// What a hook produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookResponse {
    /// JSON for stdout.
    pub output: String,
    /// Process exit code.
    pub exit_code: i32,
    /// Block reason to mirror on stderr.
    pub block_message: Option<String>,
}

impl HookResponse {
    fn approve(output: String) -> Self {
        Self {
            output,
            exit_code: exit_codes::APPROVE,
            block_message: None,
        }
    }

    fn pre_tool_use(output: &PreToolUseOutput) -> Result<Self> {
        Ok(Self {
            output: to_json(output)?,
            exit_code: output.exit_code(),
            block_message: if output.allow {
                None
            } else {
                output.message.clone()
            },
        })
    }
}

/// Hook runner context.
pub struct HookRunner<S: SessionStore> {
    /// Session storage.
    store: S,
    /// Configuration.
    config: Config,
    /// Built-in tool sets plus config overrides.
    taxonomy: ToolTaxonomy,
    /// Repository for a hook's cwd.
    repositories: RepositoryFactory,
}

impl<S: SessionStore> HookRunner<S> {
    /// Create a new hook runner talking to jj through the system shell.
    pub fn new(store: S, config: Config) -> Self {
        let repo_config = config.repo.clone();
        let repositories: RepositoryFactory = Box::new(move |cwd: &Path| -> Box<dyn Repository> {
            let runner = if cwd.as_os_str().is_empty() {
                SystemRunner::new()
            } else {
                SystemRunner::in_dir(cwd)
            };
            Box::new(JjRepository::with_config(runner, &repo_config))
        });
        Self::with_repositories(store, config, repositories)
    }

    /// Create a hook runner with a custom repository factory.
    pub fn with_repositories(store: S, config: Config, repositories: RepositoryFactory) -> Self {
        let taxonomy = ToolTaxonomy::from_config(&config.gate);
        Self {
            store,
            config,
            taxonomy,
            repositories,
        }
    }

    /// The session store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run a hook with provided input.
    pub fn run_with_input(&self, hook_type: HookType, input: &str) -> Result<HookResponse> {
        match hook_type {
            HookType::SessionStart => self.handle_session_start(input),
            HookType::PreToolUse => self.handle_pre_tool_use(input),
            HookType::PostToolUse => self.handle_post_tool_use(input),
            HookType::SessionEnd => self.handle_session_end(input),
        }
    }

    fn engine<'a>(&'a self, repo: &'a dyn Repository) -> GateEngine<'a> {
        GateEngine::new(&self.store, repo, &self.taxonomy)
            .with_strategy(self.config.gate.strategy)
            .with_default_bookmark(&self.config.repo.default_bookmark)
    }

    // =========================================================================
    // Session Start Handler
    // =========================================================================

    /// Handle the session-start hook.
    ///
    /// 1. Inherit the parent's state for subagent sessions
    /// 2. Otherwise mirror the repository into a fresh state
    /// 3. Describe the gate status as additional context
    fn handle_session_start(&self, input: &str) -> Result<HookResponse> {
        let hook_input: SessionStartInput = parse_input(input)?;
        let session_id = hook_input.common.session_id.as_str();

        if let Some(ref parent_id) = hook_input.parent_session_id {
            if let Some(state) = self.store.inherit_parent_state(session_id, parent_id)? {
                tracing::debug!(session_id, parent_id = %parent_id, "inherited parent gate state");
                let context = format!(
                    "Inherited gate state from parent session {}. {}",
                    parent_id,
                    describe_gate(&state)
                );
                return Ok(HookResponse::approve(to_json(
                    &SessionStartOutput::with_context(context),
                )?));
            }
            tracing::debug!(session_id, parent_id = %parent_id, "parent has no state");
        }

        let repo = (self.repositories)(&hook_input.common.cwd);
        let engine = self.engine(repo.as_ref());
        self.store
            .set_state(session_id, &workspace_update(&hook_input.common.cwd))?;
        let state = engine.refresh(session_id)?;

        let output = SessionStartOutput::with_context(describe_gate(&state));
        Ok(HookResponse::approve(to_json(&output)?))
    }

    // =========================================================================
    // Pre-Tool-Use Handler
    // =========================================================================

    /// Handle the pre-tool-use hook.
    ///
    /// Shell commands are classified first: anything not recognized as
    /// modifying runs without consulting the gate, and so do `jj describe`
    /// and `jj new`, which are how a locked session unlocks. Everything
    /// else goes through the gate.
    fn handle_pre_tool_use(&self, input: &str) -> Result<HookResponse> {
        let hook_input: PreToolUseInput = parse_input(input)?;
        let session_id = hook_input.common.session_id.as_str();
        let tool = hook_input.tool_name.as_str();

        let mut advisory = None;
        if is_shell_tool(tool) {
            let command = hook_input.command().unwrap_or("");
            if self.config.advisor.enabled {
                advisory = detect_foreign_command(command).map(|found| found.message());
            }

            let classification = classify(command);
            if !classification.is_modifying() {
                tracing::debug!(
                    session_id,
                    category = classification.label(),
                    "shell command bypasses gate"
                );
                return HookResponse::pre_tool_use(
                    &PreToolUseOutput::allow().with_advisory(advisory),
                );
            }
            if declares_intent(command) {
                // Refreshed in post-tool-use, which unlocks the gate.
                tracing::debug!(session_id, "intent-declaring jj command bypasses gate");
                return HookResponse::pre_tool_use(
                    &PreToolUseOutput::allow().with_advisory(advisory),
                );
            }
            tracing::debug!(
                session_id,
                pattern = classification.matched_pattern().unwrap_or(""),
                "modifying shell command"
            );
        }

        let repo = (self.repositories)(&hook_input.common.cwd);
        let result = self.engine(repo.as_ref()).admit(session_id, tool);
        HookResponse::pre_tool_use(&PreToolUseOutput::from_gate(result).with_advisory(advisory))
    }

    // =========================================================================
    // Post-Tool-Use Handler
    // =========================================================================

    /// Handle the post-tool-use hook.
    ///
    /// 1. Record the edited file for modifying tools
    /// 2. Refresh the mirror after anything that may have changed the repo
    fn handle_post_tool_use(&self, input: &str) -> Result<HookResponse> {
        let hook_input: PostToolUseInput = parse_input(input)?;
        let session_id = hook_input.common.session_id.as_str();
        let category = self.taxonomy.category(&hook_input.tool_name);

        if category == ToolCategory::ReadOnly {
            return Ok(HookResponse::approve(to_json(&PostToolUseOutput::empty())?));
        }

        let mut recorded = None;
        if category.is_gated() {
            if let Some(path) = hook_input.file_path() {
                self.store.record_modified_file(session_id, path)?;
                recorded = Some(path.to_string());
            }
        }

        let repo = (self.repositories)(&hook_input.common.cwd);
        self.engine(repo.as_ref()).refresh(session_id)?;

        let output = match recorded {
            Some(path) => PostToolUseOutput::with_message(format!("recorded {}", path)),
            None => PostToolUseOutput::empty(),
        };
        Ok(HookResponse::approve(to_json(&output)?))
    }

    // =========================================================================
    // Session End Handler
    // =========================================================================

    /// Handle the session-end hook.
    ///
    /// Deletes the session's state and the states inherited from it.
    fn handle_session_end(&self, input: &str) -> Result<HookResponse> {
        let hook_input: SessionEndInput = parse_input(input)?;
        let session_id = hook_input.session_id.as_str();

        let mut released = 0;
        for child in self.store.children_of(session_id)? {
            self.store.delete_state(&child)?;
            released += 1;
        }
        if self.store.has_state(session_id)? {
            self.store.delete_state(session_id)?;
            released += 1;
        }

        tracing::debug!(session_id, released, "session ended");

        let output = if released == 0 {
            SessionEndOutput::empty()
        } else {
            SessionEndOutput::with_message(format!("released gate state for {} session(s)", released))
        };
        Ok(HookResponse::approve(to_json(&output)?))
    }
}

/// Response used when a hook fails: approve, with a warning for the
/// pre-tool-use host.
pub fn fail_open(hook_type: HookType, error: &GateError) -> HookResponse {
    tracing::warn!(hook = hook_type.as_str(), error = %error, "hook failed, approving");
    let output = match hook_type {
        HookType::PreToolUse => to_json(&PreToolUseOutput::allow_with_message(format!(
            "jjgate could not check this tool call: {}",
            error
        )))
        .conservative_or("serializing fail-open output", "{}".to_string()),
        _ => "{}".to_string(),
    };
    HookResponse::approve(output)
}

/// Workspace fields recorded when a session starts.
fn workspace_update(cwd: &Path) -> SessionUpdate {
    SessionUpdate {
        workspace_path: Some(cwd.to_string_lossy().into_owned()),
        ..SessionUpdate::default()
    }
}

/// One-paragraph gate status for the agent.
pub fn describe_gate(state: &SessionState) -> String {
    if !state.is_repo {
        return crate::core::NOT_JJ_REPO_MESSAGE.to_string();
    }
    let change = state.change_id.as_deref().unwrap_or("@");
    if state.gate_unlocked {
        if state.change_description.is_empty() {
            format!(
                "jjgate: change {} already has modifications. Modifying tools are unlocked.",
                change
            )
        } else {
            format!(
                "jjgate: working on change {} ({}). Modifying tools are unlocked.",
                change,
                first_line(&state.change_description)
            )
        }
    } else {
        format!(
            "jjgate: change {} has no description yet. Modifying tools stay locked until you \
describe the work with `jj describe -m \"...\"` or start a change with `jj new -m \"...\"`.",
            change
        )
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}

/// Config for one hook event, layered against the event's `cwd`.
///
/// Input without a `cwd`, or that does not parse, falls back to the
/// process directory; the handler reports the parse error itself.
pub fn config_for_input(input: &str) -> Config {
    match parse_input::<HookInput>(input) {
        Ok(hook_input) if !hook_input.cwd.as_os_str().is_empty() => {
            Config::load_from_cwd(&hook_input.cwd)
        }
        _ => Config::load(),
    }
}

/// Read input from stdin.
pub fn read_stdin() -> Result<String> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| GateError::storage("stdin", e))?;
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GateConfig, RepoConfig};
    use crate::core::gate::GateStrategy;
    use crate::core::{GATE_BLOCK_MESSAGE_EXECUTION, GATE_BLOCK_MESSAGE_PLANNING};
    use crate::repo::runner::testing::ScriptedRunner;
    use crate::repo::CommandOutput;
    use crate::storage::MemorySessionStore;
    use serde_json::{json, Value};
    use std::sync::Arc;

    const LOG: &str = "jj log -r @ --no-graph -T";

    fn log_cmd(template: &str) -> String {
        format!("{} {}", LOG, template)
    }

    /// A jj repo whose working copy is a fresh, undescribed change.
    fn pristine_repo() -> Arc<ScriptedRunner> {
        Arc::new(
            ScriptedRunner::new()
                .with("jj root", CommandOutput::ok("/work"))
                .with(&log_cmd("change_id.short()"), CommandOutput::ok("qpvuntsm"))
                .with(&log_cmd("description"), CommandOutput::ok(""))
                .with(&log_cmd("empty"), CommandOutput::ok("true"))
                .with(&log_cmd("bookmarks"), CommandOutput::ok("")),
        )
    }

    fn describe(runner: &ScriptedRunner, description: &str) {
        runner.respond(&log_cmd("description"), CommandOutput::ok(description));
    }

    fn runner_with(
        scripted: &Arc<ScriptedRunner>,
        config: Config,
    ) -> HookRunner<MemorySessionStore> {
        let shared = Arc::clone(scripted);
        let repo_config = config.repo.clone();
        HookRunner::with_repositories(
            MemorySessionStore::new(),
            config,
            Box::new(move |_cwd: &Path| -> Box<dyn Repository> {
                Box::new(JjRepository::with_config(Arc::clone(&shared), &repo_config))
            }),
        )
    }

    fn test_runner(scripted: &Arc<ScriptedRunner>) -> HookRunner<MemorySessionStore> {
        runner_with(scripted, Config::default())
    }

    fn run(runner: &HookRunner<MemorySessionStore>, hook: HookType, input: Value) -> HookResponse {
        runner.run_with_input(hook, &input.to_string()).unwrap()
    }

    fn output(response: &HookResponse) -> Value {
        serde_json::from_str(&response.output).unwrap()
    }

    fn start(runner: &HookRunner<MemorySessionStore>, session_id: &str) -> HookResponse {
        run(
            runner,
            HookType::SessionStart,
            json!({"session_id": session_id, "cwd": "/work"}),
        )
    }

    fn pre(runner: &HookRunner<MemorySessionStore>, tool: &str, tool_input: Value) -> HookResponse {
        run(
            runner,
            HookType::PreToolUse,
            json!({"session_id": "s1", "cwd": "/work", "tool_name": tool, "tool_input": tool_input}),
        )
    }

    // HookType tests

    #[test]
    fn test_hook_type_parse() {
        assert_eq!(HookType::parse("session-start"), Some(HookType::SessionStart));
        assert_eq!(HookType::parse("SessionStart"), Some(HookType::SessionStart));
        assert_eq!(HookType::parse("pre_tool_use"), Some(HookType::PreToolUse));
        assert_eq!(HookType::parse("post-tool-use"), Some(HookType::PostToolUse));
        assert_eq!(HookType::parse("session-end"), Some(HookType::SessionEnd));
        assert_eq!(HookType::parse("stop"), None);
    }

    #[test]
    fn test_hook_type_roundtrip_names() {
        for hook in [
            HookType::SessionStart,
            HookType::PreToolUse,
            HookType::PostToolUse,
            HookType::SessionEnd,
        ] {
            assert_eq!(HookType::parse(hook.as_str()), Some(hook));
        }
    }

    // Session start

    #[test]
    fn test_session_start_locked_context() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);

        let response = start(&runner, "s1");

        assert_eq!(response.exit_code, 0);
        let context = output(&response)["additionalContext"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(context.contains("qpvuntsm"));
        assert!(context.contains("locked"));

        let state = runner.store().get_state("s1").unwrap().unwrap();
        assert!(!state.gate_unlocked);
        assert_eq!(state.workspace_path, "/work");
    }

    #[test]
    fn test_session_start_described_change_unlocks() {
        let scripted = pristine_repo();
        describe(&scripted, "Add parser\n\nLonger body");
        let runner = test_runner(&scripted);

        let response = start(&runner, "s1");

        let context = output(&response)["additionalContext"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(context.contains("Add parser"));
        assert!(!context.contains("Longer body"));
        assert!(runner.store().get_state("s1").unwrap().unwrap().gate_unlocked);
    }

    #[test]
    fn test_session_start_outside_repository() {
        let scripted = Arc::new(ScriptedRunner::new());
        let runner = test_runner(&scripted);

        let response = start(&runner, "s1");

        assert_eq!(
            output(&response)["additionalContext"],
            crate::core::NOT_JJ_REPO_MESSAGE
        );
        assert!(!runner.store().get_state("s1").unwrap().unwrap().is_repo);
    }

    #[test]
    fn test_subagent_inherits_parent_state() {
        let scripted = pristine_repo();
        describe(&scripted, "Parent work");
        let runner = test_runner(&scripted);
        start(&runner, "parent");
        runner
            .store()
            .record_modified_file("parent", "src/lib.rs")
            .unwrap();
        let calls_before = scripted.calls().len();

        let response = run(
            &runner,
            HookType::SessionStart,
            json!({"session_id": "child", "cwd": "/work", "parent_session_id": "parent"}),
        );

        let context = output(&response)["additionalContext"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(context.starts_with("Inherited gate state from parent session parent."));
        let child = runner.store().get_state("child").unwrap().unwrap();
        assert!(child.gate_unlocked);
        assert!(child.modified_files.is_empty());
        // Inheritance does not touch the repository.
        assert_eq!(scripted.calls().len(), calls_before);
    }

    #[test]
    fn test_subagent_with_unknown_parent_starts_fresh() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);

        run(
            &runner,
            HookType::SessionStart,
            json!({"session_id": "child", "cwd": "/work", "parent_session_id": "ghost"}),
        );

        let child = runner.store().get_state("child").unwrap().unwrap();
        assert!(child.parent_session_id.is_none());
        assert!(!child.gate_unlocked);
    }

    // Pre-tool-use

    #[test]
    fn test_read_only_shell_command_passes_locked_gate() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        for command in ["ls -la", "cat README.md", "jj log", "grep -rn foo src"] {
            let response = pre(&runner, "bash", json!({ "command": command }));
            assert_eq!(response.exit_code, 0, "{}", command);
            assert!(response.block_message.is_none());
        }
    }

    #[test]
    fn test_unclassified_shell_command_passes() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        let response = pre(&runner, "Bash", json!({"command": "python3 script.py"}));
        assert_eq!(response.exit_code, 0);
    }

    #[test]
    fn test_modifying_shell_command_blocked_with_planning_message() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        let response = pre(&runner, "bash", json!({"command": "rm -rf x"}));

        assert_eq!(response.exit_code, 2);
        assert_eq!(response.block_message.as_deref(), Some(GATE_BLOCK_MESSAGE_PLANNING));
        let out = output(&response);
        assert_eq!(out["allow"], false);
        assert_eq!(out["blocked_by"], "locked_planning");
    }

    #[test]
    fn test_edit_blocked_with_execution_message() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        let response = pre(&runner, "edit", json!({"file_path": "src/lib.rs"}));

        assert_eq!(response.exit_code, 2);
        assert_eq!(
            response.block_message.as_deref(),
            Some(GATE_BLOCK_MESSAGE_EXECUTION)
        );
    }

    #[test]
    fn test_pre_tool_use_without_session_start_refreshes_lazily() {
        let scripted = pristine_repo();
        describe(&scripted, "Already described");
        let runner = test_runner(&scripted);

        let response = pre(&runner, "write", json!({"file_path": "a.rs"}));

        assert_eq!(response.exit_code, 0);
        assert!(runner.store().has_state("s1").unwrap());
    }

    #[test]
    fn test_read_only_tool_skips_repository() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);

        let response = pre(&runner, "read", json!({"file_path": "a.rs"}));

        assert_eq!(response.exit_code, 0);
        assert!(scripted.calls().is_empty());
        assert!(!runner.store().has_state("s1").unwrap());
    }

    #[test]
    fn test_unlocked_session_allows_edits() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");
        runner
            .store()
            .set_state("s1", &SessionUpdate::unlock())
            .unwrap();

        assert_eq!(pre(&runner, "edit", json!({})).exit_code, 0);
        assert_eq!(pre(&runner, "bash", json!({"command": "rm -rf target"})).exit_code, 0);
    }

    #[test]
    fn test_git_command_gets_advisory() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        let response = pre(&runner, "bash", json!({"command": "git status"}));

        assert_eq!(response.exit_code, 0);
        let message = output(&response)["message"].as_str().unwrap().to_string();
        assert!(message.contains("jj st"));
    }

    #[test]
    fn test_unclassified_git_command_passes_with_advisory() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        // `git commit` matches no modify pattern, so the gate is not consulted.
        let response = pre(&runner, "bash", json!({"command": "git commit -am wip"}));

        assert_eq!(response.exit_code, 0);
        let message = output(&response)["message"].as_str().unwrap().to_string();
        assert!(message.contains("jj describe"));
    }

    #[test]
    fn test_advisory_prefixes_block_message() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        let response = pre(&runner, "bash", json!({"command": "git stash > out.txt"}));

        assert_eq!(response.exit_code, 2);
        let message = response.block_message.unwrap();
        assert!(message.starts_with("This is a jj repository"));
        assert!(message.ends_with(GATE_BLOCK_MESSAGE_PLANNING));
    }

    #[test]
    fn test_shell_jj_describe_unlocks_locked_session() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");
        assert_eq!(pre(&runner, "edit", json!({"file_path": "a.rs"})).exit_code, 2);

        let command = json!({"command": "jj describe -m \"add parser\""});
        let response = pre(&runner, "Bash", command.clone());
        assert_eq!(response.exit_code, 0);
        assert!(response.block_message.is_none());

        describe(&scripted, "add parser");
        run(
            &runner,
            HookType::PostToolUse,
            json!({"session_id": "s1", "cwd": "/work", "tool_name": "Bash", "tool_input": command}),
        );

        assert!(runner.store().get_state("s1").unwrap().unwrap().gate_unlocked);
        assert_eq!(pre(&runner, "edit", json!({"file_path": "a.rs"})).exit_code, 0);
    }

    #[test]
    fn test_shell_jj_new_passes_locked_gate() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        let response = pre(&runner, "Bash", json!({"command": "jj new -m 'add parser'"}));
        assert_eq!(response.exit_code, 0);
    }

    #[test]
    fn test_shell_intent_chained_with_write_stays_gated() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        let response = pre(
            &runner,
            "Bash",
            json!({"command": "jj describe -m x && rm -rf build"}),
        );
        assert_eq!(response.exit_code, 2);
        assert_eq!(response.block_message.as_deref(), Some(GATE_BLOCK_MESSAGE_PLANNING));
    }

    #[test]
    fn test_advisor_can_be_disabled() {
        let scripted = pristine_repo();
        let mut config = Config::default();
        config.advisor.enabled = false;
        let runner = runner_with(&scripted, config);
        start(&runner, "s1");

        let response = pre(&runner, "bash", json!({"command": "git status"}));
        assert!(output(&response).get("message").is_none());
    }

    #[test]
    fn test_live_strategy_follows_repository() {
        let scripted = pristine_repo();
        let config = Config {
            gate: GateConfig {
                strategy: GateStrategy::Live,
                ..GateConfig::default()
            },
            ..Config::default()
        };
        let runner = runner_with(&scripted, config);

        assert_eq!(pre(&runner, "edit", json!({})).exit_code, 2);
        describe(&scripted, "Now described");
        assert_eq!(pre(&runner, "edit", json!({})).exit_code, 0);
        // Live checks keep no state.
        assert!(!runner.store().has_state("s1").unwrap());
    }

    // Post-tool-use

    #[test]
    fn test_post_tool_use_records_files_and_unlocks() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        scripted.respond(&log_cmd("empty"), CommandOutput::ok("false"));
        for (key, path) in [("file_path", "b.rs"), ("filePath", "a.rs"), ("path", "b.rs")] {
            let response = run(
                &runner,
                HookType::PostToolUse,
                json!({"session_id": "s1", "cwd": "/work", "tool_name": "edit", "tool_input": { key: path }}),
            );
            assert_eq!(response.exit_code, 0);
        }

        let state = runner.store().get_state("s1").unwrap().unwrap();
        assert_eq!(state.modified_files, vec!["b.rs", "a.rs"]);
        assert!(state.gate_unlocked);
    }

    #[test]
    fn test_post_tool_use_after_jj_describe_unlocks() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        describe(&scripted, "Fix bug");
        run(
            &runner,
            HookType::PostToolUse,
            json!({"session_id": "s1", "cwd": "/work", "tool_name": "jj_describe", "tool_input": {"message": "Fix bug"}}),
        );

        let state = runner.store().get_state("s1").unwrap().unwrap();
        assert!(state.gate_unlocked);
        assert_eq!(state.change_description, "Fix bug");
        assert!(state.modified_files.is_empty());
    }

    #[test]
    fn test_post_tool_use_refresh_never_relocks() {
        let scripted = pristine_repo();
        describe(&scripted, "Ship it");
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        // After a push the working copy is a new empty change.
        describe(&scripted, "");
        scripted.respond(&log_cmd("change_id.short()"), CommandOutput::ok("nextchng"));
        run(
            &runner,
            HookType::PostToolUse,
            json!({"session_id": "s1", "cwd": "/work", "tool_name": "jj_push", "tool_input": {}}),
        );

        let state = runner.store().get_state("s1").unwrap().unwrap();
        assert!(state.gate_unlocked);
        assert_eq!(state.change_id.as_deref(), Some("nextchng"));
    }

    #[test]
    fn test_post_tool_use_ignores_read_only_tools() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);

        let response = run(
            &runner,
            HookType::PostToolUse,
            json!({"session_id": "s1", "cwd": "/work", "tool_name": "read", "tool_input": {"file_path": "a.rs"}}),
        );

        assert_eq!(response.output, "{}");
        assert!(!runner.store().has_state("s1").unwrap());
    }

    // Session end

    #[test]
    fn test_session_end_removes_children() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "parent");
        start(&runner, "other");
        runner
            .store()
            .inherit_parent_state("child-1", "parent")
            .unwrap();
        runner
            .store()
            .inherit_parent_state("child-2", "parent")
            .unwrap();

        let response = run(
            &runner,
            HookType::SessionEnd,
            json!({"session_id": "parent", "cwd": "/work"}),
        );

        assert_eq!(response.exit_code, 0);
        assert_eq!(
            output(&response)["message"],
            "released gate state for 3 session(s)"
        );
        assert_eq!(runner.store().list_sessions().unwrap(), vec!["other"]);
    }

    #[test]
    fn test_session_end_unknown_session() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);

        let response = run(
            &runner,
            HookType::SessionEnd,
            json!({"session_id": "nobody"}),
        );
        assert_eq!(response.output, "{}");
    }

    // Errors

    #[test]
    fn test_start_records_default_bookmark() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);
        start(&runner, "s1");

        let state = runner.store().get_state("s1").unwrap().unwrap();
        assert_eq!(state.bookmark.as_deref(), Some("main"));
    }

    #[test]
    fn test_configured_bookmark_yields_to_repository() {
        let scripted = pristine_repo();
        let config = Config {
            repo: RepoConfig {
                default_bookmark: "trunk".to_string(),
                ..RepoConfig::default()
            },
            ..Config::default()
        };
        let runner = runner_with(&scripted, config);
        start(&runner, "s1");
        let state = runner.store().get_state("s1").unwrap().unwrap();
        assert_eq!(state.bookmark.as_deref(), Some("trunk"));

        scripted.respond(&log_cmd("bookmarks"), CommandOutput::ok("feature*"));
        run(
            &runner,
            HookType::PostToolUse,
            json!({"session_id": "s1", "cwd": "/work", "tool_name": "jj_describe"}),
        );
        let state = runner.store().get_state("s1").unwrap().unwrap();
        assert_eq!(state.bookmark.as_deref(), Some("feature"));
    }

    #[test]
    #[serial_test::serial]
    fn test_config_loaded_from_event_cwd() {
        let home = tempfile::TempDir::new().unwrap();
        let project = tempfile::TempDir::new().unwrap();
        std::env::set_var("JJGATE_HOME", home.path());
        let config_dir = project.path().join(".jjgate");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "[gate]\nstrategy = \"live\"\n").unwrap();

        let input = json!({"session_id": "s1", "cwd": project.path()}).to_string();
        assert_eq!(config_for_input(&input).gate.strategy, GateStrategy::Live);

        let elsewhere = tempfile::TempDir::new().unwrap();
        let input = json!({"session_id": "s1", "cwd": elsewhere.path()}).to_string();
        assert_eq!(config_for_input(&input).gate.strategy, GateStrategy::Cached);

        std::env::remove_var("JJGATE_HOME");
    }

    #[test]
    #[serial_test::serial]
    fn test_config_for_unparseable_input_uses_defaults() {
        let home = tempfile::TempDir::new().unwrap();
        std::env::set_var("JJGATE_HOME", home.path());

        let config = config_for_input("not json");
        assert_eq!(config.repo.default_bookmark, "main");

        std::env::remove_var("JJGATE_HOME");
    }

    #[test]
    fn test_invalid_input_is_an_error() {
        let scripted = pristine_repo();
        let runner = test_runner(&scripted);

        let result = runner.run_with_input(HookType::PreToolUse, "not json");
        assert!(matches!(result, Err(GateError::Serde { .. })));
    }

    #[test]
    fn test_fail_open_approves() {
        let error = GateError::serde("bad input");

        let response = fail_open(HookType::PreToolUse, &error);
        assert_eq!(response.exit_code, 0);
        let out: Value = serde_json::from_str(&response.output).unwrap();
        assert_eq!(out["allow"], true);
        assert!(out["message"].as_str().unwrap().contains("bad input"));

        let response = fail_open(HookType::SessionEnd, &error);
        assert_eq!(response.output, "{}");
    }

    #[test]
    fn test_describe_gate_variants() {
        let mut state = SessionState::new("s1");
        state.change_id = Some("abc".to_string());
        assert!(describe_gate(&state).contains("no description"));

        state.gate_unlocked = true;
        assert!(describe_gate(&state).contains("already has modifications"));

        state.change_description = "Title\nbody".to_string();
        assert!(describe_gate(&state).contains("(Title)"));

        state.is_repo = false;
        assert_eq!(describe_gate(&state), crate::core::NOT_JJ_REPO_MESSAGE);
    }
}
