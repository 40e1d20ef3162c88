//! jjgate - change-description gate for agent sessions in jj repositories
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use jjgate::config::{jjgate_home, Config};
use jjgate::core::{describe_tool, GateEngine, RepoSnapshot, ToolTaxonomy};
use jjgate::error::exit_codes;
use jjgate::hooks::{
    config_for_input, describe_gate, fail_open, read_stdin, to_json_pretty, HookRunner, HookType,
};
use jjgate::repo::{JjRepository, Repository, SystemRunner};
use jjgate::shell::{classify, detect_foreign_command};
use jjgate::storage::MemorySessionStore;
use jjgate::SessionState;

// =============================================================================
// CLI Definition
// =============================================================================

/// jjgate - keeps agents from editing until the jj change says what it is for
#[derive(Parser)]
#[command(name = "jjgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// [Internal] Run a hook (JSON stdin/stdout). Called by the agent host
    Hook {
        /// The hook event type
        #[arg(value_enum)]
        event: HookEvent,
    },

    /// [User] Show how a shell command would be classified
    Classify {
        /// The command, quoted or as separate words
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// [User] Show how the gate treats a tool
    Tool {
        /// Tool name as the host reports it
        name: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// [User] Check a tool against the gate in the current directory
    Check {
        /// Tool name as the host reports it
        tool: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },

    /// [User] Show the gate status for the current directory
    Status {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum HookEvent {
    SessionStart,
    PreToolUse,
    PostToolUse,
    SessionEnd,
}

impl From<HookEvent> for HookType {
    fn from(event: HookEvent) -> Self {
        match event {
            HookEvent::SessionStart => HookType::SessionStart,
            HookEvent::PreToolUse => HookType::PreToolUse,
            HookEvent::PostToolUse => HookType::PostToolUse,
            HookEvent::SessionEnd => HookType::SessionEnd,
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("jjgate error: {}", e);
            exit_code(exit_codes::APPROVE) // Fail-open
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to $JJGATE_HOME/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("jjgate panic: {}", info);

        if let Some(home) = jjgate_home() {
            let crash_log = home.join("crash.log");
            let _ = std::fs::create_dir_all(&home);
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Log to stderr; stdout carries hook JSON.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("JJGATE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Hook { event } => Ok(run_hook(event.into())),
        Commands::Classify { command, json } => run_classify(&command.join(" "), json),
        Commands::Tool { name, json } => run_tool(&name, json),
        Commands::Check { tool, json } => run_check(&tool, json),
        Commands::Status { json } => run_status(json),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Each invocation is its own process, so state lives only for this call
/// and the runner refreshes it from the repository on demand.
fn run_hook(hook_type: HookType) -> ExitCode {
    let response = match read_stdin() {
        Ok(input) => {
            let runner = HookRunner::new(MemorySessionStore::new(), config_for_input(&input));
            runner
                .run_with_input(hook_type, &input)
                .unwrap_or_else(|e| fail_open(hook_type, &e))
        }
        Err(e) => fail_open(hook_type, &e),
    };

    println!("{}", response.output);
    if let Some(ref message) = response.block_message {
        eprintln!("{}", message);
    }
    exit_code(response.exit_code)
}

fn run_classify(command: &str, json: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let classification = classify(command);
    let advisory = detect_foreign_command(command);

    if json {
        let value = json!({
            "command": command,
            "classification": classification,
            "advisory": advisory.as_ref().map(|found| found.message()),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        match classification.matched_pattern() {
            Some(pattern) => println!("{} ({})", classification.label(), pattern),
            None => println!("{}", classification.label()),
        }
        if let Some(found) = advisory {
            println!("{}", found.message());
        }
    }
    Ok(exit_code(exit_codes::APPROVE))
}

fn run_tool(name: &str, json: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load();
    let taxonomy = ToolTaxonomy::from_config(&config.gate);
    let category = taxonomy.category(name);

    if json {
        let value = json!({
            "tool": name,
            "category": category,
            "gated": category.is_gated(),
            "execution": taxonomy.is_execution(name),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", describe_tool(name, category));
    }
    Ok(exit_code(exit_codes::APPROVE))
}

/// Session id for one-off checks from the command line.
const CHECK_SESSION: &str = "cli-check";

fn run_check(tool: &str, json: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let config = Config::load_from_cwd(&cwd);
    let repo = JjRepository::with_config(SystemRunner::in_dir(&cwd), &config.repo);
    let store = MemorySessionStore::new();
    let taxonomy = ToolTaxonomy::from_config(&config.gate);
    let engine = GateEngine::new(&store, &repo, &taxonomy)
        .with_strategy(config.gate.strategy)
        .with_default_bookmark(&config.repo.default_bookmark);

    let result = engine.admit(CHECK_SESSION, tool);
    let message = result.message.clone();
    let outcome = result.into_result(CHECK_SESSION, &cwd);

    if json {
        let value = json!({
            "tool": tool,
            "strategy": engine.strategy().as_str(),
            "allowed": outcome.is_ok(),
            "error": outcome.as_ref().err().map(|e| e.to_string()),
            "message": message,
        });
        println!("{}", to_json_pretty(&value)?);
    } else {
        match &outcome {
            Ok(()) => println!("{}: allowed", tool),
            Err(e) => {
                println!("{}: {}", tool, e);
                if let Some(ref message) = message {
                    println!("{}", message);
                }
            }
        }
    }

    Ok(exit_code(check_exit_code(&outcome)))
}

fn check_exit_code(outcome: &jjgate::Result<()>) -> i32 {
    match outcome {
        Ok(()) => exit_codes::APPROVE,
        Err(_) => exit_codes::BLOCK,
    }
}

fn run_status(json: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load();
    let repo = JjRepository::with_config(SystemRunner::new(), &config.repo);
    let snapshot = repo
        .snapshot()
        .or_bookmark(Some(config.repo.default_bookmark.as_str()).filter(|b| !b.trim().is_empty()));
    let state = status_state(&snapshot);

    if json {
        let value = json!({
            "strategy": config.gate.strategy.as_str(),
            "repository": snapshot,
            "unlocked": state.gate_unlocked,
        });
        println!("{}", to_json_pretty(&value)?);
    } else {
        println!("strategy: {}", config.gate.strategy.as_str());
        if let Some(ref bookmark) = snapshot.bookmark {
            println!("bookmark: {}", bookmark);
        }
        println!("{}", describe_gate(&state));
    }
    Ok(exit_code(exit_codes::APPROVE))
}

/// The state a fresh session would start with.
fn status_state(snapshot: &RepoSnapshot) -> SessionState {
    SessionState::with_update("status", &snapshot.to_update())
}
