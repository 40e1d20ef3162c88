//! Hook integration for agent hosts.
//!
//! The host invokes jjgate at four points in a session:
//!
//! - **session-start**: mirror the repository, inherit a parent's gate
//! - **pre-tool-use**: classify the call and consult the gate
//! - **post-tool-use**: record edited files, refresh the mirror
//! - **session-end**: release the session's state

pub mod input;
pub mod output;
pub mod runner;

pub use input::{
    parse_input, HookInput, PostToolUseInput, PreToolUseInput, SessionEndInput,
    SessionStartInput, ToolUseInput,
};
pub use output::{
    to_json, to_json_pretty, PostToolUseOutput, PreToolUseOutput, SessionEndOutput,
    SessionStartOutput,
};
pub use runner::{
    config_for_input, describe_gate, fail_open, read_stdin, HookResponse, HookRunner, HookType,
    RepositoryFactory,
};
