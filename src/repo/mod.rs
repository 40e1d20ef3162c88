//! Repository access for jjgate.
//!
//! - **runner**: typed command execution (`CommandRunner`, `SystemRunner`)
//! - **traits**: the `Repository` operations the gate consumes
//! - **jj**: `JjRepository`, the jj CLI implementation

pub mod jj;
pub mod runner;
pub mod traits;

pub use jj::JjRepository;
pub use runner::{command_line, CommandOutput, CommandRunner, SystemRunner};
pub use traits::{NewChange, Repository};
