//! Shell command inspection.
//!
//! - **classifier**: sorts commands into modifying / read-only / unclassified
//! - **advisor**: spots `git` commands and suggests the `jj` equivalent

pub mod advisor;
pub mod classifier;

pub use advisor::{detect_foreign_command, suggestion_for, ForeignCommand, GIT_TO_JJ};
pub use classifier::{
    classify, declares_intent, default_classifier, is_read_only, Classifier,
    CommandClassification, CommandPattern, PatternClassifier, INTENT_PATTERN, MODIFY_PATTERNS,
    READONLY_PATTERNS,
};
