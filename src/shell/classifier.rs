//! Shell command classification.
//!
//! Commands are matched against two ordered pattern lists. Modify patterns
//! are always tried first: a pipeline such as `cat a | tee b` has a
//! read-only prefix, and checking read-only patterns first would let it
//! through as safe.
//!
//! This is heuristic substring matching, not shell parsing.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};

/// A pattern source plus an optional exclusion.
///
/// The exclusion is matched against the text right after a match and
/// rejects that match position when it hits, standing in for a negative
/// lookahead (which the `regex` crate does not support).
pub type PatternSpec = (&'static str, Option<&'static str>);

/// Patterns that mark a command as state-mutating, in priority order.
pub const MODIFY_PATTERNS: &[PatternSpec] = &[
    (r"\bsed\s+-i", None),
    (r"\bperl\s+-[ip]", None),
    // Redirect at a command boundary, so `a>b` inside an argument or `2>` is ignored.
    (r"(?:^|[;&|)\s])>", Some(r"^>")),
    (r">>", None),
    (r"\btee\b", None),
    (r"\brm\s", None),
    (r"\bmv\s", None),
    (r"\bcp\s", None),
    (r"\bmkdir\b", None),
    (r"\brmdir\b", None),
    (r"\btouch\b", None),
    (r"\bchmod\b", None),
    (r"\bchown\b", None),
    (r"\bln\s", None),
    (r"\bunlink\b", None),
    (r"\btruncate\b", None),
    (r"\bdd\b", None),
    (r"\binstall\b", None),
    (
        r"\bjj\s+(?:new|describe|squash|abandon|split|edit|restore|diffedit)\b",
        None,
    ),
    (r"\bnpm\s+(?:install|uninstall|update|init|link|publish)\b", None),
    (r"\byarn\s+(?:add|remove|install|link)\b", None),
    (r"\bpnpm\s+(?:add|remove|install|link)\b", None),
    (r"\bbun\s+(?:add|remove|install|link|create)\b", None),
    (r"\bpip\s+(?:install|uninstall)\b", None),
    (r"\bcargo\s+(?:add|remove|install|build)\b", None),
    (r"\bmake\b", None),
    (r"\bninja\b", None),
    (r"\bcmake\b", None),
    (r"\bgcc\b", None),
    (r"\bclang\b", None),
    (r"\brustc\b", None),
    (r"\btsc\b", None),
    (r"\btar\s+[^t]", None),
    (r"\bunzip\b", None),
    (r"\bgunzip\b", None),
];

/// Patterns that mark a command as read-only, in priority order.
pub const READONLY_PATTERNS: &[PatternSpec] = &[
    (
        r"\bjj\s+(?:log|st|status|diff|show|op\s+log|file\s+show|git\s+fetch|evolog|bookmark\s+list)\b",
        None,
    ),
    (r"\bcat\b", Some(r"^.*>")),
    (r"\bhead\b", None),
    (r"\btail\b", None),
    (r"\bless\b", None),
    (r"\bmore\b", None),
    (r"\bbat\b", None),
    (r"\bgrep\b", None),
    (r"\brg\b", None),
    (r"\bag\b", None),
    (r"\bfind\b", Some(r"^.*-exec")),
    (r"\bfd\b", None),
    (r"\blocate\b", None),
    (r"\bwhich\b", None),
    (r"\bwhereis\b", None),
    (r"\btype\b", None),
    (r"\bls\b", None),
    (r"\bexa\b", None),
    (r"\blsd\b", None),
    (r"\btree\b", None),
    (r"\bpwd\b", None),
    (r"\bwc\b", None),
    (r"\bdu\b", None),
    (r"\bdf\b", None),
    (r"\bstat\b", None),
    (r"\bfile\b", None),
    (r"\benv\b", None),
    (r"\bprintenv\b", None),
    (r"\becho\s+\$", None),
    (r"\buname\b", None),
    (r"\bhostname\b", None),
    (r"\bdate\b", None),
    (r"\buptime\b", None),
    (r"\bwho\b", None),
    (r"\bps\b", None),
    (r"\btop\b", None),
    (r"\bhtop\b", None),
    (r"\bnpm\s+(?:list|ls|info|view|outdated|search)\b", None),
    (r"\byarn\s+(?:list|info|why)\b", None),
    (r"\bpip\s+(?:list|show|freeze)\b", None),
    (r"\bcargo\s+(?:tree|search|info)\b", None),
];

/// A jj command that states what the working-copy change is for.
///
/// Matched against each command segment with quoted arguments blanked.
pub const INTENT_PATTERN: &str = r"^jj\s+(?:describe|desc|new)\b";

/// Result of classifying a shell command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum CommandClassification {
    /// The command changes files, packages, or repository state.
    Modifying {
        /// Source of the pattern that matched.
        pattern: String,
    },
    /// The command only inspects state.
    ReadOnly {
        /// Source of the pattern that matched.
        pattern: String,
    },
    /// No pattern matched.
    Unclassified,
}

impl CommandClassification {
    /// Whether a modify pattern matched.
    pub fn is_modifying(&self) -> bool {
        matches!(self, Self::Modifying { .. })
    }

    /// The pattern that produced this classification, if any.
    pub fn matched_pattern(&self) -> Option<&str> {
        match self {
            Self::Modifying { pattern } | Self::ReadOnly { pattern } => Some(pattern),
            Self::Unclassified => None,
        }
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Modifying { .. } => "modifying",
            Self::ReadOnly { .. } => "read-only",
            Self::Unclassified => "unclassified",
        }
    }
}

/// Anything that can sort shell commands into safety categories.
///
/// The pattern lists are one implementation; a grammar-based parser could
/// replace them without touching callers.
pub trait Classifier: Send + Sync {
    /// Classify a command string.
    fn classify(&self, command: &str) -> CommandClassification;

    /// Whether the command may run without passing the gate.
    ///
    /// Unclassified commands count as read-only here.
    fn is_read_only(&self, command: &str) -> bool {
        !self.classify(command).is_modifying()
    }
}

/// A compiled pattern with its optional exclusion.
#[derive(Debug, Clone)]
pub struct CommandPattern {
    regex: Regex,
    exclusion: Option<Regex>,
}

impl CommandPattern {
    /// Compile a pattern and its exclusion.
    pub fn compile(source: &str, exclusion: Option<&str>) -> Result<Self> {
        let regex = Regex::new(source)
            .map_err(|e| GateError::config(format!("invalid pattern `{}`: {}", source, e)))?;
        let exclusion = exclusion
            .map(|ex| {
                Regex::new(ex).map_err(|e| {
                    GateError::config(format!("invalid exclusion `{}`: {}", ex, e))
                })
            })
            .transpose()?;
        Ok(Self { regex, exclusion })
    }

    /// The pattern source, used for diagnostics.
    pub fn source(&self) -> &str {
        self.regex.as_str()
    }

    /// Test the pattern anywhere in `command`.
    ///
    /// When a match is rejected by the exclusion, scanning resumes one
    /// character later, the same way a lookahead failure would retry.
    pub fn is_match(&self, command: &str) -> bool {
        let Some(exclusion) = &self.exclusion else {
            return self.regex.is_match(command);
        };

        let mut start = 0;
        while start <= command.len() {
            let Some(m) = self.regex.find_at(command, start) else {
                return false;
            };
            if !exclusion.is_match(&command[m.end()..]) {
                return true;
            }
            start = next_char_boundary(command, m.start());
        }
        false
    }
}

fn next_char_boundary(s: &str, from: usize) -> usize {
    s[from..]
        .chars()
        .next()
        .map_or(s.len() + 1, |c| from + c.len_utf8())
}

/// Ordered-pattern classifier.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    modify: Vec<CommandPattern>,
    read_only: Vec<CommandPattern>,
}

impl PatternClassifier {
    /// Build the classifier from the built-in pattern lists.
    pub fn new() -> Self {
        Self {
            modify: compile_builtin(MODIFY_PATTERNS),
            read_only: compile_builtin(READONLY_PATTERNS),
        }
    }

    /// Build a classifier from caller-supplied pattern lists.
    pub fn with_patterns(modify: &[PatternSpec], read_only: &[PatternSpec]) -> Result<Self> {
        let compile = |specs: &[PatternSpec]| {
            specs
                .iter()
                .map(|(src, ex)| CommandPattern::compile(src, *ex))
                .collect::<Result<Vec<_>>>()
        };
        Ok(Self {
            modify: compile(modify)?,
            read_only: compile(read_only)?,
        })
    }

    /// Number of compiled modify and read-only patterns.
    pub fn pattern_counts(&self) -> (usize, usize) {
        (self.modify.len(), self.read_only.len())
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for PatternClassifier {
    fn classify(&self, command: &str) -> CommandClassification {
        if let Some(p) = self.modify.iter().find(|p| p.is_match(command)) {
            return CommandClassification::Modifying {
                pattern: p.source().to_string(),
            };
        }

        if let Some(p) = self.read_only.iter().find(|p| p.is_match(command)) {
            return CommandClassification::ReadOnly {
                pattern: p.source().to_string(),
            };
        }

        CommandClassification::Unclassified
    }
}

fn compile_builtin(specs: &[PatternSpec]) -> Vec<CommandPattern> {
    specs
        .iter()
        .filter_map(|(src, ex)| match CommandPattern::compile(src, *ex) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %e, "skipping built-in command pattern");
                None
            }
        })
        .collect()
}

static DEFAULT_CLASSIFIER: LazyLock<PatternClassifier> = LazyLock::new(PatternClassifier::new);

/// The process-wide classifier built from the built-in pattern lists.
pub fn default_classifier() -> &'static PatternClassifier {
    &DEFAULT_CLASSIFIER
}

/// Classify a command with the built-in patterns.
pub fn classify(command: &str) -> CommandClassification {
    DEFAULT_CLASSIFIER.classify(command)
}

/// Whether a command is not modifying, per the built-in patterns.
pub fn is_read_only(command: &str) -> bool {
    DEFAULT_CLASSIFIER.is_read_only(command)
}

static INTENT: LazyLock<Option<Regex>> = LazyLock::new(|| compile_helper(INTENT_PATTERN));
static QUOTED: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile_helper(r#""(?:[^"\\]|\\.)*"|'[^']*'"#));
static SEPARATORS: LazyLock<Option<Regex>> = LazyLock::new(|| compile_helper(r"[;&|\n]+"));

fn compile_helper(source: &str) -> Option<Regex> {
    Regex::new(source)
        .map_err(|e| tracing::warn!(error = %e, pattern = source, "helper pattern failed to compile"))
        .ok()
}

/// Whether `command` declares intent with `jj describe` / `jj new` and
/// otherwise changes nothing.
///
/// Every segment of the command must be either an intent command whose
/// arguments match no modify pattern, or a segment that is not modifying
/// at all. Quoted text (the change message) is ignored, so a description
/// mentioning `rm` or `install` still counts.
pub fn declares_intent(command: &str) -> bool {
    let (Some(intent), Some(quoted), Some(separators)) =
        (INTENT.as_ref(), QUOTED.as_ref(), SEPARATORS.as_ref())
    else {
        return false;
    };

    let unquoted = quoted.replace_all(command, "''");
    let mut declared = false;
    for segment in separators
        .split(&unquoted)
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        match intent.find(segment) {
            Some(m) => {
                if classify(&segment[m.end()..]).is_modifying() {
                    return false;
                }
                declared = true;
            }
            None => {
                if classify(segment).is_modifying() {
                    return false;
                }
            }
        }
    }
    declared
}
