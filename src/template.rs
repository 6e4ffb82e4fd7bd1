use crate::config::Configuration;
use std::fmt;

/// Opening placeholder delimiter
pub const OPEN: &str = "{{";
/// Closing placeholder delimiter
pub const CLOSE: &str = "}}";

/// Upper bound on substitutions performed on one line. Values are rescanned
/// after splicing, so a value that expands to itself would never terminate.
pub const MAX_SUBSTITUTIONS: usize = 1024;

/// Non-fatal event raised while resolving a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Placeholder key absent from the configuration; replaced by ""
    MissingKey { key: String },
    /// `{{` at `column` (byte offset in the partially resolved line) has no closing `}}`
    Malformed { column: usize },
    /// Resolution stopped after `limit` substitutions
    SubstitutionLimit { limit: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey { key } => write!(f, "Cannot find value for key '{key}'"),
            Self::Malformed { column } => {
                write!(f, "Found malformed template at column {column}")
            }
            Self::SubstitutionLimit { limit } => {
                write!(f, "Stopped after {limit} substitutions")
            }
        }
    }
}

/// Result of resolving one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolvedLine {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Replaces every `{{ key }}` in `line` with its configured value.
///
/// After each substitution the scan restarts from the beginning of the line.
/// A `{{` without a following `}}` stops resolution and leaves the rest of the
/// line untouched, including any later placeholders.
#[must_use]
pub fn resolve_line(line: &str, config: &Configuration) -> ResolvedLine {
    let mut text = line.to_string();
    let mut diagnostics = Vec::new();
    let mut substitutions = 0;

    while let Some(start) = text.find(OPEN) {
        let key_start = start + OPEN.len();
        let Some(offset) = text[key_start..].find(CLOSE) else {
            diagnostics.push(Diagnostic::Malformed { column: start });
            break;
        };
        if substitutions == MAX_SUBSTITUTIONS {
            diagnostics.push(Diagnostic::SubstitutionLimit {
                limit: MAX_SUBSTITUTIONS,
            });
            break;
        }

        let key_end = key_start + offset;
        let key = text[key_start..key_end].trim();
        let value = config.get(key).unwrap_or_else(|| {
            diagnostics.push(Diagnostic::MissingKey {
                key: key.to_string(),
            });
            ""
        });

        text.replace_range(start..key_end + CLOSE.len(), value);
        substitutions += 1;
    }

    ResolvedLine { text, diagnostics }
}
