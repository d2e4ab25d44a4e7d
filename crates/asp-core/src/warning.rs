// SPDX-License-Identifier: MIT OR Apache-2.0
//! Warning records shared by the composer, the linter, and the lock file.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a warning is.
///
/// Any `Error`-severity finding aborts `run` before the harness spawns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational notice.
    Info,
    /// Something is lossy or suspicious but the bundle still works.
    Warning,
    /// The bundle is broken; running it would misbehave.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A coded warning attached to a lock target or emitted by the linter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Warning {
    /// Stable code, e.g. `W201`.
    pub code: String,
    /// Severity level.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Space ids involved, when known.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spaces: Vec<String>,
}

impl Warning {
    /// Build a warning-severity record.
    #[must_use]
    pub fn warning(code: &str, message: impl Into<String>, spaces: &[&str]) -> Self {
        Self::with_severity(code, Severity::Warning, message, spaces)
    }

    /// Build an info-severity record.
    #[must_use]
    pub fn info(code: &str, message: impl Into<String>, spaces: &[&str]) -> Self {
        Self::with_severity(code, Severity::Info, message, spaces)
    }

    /// Build an error-severity record.
    #[must_use]
    pub fn error(code: &str, message: impl Into<String>, spaces: &[&str]) -> Self {
        Self::with_severity(code, Severity::Error, message, spaces)
    }

    fn with_severity(
        code: &str,
        severity: Severity,
        message: impl Into<String>,
        spaces: &[&str],
    ) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            spaces: spaces.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Severity ordering enables max() over findings ----------------------

    #[test]
    fn severity_orders_info_warning_error() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    // -- 2. Display form -------------------------------------------------------

    #[test]
    fn display_includes_code_and_severity() {
        let w = Warning::warning("W201", "command collision on 'build'", &["a", "b"]);
        let s = w.to_string();
        assert!(s.contains("W201"));
        assert!(s.contains("warning"));
        assert!(s.contains("build"));
    }

    // -- 3. Empty spaces list is omitted from JSON -----------------------------

    #[test]
    fn empty_spaces_omitted() {
        let w = Warning::info("W301", "note", &[]);
        let json = serde_json::to_string(&w).unwrap();
        assert!(!json.contains("spaces"));
    }
}
