// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical hook declarations (`hooks.toml`).
//!
//! Spaces declare hooks against canonical event names; the materializer
//! translates them into each harness's native shape.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::ManifestError;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Canonical hook events.
///
/// Not every harness maps every event; unmapped events are skipped in that
/// harness's output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// Before a tool call executes.
    PreToolUse,
    /// After a tool call returns.
    PostToolUse,
    /// When a session starts.
    SessionStart,
    /// When a session ends.
    SessionEnd,
    /// When the agent stops a turn.
    Stop,
    /// When the user submits a prompt.
    UserPromptSubmit,
    /// When a subagent starts.
    SubagentStart,
    /// When a subagent stops.
    SubagentStop,
    /// Before context compaction.
    PreCompact,
}

impl HookEvent {
    /// All canonical events, in a stable order.
    pub const ALL: [Self; 9] = [
        Self::PreToolUse,
        Self::PostToolUse,
        Self::SessionStart,
        Self::SessionEnd,
        Self::Stop,
        Self::UserPromptSubmit,
        Self::SubagentStart,
        Self::SubagentStop,
        Self::PreCompact,
    ];

    /// The canonical snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreToolUse => "pre_tool_use",
            Self::PostToolUse => "post_tool_use",
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::Stop => "stop",
            Self::UserPromptSubmit => "user_prompt_submit",
            Self::SubagentStart => "subagent_start",
            Self::SubagentStop => "subagent_stop",
            Self::PreCompact => "pre_compact",
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Restricts a hook to a single harness family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HookHarness {
    /// Only materialize for the Claude family.
    Claude,
    /// Only materialize for the Pi family.
    Pi,
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// One hook declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HookDef {
    /// Canonical event this hook fires on.
    pub event: HookEvent,
    /// Script path relative to the space's `hooks/` directory.
    pub script: String,
    /// Tool names this hook matches. Absent means every tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    /// Whether a nonzero exit should block the tool call.
    #[serde(default)]
    pub blocking: bool,
    /// Restrict to one harness family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harness: Option<HookHarness>,
}

impl HookDef {
    /// Whether this hook applies when materializing for the Claude family.
    #[must_use]
    pub fn applies_to_claude(&self) -> bool {
        !matches!(self.harness, Some(HookHarness::Pi))
    }

    /// Whether this hook applies when materializing for the Pi family.
    #[must_use]
    pub fn applies_to_pi(&self) -> bool {
        !matches!(self.harness, Some(HookHarness::Claude))
    }
}

/// The `hooks.toml` document: a list of `[[hook]]` entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct HooksConfig {
    /// Declared hooks, in file order.
    #[serde(default, rename = "hook")]
    pub hooks: Vec<HookDef>,
}

impl HooksConfig {
    /// Parse and validate a `hooks.toml` document.
    ///
    /// # Errors
    ///
    /// [`ManifestError::Parse`] when the TOML is malformed (including
    /// unknown event names), [`ManifestError::Validation`] for empty script
    /// paths.
    pub fn parse(content: &str, source_path: &str) -> Result<Self, ManifestError> {
        let config: Self = toml::from_str(content).map_err(|e| ManifestError::Parse {
            path: source_path.into(),
            reason: e.to_string(),
        })?;

        let mut issues = Vec::new();
        for (i, hook) in config.hooks.iter().enumerate() {
            if hook.script.trim().is_empty() {
                issues.push(format!("hook[{i}].script: must not be empty"));
            }
        }
        ManifestError::check(source_path, issues)?;
        Ok(config)
    }

    /// Read, parse, and validate a `hooks.toml` file on disk.
    ///
    /// # Errors
    ///
    /// [`ManifestError::Io`] when the file cannot be read, plus the
    /// [`HooksConfig::parse`] errors.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
