// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical hook translation.
//!
//! `hooks.toml` declares hooks against canonical events; this module maps
//! them onto each harness's native vocabulary. Events a harness does not
//! map, and hooks restricted to the other harness family, are skipped in
//! that harness's output.

use asp_manifest::{HookDef, HookEvent, HooksConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The Claude event name for a canonical event.
#[must_use]
pub fn claude_event_name(event: HookEvent) -> &'static str {
    match event {
        HookEvent::PreToolUse => "PreToolUse",
        HookEvent::PostToolUse => "PostToolUse",
        HookEvent::SessionStart => "SessionStart",
        HookEvent::SessionEnd => "SessionEnd",
        HookEvent::Stop => "Stop",
        HookEvent::UserPromptSubmit => "UserPromptSubmit",
        HookEvent::SubagentStart => "SubagentStart",
        HookEvent::SubagentStop => "SubagentStop",
        HookEvent::PreCompact => "PreCompact",
    }
}

/// The Pi event name for a canonical event, when Pi maps it.
#[must_use]
pub fn pi_event_name(event: HookEvent) -> Option<&'static str> {
    match event {
        HookEvent::PreToolUse => Some("tool_call"),
        HookEvent::PostToolUse => Some("tool_result"),
        HookEvent::SessionStart => Some("session_start"),
        HookEvent::SessionEnd => Some("session_shutdown"),
        HookEvent::Stop
        | HookEvent::UserPromptSubmit
        | HookEvent::SubagentStart
        | HookEvent::SubagentStop
        | HookEvent::PreCompact => None,
    }
}

/// The matcher string derived from a hook's tool list: `"*"` when
/// unspecified, `"A|B"` when specified.
#[must_use]
pub fn matcher_for(def: &HookDef) -> String {
    match &def.tools {
        Some(tools) if !tools.is_empty() => tools.join("|"),
        _ => "*".into(),
    }
}

// ---------------------------------------------------------------------------
// Claude hooks.json shape
// ---------------------------------------------------------------------------

/// One `{type: "command", command}` entry in Claude's `hooks.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaudeHookCommand {
    /// Always `"command"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Command line Claude runs, rooted at `${CLAUDE_PLUGIN_ROOT}`.
    pub command: String,
}

/// One matcher group under an event in `hooks.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaudeHookMatcher {
    /// Tool matcher: `"*"` or `"A|B"`.
    pub matcher: String,
    /// Commands in original declaration order.
    pub hooks: Vec<ClaudeHookCommand>,
}

/// The `hooks/hooks.json` document Claude Code loads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClaudeHooksFile {
    /// Matcher groups per Claude event name.
    pub hooks: BTreeMap<String, Vec<ClaudeHookMatcher>>,
}

impl ClaudeHooksFile {
    /// Whether no hooks survived translation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

/// Translate a canonical hook list into Claude's `hooks.json` shape.
///
/// For each event there is one entry per unique matcher (first-seen order);
/// each entry lists its scripts in original order as
/// `${CLAUDE_PLUGIN_ROOT}/hooks/<script>` commands. Hooks restricted to Pi
/// are skipped.
#[must_use]
pub fn translate_hooks_to_claude(config: &HooksConfig) -> ClaudeHooksFile {
    let mut file = ClaudeHooksFile::default();

    for def in config.hooks.iter().filter(|d| d.applies_to_claude()) {
        let event = claude_event_name(def.event).to_owned();
        let matcher = matcher_for(def);
        let command = ClaudeHookCommand {
            kind: "command".into(),
            command: format!("${{CLAUDE_PLUGIN_ROOT}}/hooks/{}", def.script),
        };

        let groups = file.hooks.entry(event).or_default();
        if let Some(group) = groups.iter_mut().find(|g| g.matcher == matcher) {
            group.hooks.push(command);
        } else {
            groups.push(ClaudeHookMatcher {
                matcher,
                hooks: vec![command],
            });
        }
    }

    file
}

/// The hooks that apply when bridging to Pi, paired with their Pi event
/// names. Hooks restricted to Claude and canonically unmapped events are
/// skipped.
#[must_use]
pub fn pi_bridge_hooks(config: &HooksConfig) -> Vec<(&'static str, &HookDef)> {
    config
        .hooks
        .iter()
        .filter(|d| d.applies_to_pi())
        .filter_map(|d| pi_event_name(d.event).map(|name| (name, d)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
