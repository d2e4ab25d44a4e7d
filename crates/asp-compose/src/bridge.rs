// SPDX-License-Identifier: MIT OR Apache-2.0
//! The Pi hook bridge generator.
//!
//! Pi has no native support for ASP's canonical hooks, so the composer emits
//! a small extension that subscribes to Pi's event stream and shells out to
//! the configured scripts. The contract: forward the stable `ASP_*`
//! environment variables and the JSON payload on stdin, surface
//! stdout/stderr into the session, and return a block decision for
//! `tool_call` events when `blocking = true` and the script exits nonzero.

use serde::Serialize;

/// File name of the generated bridge extension.
pub const BRIDGE_FILE_NAME: &str = "asp-hooks.bridge.js";

/// One hook entry embedded in the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeHook {
    /// Pi event name (`tool_call`, `tool_result`, `session_start`,
    /// `session_shutdown`).
    pub event: String,
    /// Resolved script command: bundle-relative path, or an absolute path /
    /// full command line passed through unchanged.
    pub script: String,
    /// Tool names this hook matches; empty matches every tool.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    /// Whether a nonzero exit blocks the tool call.
    pub blocking: bool,
    /// Space the hook came from.
    pub space_id: String,
}

/// Input to the bridge generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSpec {
    /// Target name, exported as `ASP_TARGET`.
    pub target_name: String,
    /// Harness id, exported as `ASP_HARNESS`.
    pub harness: String,
    /// Composed space ids, exported comma-joined as `ASP_SPACE_IDS`.
    pub space_ids: Vec<String>,
    /// Hooks to register, in load order.
    pub hooks: Vec<BridgeHook>,
    /// When set, blocking hooks report but never block.
    pub yolo: bool,
}

/// Render the bridge extension source.
///
/// The hook table is embedded as JSON; everything dynamic at run time comes
/// from the event payload and the environment Pi provides.
#[must_use]
pub fn generate_bridge_source(spec: &BridgeSpec) -> String {
    let hooks_json =
        serde_json::to_string_pretty(&spec.hooks).unwrap_or_else(|_| "[]".into());
    let space_ids = spec.space_ids.join(",");

    format!(
        r#"// Generated by asp; do not edit.
//
// Bridges Pi events onto hook scripts declared in hooks.toml across the
// composed spaces. Scripts receive the event payload as JSON on stdin and
// the stable ASP_* environment variables.
const {{ spawnSync }} = require("node:child_process");
const path = require("node:path");

const HOOKS = {hooks_json};
const TARGET = {target:?};
const HARNESS = {harness:?};
const SPACE_IDS = {space_ids:?};
const YOLO = {yolo};

function resolveScript(script, bundleRoot) {{
  if (path.isAbsolute(script) || /\s/.test(script)) return script;
  return path.join(bundleRoot, script);
}}

function runHook(hook, event, payload, ctx) {{
  const bundleRoot = ctx.bundleRoot;
  const env = {{
    ...process.env,
    ASP_HARNESS: HARNESS,
    ASP_TARGET: TARGET,
    ASP_BUNDLE_ROOT: bundleRoot,
    ASP_EVENT: event,
    ASP_TOOL_NAME: payload.toolName ?? "",
    ASP_TOOL_INPUT: JSON.stringify(payload.toolInput ?? null),
    ASP_TOOL_RESULT: JSON.stringify(payload.toolResult ?? null),
    ASP_SESSION_ID: ctx.sessionId ?? "",
    ASP_SPACE_IDS: SPACE_IDS,
  }};
  const result = spawnSync(resolveScript(hook.script, bundleRoot), {{
    input: JSON.stringify(payload),
    env,
    shell: /\s/.test(hook.script),
    encoding: "utf8",
  }});
  if (result.stdout) ctx.log(`[asp:${{hook.space_id}}] ${{result.stdout.trimEnd()}}`);
  if (result.stderr) ctx.log(`[asp:${{hook.space_id}}] ${{result.stderr.trimEnd()}}`);
  return result.status ?? 0;
}}

function matches(hook, payload) {{
  if (!hook.tools || hook.tools.length === 0) return true;
  return hook.tools.includes(payload.toolName);
}}

module.exports = function register(pi) {{
  for (const hook of HOOKS) {{
    pi.on(hook.event, (payload, ctx) => {{
      if (!matches(hook, payload)) return undefined;
      const status = runHook(hook, hook.event, payload, ctx);
      if (hook.event === "tool_call" && hook.blocking && status !== 0 && !YOLO) {{
        return {{ block: true, reason: `blocked by ${{hook.space_id}} hook (exit ${{status}})` }};
      }}
      return undefined;
    }});
  }}
}};
"#,
        hooks_json = hooks_json,
        target = spec.target_name,
        harness = spec.harness,
        space_ids = space_ids,
        yolo = spec.yolo,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
