// SPDX-License-Identifier: MIT OR Apache-2.0
//! Human-readable rendering of orchestrator reports.

use asp_core::Warning;
use asp_lock::LockDiff;
use asp_ops::{DoctorReport, TargetExplain};
use asp_store::GcOutcome;
use std::fmt::Write as _;

/// Render an `explain` report.
#[must_use]
pub fn render_explain(reports: &[TargetExplain]) -> String {
    let mut out = String::new();
    for target in reports {
        let _ = writeln!(out, "target {}", target.name);
        let _ = writeln!(out, "  compose: {}", target.compose.join(", "));
        for space in &target.spaces {
            let _ = writeln!(out, "  space {}", space.key);
            let _ = writeln!(
                out,
                "    plugin: {}{}",
                space.plugin.name,
                space
                    .plugin
                    .version
                    .as_deref()
                    .map(|v| format!("@{v}"))
                    .unwrap_or_default()
            );
            if let Some(selector) = &space.resolved_from.selector {
                let via = space
                    .resolved_from
                    .tag
                    .as_deref()
                    .or(space.resolved_from.semver.as_deref())
                    .or(space.resolved_from.branch.as_deref())
                    .or(space.resolved_from.commit.as_deref())
                    .unwrap_or("dev");
                let _ = writeln!(out, "    resolved: {selector} via {via}");
            }
            let _ = writeln!(out, "    integrity: {}", space.integrity);
            if !space.components.is_empty() {
                let _ = writeln!(out, "    components: {}", space.components.join(", "));
            }
            for hook in &space.hooks {
                let _ = writeln!(out, "    hook: {hook}");
            }
            for server in &space.mcp_servers {
                let _ = writeln!(out, "    mcp: {server}");
            }
        }
        if let Some(settings) = &target.composed_settings {
            if let Some(allow) = settings["permissions"]["allow"].as_array()
                && !allow.is_empty()
            {
                let entries: Vec<&str> =
                    allow.iter().filter_map(|v| v.as_str()).collect();
                let _ = writeln!(out, "  allow: {}", entries.join(", "));
            }
            if let Some(deny) = settings["permissions"]["deny"].as_array()
                && !deny.is_empty()
            {
                let entries: Vec<&str> =
                    deny.iter().filter_map(|v| v.as_str()).collect();
                let _ = writeln!(out, "  deny: {}", entries.join(", "));
            }
            if let Some(model) = settings["model"].as_str() {
                let _ = writeln!(out, "  model: {model}");
            }
        }
        for warning in &target.warnings {
            let _ = writeln!(out, "  {warning}");
        }
    }
    out
}

/// Render a lock diff.
#[must_use]
pub fn render_diff(diff: &LockDiff) -> String {
    if diff.is_empty() {
        return "no changes\n".into();
    }
    let mut out = String::new();
    for key in &diff.added {
        let _ = writeln!(out, "+ {key}");
    }
    for key in &diff.removed {
        let _ = writeln!(out, "- {key}");
    }
    for (old, new) in &diff.changed {
        let _ = writeln!(out, "~ {old} -> {new}");
    }
    if diff.load_order_changed {
        let _ = writeln!(out, "! load order changed");
    }
    out
}

/// Render a doctor report.
#[must_use]
pub fn render_doctor(report: &DoctorReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "asp home: {} ({})", report.home, ok(report.home_ok));
    let _ = writeln!(
        out,
        "registry: {}{}",
        ok(report.registry_ok),
        if report.registry_dirty { " (dirty)" } else { "" }
    );
    for (harness, available, binary) in &report.harnesses {
        let _ = writeln!(
            out,
            "harness {harness}: {}{}",
            ok(*available),
            binary
                .as_deref()
                .map(|b| format!(" at {b}"))
                .unwrap_or_default()
        );
    }
    out
}

/// Render a GC outcome.
#[must_use]
pub fn render_gc(outcome: &GcOutcome, dry_run: bool) -> String {
    format!(
        "{}{} snapshot(s), {} byte(s)\n",
        if dry_run { "would remove " } else { "removed " },
        outcome.snapshots_deleted,
        outcome.bytes_freed
    )
}

/// Render warnings one per line.
#[must_use]
pub fn render_warnings(warnings: &[Warning]) -> String {
    let mut out = String::new();
    for warning in warnings {
        let _ = writeln!(out, "{warning}");
    }
    out
}

fn ok(flag: bool) -> &'static str {
    if flag { "ok" } else { "missing" }
}
