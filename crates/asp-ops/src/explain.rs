// SPDX-License-Identifier: MIT OR Apache-2.0
//! `explain`, `list`, and `doctor`.
//!
//! `explain` renders what the lock pinned for each target: plugin identity,
//! resolution provenance, component inventory, hooks, MCP servers, and the
//! composed rollups, with lint findings attached when artifacts exist on
//! disk.

use asp_core::{HarnessId, PluginIdentity, ResolvedFrom, SpaceKey, Warning};
use asp_harness::AvailabilityOracle;
use asp_lint::lint_artifacts;
use asp_lock::read_lock_if_exists;
use asp_manifest::{HooksConfig, ProjectManifest};
use asp_registry::GitRegistry;
use asp_store::SnapshotStore;
use serde::Serialize;
use std::path::Path;

use crate::run::read_artifacts_meta;
use crate::{OpsContext, OpsError};

// ---------------------------------------------------------------------------
// explain
// ---------------------------------------------------------------------------

/// Everything `explain` reports about one pinned space.
#[derive(Debug, Clone, Serialize)]
pub struct SpaceExplain {
    /// The pinned key.
    pub key: SpaceKey,
    /// The space id.
    pub id: String,
    /// Plugin identity.
    pub plugin: PluginIdentity,
    /// The pinned commit.
    pub commit: String,
    /// Snapshot integrity.
    pub integrity: String,
    /// Resolution provenance.
    pub resolved_from: ResolvedFrom,
    /// Component directories present in the snapshot.
    pub components: Vec<String>,
    /// Declared hook events and scripts.
    pub hooks: Vec<String>,
    /// Declared MCP server names.
    pub mcp_servers: Vec<String>,
}

/// Everything `explain` reports about one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetExplain {
    /// Target name.
    pub name: String,
    /// Compose list as written.
    pub compose: Vec<String>,
    /// Postorder load order.
    pub load_order: Vec<SpaceKey>,
    /// Per-space details, in load order.
    pub spaces: Vec<SpaceExplain>,
    /// The composed `settings.json` rollup, when the target is installed
    /// for the inspected harness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composed_settings: Option<serde_json::Value>,
    /// Lint findings plus warnings the lock recorded.
    pub warnings: Vec<Warning>,
}

/// Explain every locked target (or just `filter`).
///
/// # Errors
///
/// Lock read errors; [`OpsError::UnknownTarget`] when `filter` names a
/// target the lock does not contain; a missing lock yields an empty report.
pub fn explain(
    ctx: &OpsContext,
    harness: HarnessId,
    filter: Option<&str>,
) -> Result<Vec<TargetExplain>, OpsError> {
    let Some(lock) = read_lock_if_exists(&ctx.project_lock_path())? else {
        return Ok(Vec::new());
    };
    if let Some(name) = filter
        && !lock.targets.contains_key(name)
    {
        return Err(OpsError::UnknownTarget { name: name.into() });
    }
    let store = SnapshotStore::open(&ctx.home)?;
    let registry = GitRegistry::open(&ctx.registry_path).ok();

    let mut reports = Vec::new();
    for (name, target) in &lock.targets {
        if filter.is_some_and(|f| f != name) {
            continue;
        }

        let mut spaces = Vec::new();
        for key in &target.load_order {
            let Some(entry) = lock.spaces.get(key) else {
                continue;
            };
            let snapshot = if entry.integrity.is_dev() {
                registry.as_ref().map(|r| r.space_dir(&entry.id))
            } else {
                Some(store.snapshot_path(&entry.integrity))
            };
            let (components, hooks, mcp_servers) = snapshot
                .as_deref()
                .map(inventory)
                .unwrap_or_default();

            spaces.push(SpaceExplain {
                key: key.clone(),
                id: entry.id.clone(),
                plugin: entry.plugin.clone(),
                commit: entry.commit.to_string(),
                integrity: entry.integrity.to_string(),
                resolved_from: entry.resolved_from.clone(),
                components,
                hooks,
                mcp_servers,
            });
        }

        let mut warnings = target.warnings.clone();
        let bundle_dir = asp_harness::target_output_dir(&ctx.project_root, name, harness);
        if let Ok(artifacts) = read_artifacts_meta(&bundle_dir) {
            for artifact in &artifacts {
                warnings.extend(artifact.warnings.iter().cloned());
            }
            warnings.extend(lint_artifacts(harness, &artifacts));
        }
        // The lock carries compose warnings and artifacts repeat their own;
        // show each finding once.
        let mut seen = Vec::new();
        warnings.retain(|w| {
            if seen.contains(w) {
                false
            } else {
                seen.push(w.clone());
                true
            }
        });
        let composed_settings = std::fs::read_to_string(bundle_dir.join("settings.json"))
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok());

        reports.push(TargetExplain {
            name: name.clone(),
            compose: target.compose.clone(),
            load_order: target.load_order.clone(),
            spaces,
            composed_settings,
            warnings,
        });
    }
    Ok(reports)
}

/// Inventory one snapshot: component dirs, hooks, MCP server names.
fn inventory(snapshot: &Path) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut components = Vec::new();
    for dir in [
        "commands",
        "skills",
        "agents",
        "hooks",
        "scripts",
        "mcp",
        "extensions",
    ] {
        if snapshot.join(dir).is_dir() {
            components.push(dir.to_owned());
        }
    }

    let mut hooks = Vec::new();
    let hooks_toml = snapshot.join("hooks").join("hooks.toml");
    if let Ok(config) = HooksConfig::load(&hooks_toml) {
        for def in &config.hooks {
            hooks.push(format!("{} -> {}", def.event, def.script));
        }
    }

    let mut mcp_servers = Vec::new();
    let mcp_path = snapshot.join("mcp").join("mcp.json");
    if let Ok(text) = std::fs::read_to_string(&mcp_path)
        && let Ok(doc) = serde_json::from_str::<serde_json::Value>(&text)
        && let Some(servers) = doc.get("mcpServers").and_then(|v| v.as_object())
    {
        mcp_servers.extend(servers.keys().cloned());
    }

    (components, hooks, mcp_servers)
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

/// Summaries of the targets a project declares.
///
/// # Errors
///
/// Manifest load errors.
pub fn list_targets(ctx: &OpsContext) -> Result<Vec<(String, Vec<String>, Option<String>)>, OpsError> {
    let manifest = ProjectManifest::load(&ctx.project_manifest_path())?;
    Ok(manifest
        .targets
        .iter()
        .map(|(name, target)| {
            (
                name.clone(),
                target.compose.clone(),
                target.description.clone(),
            )
        })
        .collect())
}

// ---------------------------------------------------------------------------
// doctor
// ---------------------------------------------------------------------------

/// Health report for the local installation.
#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    /// The home directory in use.
    pub home: String,
    /// Whether the home layout exists (store, cache, temp).
    pub home_ok: bool,
    /// Whether the registry opened as a git work tree.
    pub registry_ok: bool,
    /// Whether the registry working tree is dirty.
    pub registry_dirty: bool,
    /// Per-harness availability: `(harness, available, binary)`.
    pub harnesses: Vec<(String, bool, Option<String>)>,
}

/// Probe the home layout, the registry, and every harness binary.
#[must_use]
pub fn doctor(ctx: &OpsContext, oracle: &dyn AvailabilityOracle) -> DoctorReport {
    let registry = GitRegistry::open(&ctx.registry_path);
    let registry_dirty = registry
        .as_ref()
        .ok()
        .and_then(|r| r.is_dirty().ok())
        .unwrap_or(false);

    let harnesses = HarnessId::ALL
        .iter()
        .map(|h| {
            let availability = oracle.detect(*h);
            (
                h.to_string(),
                availability.is_some(),
                availability.map(|a| a.binary.display().to_string()),
            )
        })
        .collect();

    DoctorReport {
        home: ctx.home.root().display().to_string(),
        home_ok: ctx.home.store_spaces().is_dir() && ctx.home.temp().is_dir(),
        registry_ok: registry.is_ok(),
        registry_dirty,
        harnesses,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
