// SPDX-License-Identifier: MIT OR Apache-2.0
//! Artifact and composed-bundle records.
//!
//! A per-space, per-harness artifact directory is described by an
//! [`ArtifactRecord`]; the per-target result of composition is a
//! [`ComposedTargetBundle`] — the input the bundle invoker turns into a
//! harness command line.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::harness::HarnessId;
use crate::id::SpaceKey;
use crate::warning::Warning;

/// A per-space, per-harness materialized artifact directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// The pinned space this artifact was materialized from.
    pub space_key: SpaceKey,
    /// The space id.
    pub space_id: String,
    /// Root of the artifact directory.
    pub artifact_path: PathBuf,
    /// Plugin name the artifact presents as.
    pub plugin_name: String,
    /// Plugin version, when declared.
    pub plugin_version: Option<String>,
    /// Files emitted into the artifact, relative to its root.
    pub files: Vec<PathBuf>,
    /// Warnings emitted while materializing.
    pub warnings: Vec<Warning>,
}

/// The composed, ready-to-invoke bundle for one target on one harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedTargetBundle {
    /// The harness this bundle was composed for.
    pub harness: HarnessId,
    /// The target name.
    pub target_name: String,
    /// Root of the bundle directory.
    pub root_dir: PathBuf,
    /// Ordered plugin directories (Claude family). Alphabetic order of the
    /// directory names reproduces load order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugin_dirs: Vec<PathBuf>,
    /// Composed `mcp.json`, when any space declared MCP servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_config_path: Option<PathBuf>,
    /// Composed `settings.json` (Claude family; always written).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_path: Option<PathBuf>,
    /// Pi-specific layout, when composed for Pi.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pi: Option<PiBundle>,
    /// Pi SDK manifest, when composed for the Pi SDK.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pi_sdk: Option<PiSdkBundle>,
    /// Codex home template, when composed for Codex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codex: Option<CodexBundle>,
}

/// Pi-specific bundle layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiBundle {
    /// Merged, namespaced extensions directory.
    pub extensions_dir: PathBuf,
    /// Generated hook bridge extension, when any hooks exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_path: Option<PathBuf>,
    /// Merged skills directory, when any space ships skills.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills_dir: Option<PathBuf>,
}

/// Pi SDK bundle manifest location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiSdkBundle {
    /// Path of the emitted `bundle.json`.
    pub bundle_json_path: PathBuf,
}

/// Codex bundle layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodexBundle {
    /// Assembled `codex.home/` template, exported as `CODEX_HOME`.
    pub home_template_path: PathBuf,
}
