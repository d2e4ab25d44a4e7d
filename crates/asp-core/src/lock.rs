// SPDX-License-Identifier: MIT OR Apache-2.0
//! Lock-file schema types.
//!
//! The lock pins every space in every target to a commit and an integrity,
//! and records the per-target postorder load order. Field names are camelCase
//! on the wire; unknown fields are captured and carried through rewrites so
//! future schema additions survive older binaries.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::id::{CommitSha, SpaceKey};
use crate::integrity::Integrity;
use crate::reference::{ResolvedSelector, SelectorKind};
use crate::warning::Warning;
use crate::{LOCKFILE_VERSION, RESOLVER_VERSION};

// ---------------------------------------------------------------------------
// LockFile
// ---------------------------------------------------------------------------

/// The pinned, integrity-addressed resolution of a project's targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LockFile {
    /// Lock schema version. Always [`LOCKFILE_VERSION`].
    pub lockfile_version: u32,
    /// Resolver algorithm version. Always [`RESOLVER_VERSION`].
    pub resolver_version: u32,
    /// When this lock was generated.
    pub generated_at: DateTime<Utc>,
    /// Where the spaces were resolved from.
    pub registry: RegistrySource,
    /// Every pinned space, keyed by `<id>@<commit12>`.
    pub spaces: BTreeMap<SpaceKey, LockSpaceEntry>,
    /// Every locked target, keyed by target name.
    pub targets: BTreeMap<String, LockTargetEntry>,
    /// Unknown fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl LockFile {
    /// An empty lock for the given registry URL, stamped now.
    #[must_use]
    pub fn empty(registry_url: &str) -> Self {
        Self {
            lockfile_version: LOCKFILE_VERSION,
            resolver_version: RESOLVER_VERSION,
            generated_at: Utc::now(),
            registry: RegistrySource {
                kind: "git".into(),
                url: registry_url.into(),
            },
            spaces: BTreeMap::new(),
            targets: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }

    /// Every distinct integrity pinned by any space in this lock.
    ///
    /// Dev sentinels are excluded: they have no snapshot to protect.
    #[must_use]
    pub fn live_integrities(&self) -> Vec<Integrity> {
        let mut out: Vec<Integrity> = self
            .spaces
            .values()
            .filter(|e| !e.integrity.is_dev())
            .map(|e| e.integrity.clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }
}

/// Registry provenance of a lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegistrySource {
    /// Registry protocol. Only `git` is supported.
    #[serde(rename = "type")]
    pub kind: String,
    /// Location of the registry checkout or remote.
    pub url: String,
}

// ---------------------------------------------------------------------------
// LockSpaceEntry
// ---------------------------------------------------------------------------

/// One pinned space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LockSpaceEntry {
    /// The space id.
    pub id: String,
    /// The pinned commit (or `dev`).
    pub commit: CommitSha,
    /// Path of the space inside the registry, e.g. `spaces/base`.
    pub path: String,
    /// Snapshot content digest; `sha256:dev` for dev spaces.
    pub integrity: Integrity,
    /// Plugin identity the space materializes as.
    pub plugin: PluginIdentity,
    /// Declared dependencies, as pinned keys.
    #[serde(default)]
    pub deps: SpaceDeps,
    /// How the selector resolved to this commit.
    #[serde(default, skip_serializing_if = "ResolvedFrom::is_empty")]
    pub resolved_from: ResolvedFrom,
    /// Unknown fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Plugin identity recorded for a pinned space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PluginIdentity {
    /// Plugin name (kebab-case).
    pub name: String,
    /// Plugin version, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Dependency lists of a pinned space.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct SpaceDeps {
    /// Space dependencies, as pinned keys, in declared order.
    #[serde(default)]
    pub spaces: Vec<SpaceKey>,
}

/// Resolution provenance recorded in the lock.
///
/// Exactly one of the kind-specific fields is populated, matching the
/// selector kind that resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFrom {
    /// The original selector text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Tag that resolved, including the `space/<id>/` scope when used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Semver requirement and the version chosen for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semver: Option<String>,
    /// Branch whose tip was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Explicit commit that was verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl ResolvedFrom {
    /// Whether no provenance was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selector.is_none()
            && self.tag.is_none()
            && self.semver.is_none()
            && self.branch.is_none()
            && self.commit.is_none()
    }

    /// Build provenance from a resolution result.
    #[must_use]
    pub fn from_resolution(selector_text: &str, resolved: &ResolvedSelector) -> Self {
        let mut out = Self {
            selector: Some(selector_text.to_owned()),
            ..Self::default()
        };
        match resolved.kind {
            SelectorKind::Tag => out.tag = Some(resolved.display.clone()),
            SelectorKind::Semver => out.semver = Some(resolved.display.clone()),
            SelectorKind::Branch => out.branch = Some(resolved.display.clone()),
            SelectorKind::Commit => out.commit = Some(resolved.commit.to_string()),
            SelectorKind::Dev => {}
        }
        out
    }
}

// ---------------------------------------------------------------------------
// LockTargetEntry
// ---------------------------------------------------------------------------

/// One locked target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LockTargetEntry {
    /// The compose list as written in the project manifest.
    pub compose: Vec<String>,
    /// Keys of the compose roots.
    pub roots: Vec<SpaceKey>,
    /// Topological postorder over the closure: dependencies first.
    pub load_order: Vec<SpaceKey>,
    /// Deterministic hash of the target's lock-relevant inputs.
    pub env_hash: Integrity,
    /// Warnings recorded while composing this target.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    /// Unknown fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
