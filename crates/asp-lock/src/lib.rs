// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-lock
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Computing, persisting, drift-checking, and diffing lock files.

use asp_core::{
    Integrity, LOCKFILE_VERSION, LockFile, LockSpaceEntry, LockTargetEntry, PluginIdentity,
    ResolvedFrom, SpaceDeps, SpaceKey, SpaceRef,
};
use asp_resolver::Closure;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// File name of a project lock.
pub const PROJECT_LOCK_NAME: &str = "asp-lock.json";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by the lock engine.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The lock file could not be read.
    #[error("failed to read lock '{path}': {reason}")]
    Read {
        /// Lock file path.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// The lock file is not valid JSON for the lock schema.
    #[error("failed to parse lock '{path}': {reason}")]
    Parse {
        /// Lock file path.
        path: String,
        /// Underlying JSON error.
        reason: String,
    },

    /// The lock declares a schema version this build does not understand.
    #[error("lock '{path}' has unsupported lockfileVersion {found} (expected {LOCKFILE_VERSION})")]
    UnsupportedVersion {
        /// Lock file path.
        path: String,
        /// Version found in the file.
        found: u32,
    },

    /// Writing the lock failed.
    #[error(transparent)]
    Store(#[from] asp_store::StoreError),
}

// ---------------------------------------------------------------------------
// Compute
// ---------------------------------------------------------------------------

/// Builds a [`LockFile`] from resolved closures, one target at a time.
#[derive(Debug)]
pub struct LockBuilder {
    lock: LockFile,
}

impl LockBuilder {
    /// Start a new lock for `registry_url`.
    #[must_use]
    pub fn new(registry_url: &str) -> Self {
        Self {
            lock: LockFile::empty(registry_url),
        }
    }

    /// Add a target's closure to the lock.
    ///
    /// `integrity_of` supplies the snapshot digest per pinned key (the store
    /// computed it when the snapshot was ensured).
    pub fn add_target(
        &mut self,
        name: &str,
        compose: &[SpaceRef],
        closure: &Closure,
        integrity_of: &BTreeMap<SpaceKey, Integrity>,
    ) {
        for node in closure.ordered_nodes() {
            let integrity = integrity_of
                .get(&node.key)
                .cloned()
                .unwrap_or_else(Integrity::dev);
            self.lock.spaces.entry(node.key.clone()).or_insert_with(|| {
                LockSpaceEntry {
                    id: node.id.to_string(),
                    commit: node.commit.clone(),
                    path: node.path.clone(),
                    integrity,
                    plugin: PluginIdentity {
                        name: node.manifest.plugin_name().to_owned(),
                        version: node.manifest.plugin_version().map(str::to_owned),
                    },
                    deps: SpaceDeps {
                        spaces: node.deps.clone(),
                    },
                    resolved_from: ResolvedFrom::from_resolution(
                        &node.selector_text,
                        &node.resolved_from,
                    ),
                    extra: BTreeMap::new(),
                }
            });
        }

        let compose_strings: Vec<String> = compose.iter().map(SpaceRef::serialize).collect();
        let env_hash = env_hash(
            &self.lock.registry.url,
            &compose_strings,
            &closure.load_order,
            &self.lock.spaces,
        );
        self.lock.targets.insert(
            name.to_owned(),
            LockTargetEntry {
                compose: compose_strings,
                roots: closure.roots.clone(),
                load_order: closure.load_order.clone(),
                env_hash,
                warnings: Vec::new(),
                extra: BTreeMap::new(),
            },
        );
    }

    /// Finish and return the lock.
    #[must_use]
    pub fn finish(self) -> LockFile {
        self.lock
    }
}

/// Deterministic hash over a target's lock-relevant inputs.
///
/// Canonical serialization: `{lockfileVersion, resolverVersion, registryUrl,
/// spaces (sorted by key, restricted to the target's load order), compose,
/// loadOrder}` — hashed as compact JSON with sorted object keys. Resolution
/// provenance is excluded: a `resolvedFrom`-only change must not move the
/// hash, because it is not drift.
#[must_use]
pub fn env_hash(
    registry_url: &str,
    compose: &[String],
    load_order: &[SpaceKey],
    spaces: &BTreeMap<SpaceKey, LockSpaceEntry>,
) -> Integrity {
    let target_spaces: BTreeMap<&SpaceKey, serde_json::Value> = load_order
        .iter()
        .filter_map(|k| spaces.get(k).map(|e| (k, e)))
        .map(|(k, e)| {
            (
                k,
                serde_json::json!({
                    "id": e.id,
                    "commit": e.commit,
                    "path": e.path,
                    "integrity": e.integrity,
                    "plugin": e.plugin,
                    "deps": e.deps,
                }),
            )
        })
        .collect();

    let canonical = serde_json::json!({
        "lockfileVersion": LOCKFILE_VERSION,
        "resolverVersion": asp_core::RESOLVER_VERSION,
        "registryUrl": registry_url,
        "spaces": target_spaces,
        "compose": compose,
        "loadOrder": load_order,
    });
    let text = canonical.to_string();
    Integrity::from_hex(&format!("{:x}", Sha256::digest(text.as_bytes())))
}

// ---------------------------------------------------------------------------
// Serialize / read
// ---------------------------------------------------------------------------

/// Atomically write `lock` at `path` as pretty JSON with a trailing newline.
///
/// # Errors
///
/// Returns [`LockError::Store`] on filesystem failure.
pub fn write_lock(path: &Path, lock: &LockFile) -> Result<(), LockError> {
    debug!(path = %path.display(), targets = lock.targets.len(), "writing lock");
    asp_store::write_json_pretty(path, lock, true)?;
    Ok(())
}

/// Read and validate a lock file.
///
/// Unknown fields are preserved in the returned value, so a rewrite carries
/// them through.
///
/// # Errors
///
/// [`LockError::Read`] when the file is unreadable, [`LockError::Parse`] on
/// malformed JSON, [`LockError::UnsupportedVersion`] on a foreign schema.
pub fn read_lock(path: &Path) -> Result<LockFile, LockError> {
    let text = std::fs::read_to_string(path).map_err(|e| LockError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let lock: LockFile = serde_json::from_str(&text).map_err(|e| LockError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    if lock.lockfile_version != LOCKFILE_VERSION {
        return Err(LockError::UnsupportedVersion {
            path: path.display().to_string(),
            found: lock.lockfile_version,
        });
    }
    Ok(lock)
}

/// Read a lock if the file exists.
///
/// # Errors
///
/// Same as [`read_lock`], except a missing file is `Ok(None)`.
pub fn read_lock_if_exists(path: &Path) -> Result<Option<LockFile>, LockError> {
    if path.is_file() {
        read_lock(path).map(Some)
    } else {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Drift + diff
// ---------------------------------------------------------------------------

/// What changed for one target between an old lock and a fresh resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockDiff {
    /// Ids pinned only by the new lock.
    pub added: Vec<SpaceKey>,
    /// Ids pinned only by the old lock.
    pub removed: Vec<SpaceKey>,
    /// Same id pinned at a different commit: `(old, new)`.
    pub changed: Vec<(SpaceKey, SpaceKey)>,
    /// Whether the load order differs beyond the added/removed keys.
    pub load_order_changed: bool,
}

impl LockDiff {
    /// Whether anything differs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && !self.load_order_changed
    }
}

/// Diff one target between `old` and `new`.
///
/// Keys embed commits, so a commit change shows up as the same id under a
/// different key; those pair up under `changed` rather than added/removed.
/// A target absent on one side reports every key on the other side.
#[must_use]
pub fn diff_target(old: &LockFile, new: &LockFile, target: &str) -> LockDiff {
    let old_order = old
        .targets
        .get(target)
        .map(|t| t.load_order.clone())
        .unwrap_or_default();
    let new_order = new
        .targets
        .get(target)
        .map(|t| t.load_order.clone())
        .unwrap_or_default();

    let old_by_id: BTreeMap<&str, &SpaceKey> =
        old_order.iter().map(|k| (k.id(), k)).collect();
    let new_by_id: BTreeMap<&str, &SpaceKey> =
        new_order.iter().map(|k| (k.id(), k)).collect();

    let mut diff = LockDiff::default();
    for (id, new_key) in &new_by_id {
        match old_by_id.get(id) {
            None => diff.added.push((*new_key).clone()),
            Some(old_key) if old_key.as_str() != new_key.as_str() => {
                diff.changed.push(((*old_key).clone(), (*new_key).clone()));
            }
            Some(_) => {}
        }
    }
    for (id, old_key) in &old_by_id {
        if !new_by_id.contains_key(id) {
            diff.removed.push((*old_key).clone());
        }
    }

    let old_ids: Vec<&str> = old_order
        .iter()
        .map(|k| k.id())
        .filter(|id| new_by_id.contains_key(id))
        .collect();
    let new_ids: Vec<&str> = new_order
        .iter()
        .map(|k| k.id())
        .filter(|id| old_by_id.contains_key(id))
        .collect();
    diff.load_order_changed = old_ids != new_ids;

    diff
}

/// Whether `target` drifted between `old` and `new`.
///
/// Key-set differences and commit changes are drift; a provenance-only
/// change (same commit, different `resolvedFrom`) is not. An `envHash`
/// mismatch implies drift because the hash covers commits and order.
#[must_use]
pub fn target_drifted(old: &LockFile, new: &LockFile, target: &str) -> bool {
    match (old.targets.get(target), new.targets.get(target)) {
        (Some(o), Some(n)) => {
            if o.env_hash != n.env_hash {
                return true;
            }
            let old_keys: Vec<&SpaceKey> = o.load_order.iter().collect();
            let new_keys: Vec<&SpaceKey> = n.load_order.iter().collect();
            old_keys != new_keys
        }
        (None, None) => false,
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Global merge
// ---------------------------------------------------------------------------

/// Merge a freshly computed global-run lock into the existing global lock.
///
/// Spaces and targets union; the new entries win on key collision. Metadata
/// (`generatedAt`, registry, versions) comes from the new lock.
#[must_use]
pub fn merge_global(existing: LockFile, new: LockFile) -> LockFile {
    let mut merged = new;
    for (key, entry) in existing.spaces {
        merged.spaces.entry(key).or_insert(entry);
    }
    for (name, target) in existing.targets {
        merged.targets.entry(name).or_insert(target);
    }
    for (key, value) in existing.extra {
        merged.extra.entry(key).or_insert(value);
    }
    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
