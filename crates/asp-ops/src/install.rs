// SPDX-License-Identifier: MIT OR Apache-2.0
//! `resolve`, `install`, and `build`.
//!
//! `resolve` walks closures without touching the store or disk. `install`
//! pins, snapshots, writes the lock, then materializes and composes every
//! selected target. `build` is `install` narrowed to one target.

use asp_compose::{ComposeInput, ComposeOutcome, SettingsInput, compose_target};
use asp_core::{ArtifactRecord, HarnessId, Integrity, Selector, SpaceKey, SpaceRef};
use asp_lock::{LockBuilder, read_lock_if_exists, write_lock};
use asp_manifest::{ProjectManifest, TargetDef};
use asp_materialize::{MaterializeInput, MaterializeOptions, materialize_space};
use asp_registry::{GitRegistry, SelectorResolver};
use asp_resolver::{Closure, walk_closure};
use asp_store::SnapshotStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{ARTIFACTS_META_NAME, OpsContext, OpsError};

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

/// A resolved target: its compose list and closure.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// The target definition from the project manifest.
    pub definition: TargetDef,
    /// Parsed compose references.
    pub compose: Vec<SpaceRef>,
    /// The walked closure.
    pub closure: Closure,
}

/// Resolve every target (or just `filter`) without touching the store.
///
/// # Errors
///
/// Manifest, registry, and resolution errors; [`OpsError::UnknownTarget`]
/// when `filter` names a target the manifest does not declare.
pub fn resolve_targets(
    ctx: &OpsContext,
    filter: Option<&str>,
) -> Result<BTreeMap<String, ResolvedTarget>, OpsError> {
    let manifest = ProjectManifest::load(&ctx.project_manifest_path())?;
    let registry = GitRegistry::open(&ctx.registry_path)?;
    resolve_with(&manifest, &registry, filter, None)
}

/// Resolve with an optional old lock pinning selectors for locked targets.
fn resolve_with(
    manifest: &ProjectManifest,
    registry: &GitRegistry,
    filter: Option<&str>,
    pin_from: Option<&asp_core::LockFile>,
) -> Result<BTreeMap<String, ResolvedTarget>, OpsError> {
    if let Some(name) = filter
        && !manifest.targets.contains_key(name)
    {
        return Err(OpsError::UnknownTarget { name: name.into() });
    }

    let mut resolved = BTreeMap::new();
    for (name, definition) in &manifest.targets {
        if filter.is_some_and(|f| f != name) {
            continue;
        }
        if !definition.resolver.allow_dirty && registry.is_dirty()? {
            return Err(asp_registry::RegistryError::DirtyWorkingTree {
                path: registry.path().display().to_string(),
            }
            .into());
        }

        // One resolver per target so lock pinning stays target-scoped.
        let resolver = SelectorResolver::new(registry);
        if let Some(lock) = pin_from
            && definition.resolver.locked
        {
            preseed_from_lock(&resolver, lock);
        }

        let compose = manifest
            .compose_refs(name)
            .unwrap_or_default();
        let closure = walk_closure(&resolver, &compose)?;
        debug!(target = %name, spaces = closure.load_order.len(), "resolved target");
        resolved.insert(
            name.clone(),
            ResolvedTarget {
                definition: definition.clone(),
                compose,
                closure,
            },
        );
    }
    Ok(resolved)
}

/// Seed a resolver with every resolution the old lock recorded.
fn preseed_from_lock(resolver: &SelectorResolver<'_>, lock: &asp_core::LockFile) {
    for entry in lock.spaces.values() {
        let Some(selector_text) = entry.resolved_from.selector.as_deref() else {
            continue;
        };
        let Ok(selector) = Selector::classify(selector_text) else {
            continue;
        };
        resolver.preseed(
            &entry.id,
            selector_text,
            asp_core::ResolvedSelector {
                kind: selector.kind(),
                commit: entry.commit.clone(),
                display: display_from(&entry.resolved_from),
            },
        );
    }
}

fn display_from(resolved: &asp_core::ResolvedFrom) -> String {
    resolved
        .tag
        .clone()
        .or_else(|| resolved.semver.clone())
        .or_else(|| resolved.branch.clone())
        .or_else(|| resolved.commit.clone())
        .unwrap_or_else(|| "locked".into())
}

// ---------------------------------------------------------------------------
// install
// ---------------------------------------------------------------------------

/// Install behavior knobs.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// The harness to materialize and compose for.
    pub harness: HarnessId,
    /// Restrict to one target.
    pub target: Option<String>,
    /// Honor the existing lock's pins for targets with `resolver.locked`.
    pub use_lock: bool,
}

/// The result of an install.
#[derive(Debug)]
pub struct InstallOutcome {
    /// The lock that was written.
    pub lock: asp_core::LockFile,
    /// Composed bundle per installed target.
    pub bundles: BTreeMap<String, ComposeOutcome>,
}

/// Resolve, snapshot, lock, materialize, and compose.
///
/// # Errors
///
/// Everything the pipeline can raise, including a fatal integrity mismatch
/// when the registry's content no longer matches what the lock pinned.
pub fn install(ctx: &OpsContext, opts: &InstallOptions) -> Result<InstallOutcome, OpsError> {
    let manifest = ProjectManifest::load(&ctx.project_manifest_path())?;
    let registry = GitRegistry::open(&ctx.registry_path)?;
    let store = SnapshotStore::open(&ctx.home)?;
    let old_lock = read_lock_if_exists(&ctx.project_lock_path())?;

    let resolved = resolve_with(
        &manifest,
        &registry,
        opts.target.as_deref(),
        opts.use_lock.then_some(old_lock.as_ref()).flatten(),
    )?;

    // Pin everything: snapshots first, then the lock.
    let mut builder = LockBuilder::new(&ctx.registry_url());
    let mut integrities: BTreeMap<String, BTreeMap<SpaceKey, Integrity>> = BTreeMap::new();
    for (name, target) in &resolved {
        let mut map = BTreeMap::new();
        for node in target.closure.ordered_nodes() {
            let integrity = store.ensure_snapshot(&registry, &node.id, &node.commit)?;
            if let Some(old) = old_lock.as_ref().and_then(|l| l.spaces.get(&node.key))
                && !old.integrity.is_dev()
                && !integrity.is_dev()
                && old.integrity != integrity
            {
                return Err(asp_store::StoreError::IntegrityMismatch {
                    key: node.key.to_string(),
                    expected: old.integrity.to_string(),
                    computed: integrity.to_string(),
                }
                .into());
            }
            map.insert(node.key.clone(), integrity);
        }
        builder.add_target(name, &target.compose, &target.closure, &map);
        integrities.insert(name.clone(), map);
    }
    let mut lock = builder.finish();

    // Targets outside the filter keep their old pins, and unknown fields
    // ride through the rewrite.
    if let Some(old) = &old_lock {
        for (name, entry) in &old.targets {
            if !lock.targets.contains_key(name) {
                lock.targets.insert(name.clone(), entry.clone());
                for key in &entry.load_order {
                    if let Some(space) = old.spaces.get(key) {
                        lock.spaces.entry(key.clone()).or_insert_with(|| space.clone());
                    }
                }
            }
        }
        for (key, value) in &old.extra {
            lock.extra.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    write_lock(&ctx.project_lock_path(), &lock)?;
    info!(targets = resolved.len(), "lock written");

    // Materialize and compose each selected target.
    let mut bundles = BTreeMap::new();
    for (name, target) in &resolved {
        let outcome = materialize_and_compose(
            ctx,
            &registry,
            &store,
            name,
            target,
            opts.harness,
            &integrities[name],
        )?;
        bundles.insert(name.clone(), outcome);
    }

    // Record composition warnings against their targets. The lock was
    // already valid without them, so this second write only happens when a
    // merge was lossy.
    let mut warnings_changed = false;
    for (name, outcome) in &bundles {
        if let Some(entry) = lock.targets.get_mut(name)
            && entry.warnings != outcome.warnings
        {
            entry.warnings = outcome.warnings.clone();
            warnings_changed = true;
        }
    }
    if warnings_changed {
        write_lock(&ctx.project_lock_path(), &lock)?;
    }

    Ok(InstallOutcome { lock, bundles })
}

/// Install exactly one target and return its bundle.
///
/// # Errors
///
/// Same as [`install`].
pub fn build(
    ctx: &OpsContext,
    target: &str,
    harness: HarnessId,
) -> Result<ComposeOutcome, OpsError> {
    let mut outcome = install(
        ctx,
        &InstallOptions {
            harness,
            target: Some(target.into()),
            use_lock: true,
        },
    )?;
    outcome
        .bundles
        .remove(target)
        .ok_or_else(|| OpsError::UnknownTarget {
            name: target.into(),
        })
}

/// Materialize every space of `target` and compose the bundle.
pub(crate) fn materialize_and_compose(
    ctx: &OpsContext,
    registry: &GitRegistry,
    store: &SnapshotStore,
    name: &str,
    target: &ResolvedTarget,
    harness: HarnessId,
    integrities: &BTreeMap<SpaceKey, Integrity>,
) -> Result<ComposeOutcome, OpsError> {
    let (artifacts, settings) =
        materialize_closure(ctx, registry, store, name, &target.closure, harness, integrities)?;

    let out_dir = asp_harness::target_output_dir(&ctx.project_root, name, harness);
    let input = ComposeInput {
        harness,
        target_name: name,
        artifacts: &artifacts,
        settings: &settings,
        yolo: target.definition.yolo,
    };
    let outcome = compose_target(&input, &out_dir)?;
    asp_store::write_json_pretty(&out_dir.join(ARTIFACTS_META_NAME), &artifacts, false)?;
    Ok(outcome)
}

/// Materialize a closure's spaces in load order.
pub(crate) fn materialize_closure(
    ctx: &OpsContext,
    registry: &GitRegistry,
    store: &SnapshotStore,
    target_name: &str,
    closure: &Closure,
    harness: HarnessId,
    integrities: &BTreeMap<SpaceKey, Integrity>,
) -> Result<(Vec<ArtifactRecord>, Vec<SettingsInput>), OpsError> {
    let mut artifacts = Vec::new();
    let mut settings = Vec::new();

    for node in closure.ordered_nodes() {
        let integrity = integrities
            .get(&node.key)
            .cloned()
            .unwrap_or_else(Integrity::dev);
        let snapshot_path = snapshot_source(registry, store, node, &integrity);
        let out_dir = artifact_cache_dir(ctx, target_name, harness, &node.key);

        let input = MaterializeInput {
            space_key: &node.key,
            space_id: node.id.as_str(),
            manifest: &node.manifest,
            snapshot_path: &snapshot_path,
            integrity: &integrity,
        };
        let record = materialize_space(
            harness,
            &input,
            &out_dir,
            &MaterializeOptions {
                force: true,
                use_hardlinks: !node.commit.is_dev(),
            },
        )?;
        settings.push(SettingsInput {
            space_id: node.id.to_string(),
            settings: node.manifest.settings.clone(),
        });
        artifacts.push(record);
    }
    Ok((artifacts, settings))
}

/// Where a space's content is read from: the immutable snapshot, or the
/// working copy for dev spaces (an absolute node path wins over the
/// registry's `spaces/<id>` convention; dev runs point it at arbitrary
/// directories).
fn snapshot_source(
    registry: &GitRegistry,
    store: &SnapshotStore,
    node: &asp_resolver::ClosureNode,
    integrity: &Integrity,
) -> PathBuf {
    if node.commit.is_dev() {
        let declared = Path::new(&node.path);
        if declared.is_absolute() {
            declared.to_path_buf()
        } else {
            registry.space_dir(node.id.as_str())
        }
    } else {
        store.snapshot_path(integrity)
    }
}

/// Per-run artifact scratch under `cache/materialized/`.
fn artifact_cache_dir(
    ctx: &OpsContext,
    target: &str,
    harness: HarnessId,
    key: &SpaceKey,
) -> PathBuf {
    ctx.home
        .cache_materialized()
        .join(target)
        .join(harness.as_str())
        .join(key.as_str())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
