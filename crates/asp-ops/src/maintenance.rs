// SPDX-License-Identifier: MIT OR Apache-2.0
//! `diff` and `gc`.

use asp_lock::{LockBuilder, LockDiff, diff_target, read_lock_if_exists};
use asp_store::{GcOutcome, SnapshotStore, collect_garbage};
use std::collections::BTreeMap;
use tracing::info;

use crate::install::resolve_targets;
use crate::{OpsContext, OpsError};

/// Compare a fresh resolution of `target` against the existing lock.
///
/// The fresh resolution ignores the lock's pins on purpose: `diff` answers
/// "what would change if I reinstalled unlocked".
///
/// # Errors
///
/// Resolution errors; [`OpsError::UnknownTarget`] for unknown targets. A
/// missing lock diffs against empty (everything shows as added).
pub fn diff(ctx: &OpsContext, target: &str) -> Result<LockDiff, OpsError> {
    let resolved = resolve_targets(ctx, Some(target))?;
    let entry = &resolved[target];

    let mut builder = LockBuilder::new(&ctx.registry_url());
    // Integrities are irrelevant to a key diff; dev sentinels stand in so
    // the store is never touched.
    let placeholder = BTreeMap::new();
    builder.add_target(target, &entry.compose, &entry.closure, &placeholder);
    let fresh = builder.finish();

    let old = read_lock_if_exists(&ctx.project_lock_path())?
        .unwrap_or_else(|| asp_core::LockFile::empty(&ctx.registry_url()));
    Ok(diff_target(&old, &fresh, target))
}

/// Sweep the store against every live lock (project plus global).
///
/// # Errors
///
/// Lock read and store enumeration errors.
pub fn gc(ctx: &OpsContext, dry_run: bool) -> Result<GcOutcome, OpsError> {
    let mut locks = Vec::new();
    if let Some(lock) = read_lock_if_exists(&ctx.project_lock_path())? {
        locks.push(lock);
    }
    if let Some(lock) = read_lock_if_exists(&ctx.home.global_lock_path())? {
        locks.push(lock);
    }

    let store = SnapshotStore::open(&ctx.home)?;
    let outcome = collect_garbage(&store, &locks, dry_run)?;
    info!(
        deleted = outcome.snapshots_deleted,
        bytes = outcome.bytes_freed,
        dry_run,
        "gc complete"
    );
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
