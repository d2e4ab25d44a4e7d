// SPDX-License-Identifier: MIT OR Apache-2.0
//! Garbage collection over live lock integrities.
//!
//! The store is append-only; only the GC deletes, and only snapshots that no
//! lock it was handed still references. A single GC call assumes no
//! concurrent writers within the same `ASP_HOME`.

use asp_core::LockFile;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::snapshot::SnapshotStore;
use crate::StoreError;

/// Result of a GC sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GcOutcome {
    /// Snapshots removed (or that would be removed under `dry_run`).
    pub snapshots_deleted: u64,
    /// Bytes those snapshots occupied on disk.
    pub bytes_freed: u64,
}

/// Sweep `store/spaces/` for snapshots not referenced by any of `locks`.
///
/// With `dry_run` the outcome is reported but nothing is removed.
///
/// # Errors
///
/// Returns [`StoreError::Io`] when the store cannot be enumerated or an
/// orphan cannot be removed.
pub fn collect_garbage(
    store: &SnapshotStore,
    locks: &[LockFile],
    dry_run: bool,
) -> Result<GcOutcome, StoreError> {
    let live: BTreeSet<String> = locks
        .iter()
        .flat_map(LockFile::live_integrities)
        .map(|i| i.hex().to_owned())
        .collect();

    let spaces_dir = store.home().store_spaces();
    if !spaces_dir.is_dir() {
        return Ok(GcOutcome::default());
    }

    let mut outcome = GcOutcome::default();
    let entries =
        std::fs::read_dir(&spaces_dir).map_err(|e| StoreError::io(&spaces_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(&spaces_dir, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if live.contains(&name) {
            debug!(snapshot = %name, "live, keeping");
            continue;
        }

        let size = dir_size(&entry.path());
        outcome.snapshots_deleted += 1;
        outcome.bytes_freed += size;
        if dry_run {
            info!(snapshot = %name, size, "orphan (dry run)");
        } else {
            std::fs::remove_dir_all(entry.path())
                .map_err(|e| StoreError::io(&entry.path(), e))?;
            info!(snapshot = %name, size, "orphan removed");
        }
    }
    Ok(outcome)
}

/// Recursive on-disk size of a directory, in bytes.
fn dir_size(path: &std::path::Path) -> u64 {
    walkdir::WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
