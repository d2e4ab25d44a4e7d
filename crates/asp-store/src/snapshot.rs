// SPDX-License-Identifier: MIT OR Apache-2.0
//! Snapshot creation and lookup.
//!
//! A snapshot is the content of `spaces/<id>` at a pinned commit, extracted
//! into `store/spaces/<digest>/`. The digest is a SHA-256 over the sorted
//! file listing (`path \0 mode \0 content \0` per file), so equal content
//! always lands at the same directory and creation is idempotent.

use asp_core::{CommitSha, Integrity, SpaceId};
use asp_registry::{GitRegistry, TreeEntry, TreeEntryKind};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::home::AspHome;
use crate::StoreError;

/// Snapshot store rooted at an [`AspHome`].
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    home: AspHome,
}

impl SnapshotStore {
    /// Open the store under `home`, creating the layout if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the layout cannot be created.
    pub fn open(home: &AspHome) -> Result<Self, StoreError> {
        home.ensure_layout()?;
        Ok(Self { home: home.clone() })
    }

    /// The home this store lives under.
    #[must_use]
    pub fn home(&self) -> &AspHome {
        &self.home
    }

    /// Directory a snapshot with `integrity` occupies (whether or not it
    /// exists yet).
    #[must_use]
    pub fn snapshot_path(&self, integrity: &Integrity) -> PathBuf {
        self.home.store_spaces().join(integrity.hex())
    }

    /// Whether a snapshot with `integrity` exists.
    #[must_use]
    pub fn has(&self, integrity: &Integrity) -> bool {
        !integrity.is_dev() && self.snapshot_path(integrity).is_dir()
    }

    /// Compute the integrity digest of `spaces/<id>` at `commit` without
    /// writing anything.
    ///
    /// # Errors
    ///
    /// Returns registry errors when the space does not exist at the commit.
    /// Dev commits yield the `sha256:dev` sentinel.
    pub fn compute_integrity(
        &self,
        registry: &GitRegistry,
        id: &SpaceId,
        commit: &CommitSha,
    ) -> Result<Integrity, StoreError> {
        if commit.is_dev() {
            return Ok(Integrity::dev());
        }
        let entries = sorted_entries(registry, id, commit)?;
        let mut hasher = Sha256::new();
        for entry in &entries {
            let content = registry.read_blob(
                commit.as_str(),
                &format!("{}/{}", GitRegistry::space_path(id.as_str()), entry.path),
            )?;
            hasher.update(entry.path.as_bytes());
            hasher.update([0]);
            hasher.update(entry.mode.as_bytes());
            hasher.update([0]);
            hasher.update(&content);
            hasher.update([0]);
        }
        Ok(Integrity::from_hex(&format!("{:x}", hasher.finalize())))
    }

    /// Ensure a snapshot exists for `(id, commit)`, returning its integrity.
    ///
    /// Dev commits are never snapshotted; readers use the registry working
    /// copy directly. Creation stages under `temp/` and renames into place;
    /// when a concurrent caller wins the rename race the staged copy is
    /// discarded and the existing snapshot is authoritative.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on filesystem failures and registry errors
    /// when the space cannot be read at the commit. Partial stages are
    /// removed on any error.
    pub fn ensure_snapshot(
        &self,
        registry: &GitRegistry,
        id: &SpaceId,
        commit: &CommitSha,
    ) -> Result<Integrity, StoreError> {
        if commit.is_dev() {
            return Ok(Integrity::dev());
        }

        let integrity = self.compute_integrity(registry, id, commit)?;
        let dest = self.snapshot_path(&integrity);
        if dest.is_dir() {
            debug!(%integrity, "snapshot already present");
            return Ok(integrity);
        }

        let temp_root = self.home.temp();
        std::fs::create_dir_all(&temp_root).map_err(|e| StoreError::io(&temp_root, e))?;
        let stage = tempfile::Builder::new()
            .prefix("snapshot-")
            .tempdir_in(&temp_root)
            .map_err(|e| StoreError::io(&temp_root, e))?;

        let entries = sorted_entries(registry, id, commit)?;
        for entry in &entries {
            let blob = registry.read_blob(
                commit.as_str(),
                &format!("{}/{}", GitRegistry::space_path(id.as_str()), entry.path),
            )?;
            let target = stage.path().join(&entry.path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
            match entry.kind {
                TreeEntryKind::Symlink => {
                    let link_target = String::from_utf8_lossy(&blob).to_string();
                    #[cfg(unix)]
                    std::os::unix::fs::symlink(&link_target, &target)
                        .map_err(|e| StoreError::io(&target, e))?;
                    #[cfg(not(unix))]
                    std::fs::write(&target, &blob).map_err(|e| StoreError::io(&target, e))?;
                }
                TreeEntryKind::Blob | TreeEntryKind::Tree => {
                    std::fs::write(&target, &blob).map_err(|e| StoreError::io(&target, e))?;
                    #[cfg(unix)]
                    if entry.is_executable() {
                        use std::os::unix::fs::PermissionsExt;
                        std::fs::set_permissions(
                            &target,
                            std::fs::Permissions::from_mode(0o755),
                        )
                        .map_err(|e| StoreError::io(&target, e))?;
                    }
                }
            }
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let staged = stage.keep();
        match std::fs::rename(&staged, &dest) {
            Ok(()) => {
                info!(%integrity, space = %id, %commit, "snapshot created");
                Ok(integrity)
            }
            Err(_) if dest.is_dir() => {
                // Lost the race; the existing snapshot is authoritative.
                let _ = std::fs::remove_dir_all(&staged);
                Ok(integrity)
            }
            Err(e) => {
                let _ = std::fs::remove_dir_all(&staged);
                Err(StoreError::io(&dest, e))
            }
        }
    }

    /// Verify that the integrity a lock pins still matches the registry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IntegrityMismatch`] when they differ.
    pub fn verify_integrity(
        &self,
        registry: &GitRegistry,
        id: &SpaceId,
        commit: &CommitSha,
        expected: &Integrity,
    ) -> Result<(), StoreError> {
        let computed = self.compute_integrity(registry, id, commit)?;
        if computed != *expected {
            return Err(StoreError::IntegrityMismatch {
                key: format!("{id}@{}", asp_core::short_commit(commit.as_str())),
                expected: expected.to_string(),
                computed: computed.to_string(),
            });
        }
        Ok(())
    }
}

/// Tracked files of the space at the commit, sorted by path.
fn sorted_entries(
    registry: &GitRegistry,
    id: &SpaceId,
    commit: &CommitSha,
) -> Result<Vec<TreeEntry>, StoreError> {
    let mut entries: Vec<TreeEntry> = registry
        .list_tree(commit.as_str(), &GitRegistry::space_path(id.as_str()))?
        .into_iter()
        .filter(|e| e.kind != TreeEntryKind::Tree)
        .collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
