// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-materialize
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Snapshot → per-harness artifact translation.

use asp_core::{ArtifactRecord, HarnessId, Integrity, SpaceKey};
use asp_manifest::SpaceManifest;
use std::path::Path;

/// Claude-family artifact layout.
pub mod claude;
/// Canonical hook translation.
pub mod hooks;
/// Canonical permission translation.
pub mod permissions;
/// Pi-family artifact layout.
pub mod pi;

pub use hooks::{ClaudeHookCommand, ClaudeHookMatcher, ClaudeHooksFile, translate_hooks_to_claude};
pub use permissions::{Enforcement, Facet, enforcement, to_claude_settings_permissions};

/// Component directories linked into Claude-family artifacts when present.
pub const CLAUDE_COMPONENT_DIRS: [&str; 6] =
    ["commands", "skills", "agents", "hooks", "scripts", "mcp"];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while materializing an artifact.
#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    /// A filesystem operation failed.
    #[error(transparent)]
    Store(#[from] asp_store::StoreError),

    /// A manifest inside the snapshot failed to parse.
    #[error(transparent)]
    Manifest(#[from] asp_manifest::ManifestError),

    /// The artifact directory exists and `force` was not set.
    #[error("artifact directory '{path}' already exists (pass force to replace)")]
    AlreadyExists {
        /// The occupied output path.
        path: String,
    },
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Everything the materializer needs about one pinned space.
#[derive(Debug, Clone)]
pub struct MaterializeInput<'a> {
    /// The pinned key.
    pub space_key: &'a SpaceKey,
    /// The space id.
    pub space_id: &'a str,
    /// The manifest read at the pinned commit.
    pub manifest: &'a SpaceManifest,
    /// Snapshot directory (or the registry working copy for dev spaces).
    pub snapshot_path: &'a Path,
    /// The snapshot integrity (the `sha256:dev` sentinel for dev spaces).
    pub integrity: &'a Integrity,
}

/// Materialization behavior knobs.
#[derive(Debug, Clone, Copy)]
pub struct MaterializeOptions {
    /// Replace an existing artifact directory.
    pub force: bool,
    /// Hardlink files from the snapshot; `false` copies instead (dev mode,
    /// which protects the working tree from generated content).
    pub use_hardlinks: bool,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            force: true,
            use_hardlinks: true,
        }
    }
}

/// Materialize `input` for `harness` into `out_dir`.
///
/// Dispatches on the harness's artifact family: the Claude Agent SDK
/// produces Claude artifacts, the Pi SDK produces Pi artifacts.
///
/// # Errors
///
/// Returns [`MaterializeError`] on filesystem failures, invalid embedded
/// manifests, or an occupied output directory without `force`.
pub fn materialize_space(
    harness: HarnessId,
    input: &MaterializeInput<'_>,
    out_dir: &Path,
    opts: &MaterializeOptions,
) -> Result<ArtifactRecord, MaterializeError> {
    let mut record = match asp_harness::artifact_family(harness) {
        HarnessId::Pi => pi::materialize(input, out_dir, opts),
        // Codex consumes the generic plugin shape too; the composer reshapes
        // those artifacts into its home template.
        _ => claude::materialize(input, out_dir, opts),
    }?;

    if !input.manifest.supports_harness(harness) {
        record.warnings.push(asp_core::Warning::warning(
            "W210",
            format!(
                "space '{}' does not declare support for harness '{harness}'",
                input.space_id
            ),
            &[input.space_id],
        ));
    }
    Ok(record)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Prepare `out_dir`, honoring `force`.
pub(crate) fn prepare_out_dir(
    out_dir: &Path,
    opts: &MaterializeOptions,
) -> Result<(), MaterializeError> {
    if out_dir.exists() {
        if !opts.force {
            return Err(MaterializeError::AlreadyExists {
                path: out_dir.display().to_string(),
            });
        }
        std::fs::remove_dir_all(out_dir)
            .map_err(|e| asp_store::StoreError::Io {
                path: out_dir.display().to_string(),
                source: e,
            })?;
    }
    std::fs::create_dir_all(out_dir).map_err(|e| asp_store::StoreError::Io {
        path: out_dir.display().to_string(),
        source: e,
    })?;
    Ok(())
}

/// Link or copy a tree per the hardlink option.
pub(crate) fn transfer_tree(
    src: &Path,
    dst: &Path,
    opts: &MaterializeOptions,
) -> Result<(), MaterializeError> {
    if opts.use_hardlinks {
        asp_store::link_or_copy_tree(src, dst)?;
    } else {
        asp_store::copy_tree(src, dst)?;
    }
    Ok(())
}

/// Files under `root`, relative, sorted (for [`ArtifactRecord::files`]).
pub(crate) fn collect_files(root: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<std::path::PathBuf> = walkdir::WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| !e.file_type().is_dir())
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}
