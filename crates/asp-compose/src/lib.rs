// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-compose
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Ordered artifact merging into composed target bundles.

use asp_core::{ArtifactRecord, ComposedTargetBundle, HarnessId, Warning};
use asp_manifest::SettingsSection;
use std::path::Path;
use tracing::info;

/// The Pi hook bridge generator.
pub mod bridge;
/// Claude-family composition.
pub mod claude;
/// Codex home-template assembly.
pub mod codex;
/// Pi-family composition.
pub mod pi;

pub use bridge::generate_bridge_source;

/// File recording the composed bundle's metadata inside its directory,
/// enabling the reload path without recomposing.
pub const BUNDLE_META_NAME: &str = "bundle.meta.json";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while composing a bundle.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// A filesystem operation failed.
    #[error(transparent)]
    Store(#[from] asp_store::StoreError),

    /// An artifact's embedded config failed to parse.
    #[error(transparent)]
    Manifest(#[from] asp_manifest::ManifestError),

    /// An artifact's `mcp/mcp.json` is not valid JSON.
    #[error("invalid mcp.json in space '{space}': {reason}")]
    InvalidMcp {
        /// The offending space id.
        space: String,
        /// Underlying JSON error.
        reason: String,
    },

    /// The bundle directory has no metadata to reload from.
    #[error("no composed bundle at '{path}' (run install first)")]
    NotComposed {
        /// The directory that was probed.
        path: String,
    },
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Per-space settings contribution, in load order.
#[derive(Debug, Clone, Default)]
pub struct SettingsInput {
    /// The contributing space id.
    pub space_id: String,
    /// The space's manifest `[settings]` block, when present.
    pub settings: Option<SettingsSection>,
}

/// Everything the composer needs for one target.
#[derive(Debug, Clone)]
pub struct ComposeInput<'a> {
    /// The harness being composed for.
    pub harness: HarnessId,
    /// The target name.
    pub target_name: &'a str,
    /// Per-space artifacts, in load order.
    pub artifacts: &'a [ArtifactRecord],
    /// Per-space settings contributions, in load order.
    pub settings: &'a [SettingsInput],
    /// Whether the target runs with permission prompts skipped.
    pub yolo: bool,
}

/// A composed bundle plus the warnings its merges produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOutcome {
    /// The bundle the invoker consumes.
    pub bundle: ComposedTargetBundle,
    /// Lossy-merge and bridge warnings, in emission order.
    pub warnings: Vec<Warning>,
}

/// Compose `input` into `out_dir`.
///
/// The output directory is replaced wholesale; partial state is never
/// observable because all files are written through atomic primitives and
/// the bundle metadata is written last.
///
/// # Errors
///
/// Returns [`ComposeError`] on filesystem failures or malformed artifact
/// content.
pub fn compose_target(
    input: &ComposeInput<'_>,
    out_dir: &Path,
) -> Result<ComposeOutcome, ComposeError> {
    if out_dir.exists() {
        std::fs::remove_dir_all(out_dir).map_err(|e| asp_store::StoreError::Io {
            path: out_dir.display().to_string(),
            source: e,
        })?;
    }
    std::fs::create_dir_all(out_dir).map_err(|e| asp_store::StoreError::Io {
        path: out_dir.display().to_string(),
        source: e,
    })?;

    let mut outcome = match asp_harness::artifact_family(input.harness) {
        HarnessId::Pi => pi::compose(input, out_dir)?,
        HarnessId::Codex => codex::compose(input, out_dir)?,
        _ => claude::compose(input, out_dir)?,
    };

    // Artifact-level findings ride along so `explain` sees one list.
    for artifact in input.artifacts {
        outcome.warnings.extend(artifact.warnings.iter().cloned());
    }

    asp_store::write_json_pretty(&out_dir.join(BUNDLE_META_NAME), &outcome.bundle, false)?;
    info!(
        harness = %input.harness,
        target = input.target_name,
        spaces = input.artifacts.len(),
        "composed bundle"
    );
    Ok(outcome)
}

/// Reload a previously composed bundle from disk without recomposing.
///
/// # Errors
///
/// Returns [`ComposeError::NotComposed`] when `out_dir` holds no bundle
/// metadata.
pub fn load_bundle(out_dir: &Path) -> Result<ComposedTargetBundle, ComposeError> {
    let meta = out_dir.join(BUNDLE_META_NAME);
    let text = std::fs::read_to_string(&meta).map_err(|_| ComposeError::NotComposed {
        path: out_dir.display().to_string(),
    })?;
    serde_json::from_str(&text).map_err(|_| ComposeError::NotComposed {
        path: out_dir.display().to_string(),
    })
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Concatenate in order, keeping the first occurrence of each value.
#[must_use]
pub(crate) fn concat_dedup(lists: impl IntoIterator<Item = Vec<String>>) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut out = Vec::new();
    for list in lists {
        for value in list {
            if seen.insert(value.clone()) {
                out.push(value);
            }
        }
    }
    out
}
