// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pi-family artifact layout.
//!
//! Pi loads extensions rather than plugins, so the artifact shape differs
//! from Claude's in three ways: extension sources are emitted as one
//! namespaced JS file per input (`<spaceId>__<stem>.js`) to avoid
//! cross-space collisions, the instructions file stays `AGENT.md`, and hook
//! scripts live in `hooks-scripts/` because Pi reserves `hooks/` for its own
//! namespace.

use asp_core::{ArtifactRecord, Warning};
use asp_manifest::HooksConfig;
use std::path::Path;
use tracing::debug;

use crate::{
    MaterializeError, MaterializeInput, MaterializeOptions, collect_files, prepare_out_dir,
    transfer_tree,
};

/// Directory holding bridged hook scripts in Pi artifacts.
pub const PI_HOOKS_DIR: &str = "hooks-scripts";

/// Materialize a Pi extension artifact.
pub(crate) fn materialize(
    input: &MaterializeInput<'_>,
    out_dir: &Path,
    opts: &MaterializeOptions,
) -> Result<ArtifactRecord, MaterializeError> {
    prepare_out_dir(out_dir, opts)?;
    let mut warnings = Vec::new();

    bundle_extensions(input, out_dir)?;

    let agent_md = input.snapshot_path.join("AGENT.md");
    if agent_md.is_file() {
        asp_store::link_or_copy(&agent_md, &out_dir.join("AGENT.md"))?;
    }

    for component in ["skills", "scripts"] {
        let src = input.snapshot_path.join(component);
        if src.is_dir() {
            transfer_tree(&src, &out_dir.join(component), opts)?;
        }
    }

    let permissions_src = input.snapshot_path.join("permissions.toml");
    if permissions_src.is_file() {
        asp_store::link_or_copy(&permissions_src, &out_dir.join("permissions.toml"))?;
    }

    stage_hook_scripts(input, out_dir, opts, &mut warnings)?;

    debug!(space = input.space_id, out = %out_dir.display(), "pi artifact ready");
    Ok(ArtifactRecord {
        space_key: input.space_key.clone(),
        space_id: input.space_id.to_owned(),
        artifact_path: out_dir.to_path_buf(),
        plugin_name: input.manifest.plugin_name().to_owned(),
        plugin_version: input.manifest.plugin_version().map(str::to_owned),
        files: collect_files(out_dir),
        warnings,
    })
}

/// Emit every `extensions/*.{ts,js}` source as a namespaced single-file JS
/// module: `<spaceId>__<stem>.js`.
fn bundle_extensions(
    input: &MaterializeInput<'_>,
    out_dir: &Path,
) -> Result<(), MaterializeError> {
    let src_dir = input.snapshot_path.join("extensions");
    if !src_dir.is_dir() {
        return Ok(());
    }
    let dst_dir = out_dir.join("extensions");

    let mut sources: Vec<std::path::PathBuf> = std::fs::read_dir(&src_dir)
        .map_err(|e| asp_store::StoreError::Io {
            path: src_dir.display().to_string(),
            source: e,
        })?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| matches!(e, "ts" | "js" | "mjs" | "cjs"))
        })
        .collect();
    sources.sort();

    for source in sources {
        let Some(stem) = source.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let namespaced = format!("{}__{stem}.js", input.space_id);
        let content =
            std::fs::read(&source).map_err(|e| asp_store::StoreError::Io {
                path: source.display().to_string(),
                source: e,
            })?;
        asp_store::write_atomic(&dst_dir.join(namespaced), &content, false)?;
    }
    Ok(())
}

/// Stage hook scripts into `hooks-scripts/` along with the canonical
/// `hooks.toml` the bridge generator reads at compose time.
fn stage_hook_scripts(
    input: &MaterializeInput<'_>,
    out_dir: &Path,
    opts: &MaterializeOptions,
    warnings: &mut Vec<Warning>,
) -> Result<(), MaterializeError> {
    let src = input.snapshot_path.join("hooks");
    if !src.is_dir() {
        return Ok(());
    }
    let dst = out_dir.join(PI_HOOKS_DIR);
    transfer_tree(&src, &dst, opts)?;

    let hooks_toml = dst.join("hooks.toml");
    if hooks_toml.is_file()
        && let Err(e) = HooksConfig::load(&hooks_toml)
    {
        warnings.push(Warning::error(
            "W204",
            format!("space '{}' has an invalid hooks.toml: {e}", input.space_id),
            &[input.space_id],
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
