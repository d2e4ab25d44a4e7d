// SPDX-License-Identifier: MIT OR Apache-2.0
//! Claude-family artifact layout.
//!
//! One artifact per space: a Claude Code plugin directory with
//! `.claude-plugin/plugin.json`, the component directories that exist in the
//! snapshot, the instructions file, translated hooks, and the canonical
//! permissions document carried along for composition.

use asp_core::{ArtifactRecord, Warning};
use asp_manifest::HooksConfig;
use serde_json::json;
use std::path::Path;
use tracing::debug;

use crate::hooks::translate_hooks_to_claude;
use crate::{
    CLAUDE_COMPONENT_DIRS, MaterializeError, MaterializeInput, MaterializeOptions, collect_files,
    prepare_out_dir, transfer_tree,
};

/// Materialize a Claude Code plugin artifact.
pub(crate) fn materialize(
    input: &MaterializeInput<'_>,
    out_dir: &Path,
    opts: &MaterializeOptions,
) -> Result<ArtifactRecord, MaterializeError> {
    prepare_out_dir(out_dir, opts)?;
    let mut warnings = Vec::new();

    write_plugin_json(input, out_dir)?;

    for component in CLAUDE_COMPONENT_DIRS {
        let src = input.snapshot_path.join(component);
        if src.is_dir() {
            transfer_tree(&src, &out_dir.join(component), opts)?;
        }
    }

    // Instructions precedence: AGENT.md wins over CLAUDE.md; both land as
    // CLAUDE.md in the artifact.
    for candidate in ["AGENT.md", "CLAUDE.md"] {
        let src = input.snapshot_path.join(candidate);
        if src.is_file() {
            asp_store::link_or_copy(&src, &out_dir.join("CLAUDE.md"))?;
            break;
        }
    }

    translate_hooks(input, out_dir, &mut warnings)?;

    let permissions_src = input.snapshot_path.join("permissions.toml");
    if permissions_src.is_file() {
        asp_store::link_or_copy(&permissions_src, &out_dir.join("permissions.toml"))?;
    }

    debug!(space = input.space_id, out = %out_dir.display(), "claude artifact ready");
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

fn write_plugin_json(
    input: &MaterializeInput<'_>,
    out_dir: &Path,
) -> Result<(), MaterializeError> {
    let mut plugin = json!({ "name": input.manifest.plugin_name() });
    if let Some(version) = input.manifest.plugin_version() {
        plugin["version"] = json!(version);
    }
    if let Some(description) = &input.manifest.description {
        plugin["description"] = json!(description);
    }
    if let Some(author) = input.manifest.plugin.as_ref().and_then(|p| p.author.as_ref()) {
        let mut record = json!({ "name": author.name });
        if let Some(email) = &author.email {
            record["email"] = json!(email);
        }
        if let Some(url) = &author.url {
            record["url"] = json!(url);
        }
        plugin["author"] = record;
    }

    asp_store::write_json_pretty(
        &out_dir.join(".claude-plugin").join("plugin.json"),
        &plugin,
        false,
    )?;
    Ok(())
}

/// Translate `hooks/hooks.toml` into `hooks/hooks.json` and repair script
/// permissions. A pre-existing `hooks.json` (with no `hooks.toml`) is left
/// as the space authored it.
fn translate_hooks(
    input: &MaterializeInput<'_>,
    out_dir: &Path,
    warnings: &mut Vec<Warning>,
) -> Result<(), MaterializeError> {
    let hooks_dir = out_dir.join("hooks");
    let hooks_toml = hooks_dir.join("hooks.toml");
    if !hooks_toml.is_file() {
        return Ok(());
    }

    let config = match HooksConfig::load(&hooks_toml) {
        Ok(config) => config,
        Err(e) => {
            warnings.push(Warning::error(
                "W204",
                format!("space '{}' has an invalid hooks.toml: {e}", input.space_id),
                &[input.space_id],
            ));
            return Ok(());
        }
    };

    for def in &config.hooks {
        let script = hooks_dir.join(&def.script);
        if !script.is_file() {
            warnings.push(Warning::error(
                "W204",
                format!(
                    "space '{}' hook '{}' references missing script '{}'",
                    input.space_id,
                    def.event,
                    def.script
                ),
                &[input.space_id],
            ));
            continue;
        }
        ensure_executable(&script)?;
    }

    let translated = translate_hooks_to_claude(&config);
    if !translated.is_empty() {
        asp_store::write_json_pretty(&hooks_dir.join("hooks.json"), &translated, false)?;
    }
    Ok(())
}

/// Ensure owner/group/other execute bits on a hook script.
fn ensure_executable(script: &Path) -> Result<(), MaterializeError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let meta = std::fs::metadata(script).map_err(|e| asp_store::StoreError::Io {
            path: script.display().to_string(),
            source: e,
        })?;
        let mut perms = meta.permissions();
        if perms.mode() & 0o111 != 0o111 {
            perms.set_mode(perms.mode() | 0o111);
            std::fs::set_permissions(script, perms).map_err(|e| asp_store::StoreError::Io {
                path: script.display().to_string(),
                source: e,
            })?;
        }
    }
    #[cfg(not(unix))]
    let _ = script;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
