// SPDX-License-Identifier: MIT OR Apache-2.0
//! Claude-family composition.
//!
//! Plugins are copied into `plugins/<NNN>-<spaceId>/` with the zero-padded
//! load-order index so alphabetic sorting reproduces load order. MCP servers
//! union with later-wins; `settings.json` composes manifest settings with
//! translated permissions and is always written so Claude is always invoked
//! with `--settings`.

use asp_core::{ComposedTargetBundle, Warning};
use asp_manifest::PermissionsConfig;
use asp_materialize::to_claude_settings_permissions;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{ComposeError, ComposeInput, ComposeOutcome, concat_dedup};

pub(crate) fn compose(
    input: &ComposeInput<'_>,
    out_dir: &Path,
) -> Result<ComposeOutcome, ComposeError> {
    let mut warnings = Vec::new();
    let mut plugin_dirs = Vec::new();

    let plugins_root = out_dir.join("plugins");
    for (index, artifact) in input.artifacts.iter().enumerate() {
        let dir = plugins_root.join(format!("{index:03}-{}", artifact.space_id));
        asp_store::link_or_copy_tree(&artifact.artifact_path, &dir)?;
        plugin_dirs.push(dir);
    }

    let mcp_config_path = compose_mcp(input, out_dir, &mut warnings)?;
    let settings_path = compose_settings(input, out_dir)?;

    Ok(ComposeOutcome {
        bundle: ComposedTargetBundle {
            harness: input.harness,
            target_name: input.target_name.to_owned(),
            root_dir: out_dir.to_path_buf(),
            plugin_dirs,
            mcp_config_path,
            settings_path: Some(settings_path),
            pi: None,
            pi_sdk: None,
            codex: None,
        },
        warnings,
    })
}

/// Union `mcpServers` maps in load order; later spaces win name collisions.
#[must_use = "collision warnings are recorded in the warnings list"]
pub(crate) fn collect_mcp_servers(
    input: &ComposeInput<'_>,
    warnings: &mut Vec<Warning>,
) -> Result<BTreeMap<String, Value>, ComposeError> {
    let mut servers: BTreeMap<String, Value> = BTreeMap::new();
    let mut provider: BTreeMap<String, String> = BTreeMap::new();

    for artifact in input.artifacts {
        let mcp_path = artifact.artifact_path.join("mcp").join("mcp.json");
        if !mcp_path.is_file() {
            continue;
        }
        let text = std::fs::read_to_string(&mcp_path).map_err(|e| {
            asp_store::StoreError::Io {
                path: mcp_path.display().to_string(),
                source: e,
            }
        })?;
        let doc: Value =
            serde_json::from_str(&text).map_err(|e| ComposeError::InvalidMcp {
                space: artifact.space_id.clone(),
                reason: e.to_string(),
            })?;
        let Some(declared) = doc.get("mcpServers").and_then(Value::as_object) else {
            continue;
        };

        for (name, config) in declared {
            if let Some(earlier) = provider.get(name) {
                warnings.push(Warning::warning(
                    "W207",
                    format!(
                        "mcp server '{name}' from '{earlier}' overridden by '{}'",
                        artifact.space_id
                    ),
                    &[earlier, &artifact.space_id],
                ));
            }
            provider.insert(name.clone(), artifact.space_id.clone());
            servers.insert(name.clone(), config.clone());
        }
    }
    Ok(servers)
}

/// Write the unioned `mcp.json`; the file is only emitted when at least one
/// server is declared.
pub(crate) fn compose_mcp(
    input: &ComposeInput<'_>,
    out_dir: &Path,
    warnings: &mut Vec<Warning>,
) -> Result<Option<std::path::PathBuf>, ComposeError> {
    let servers = collect_mcp_servers(input, warnings)?;
    if servers.is_empty() {
        return Ok(None);
    }
    let path = out_dir.join("mcp.json");
    asp_store::write_json_pretty(&path, &json!({ "mcpServers": servers }), false)?;
    Ok(Some(path))
}

/// Compose `settings.json` from manifest settings and translated
/// permissions, in load order.
fn compose_settings(
    input: &ComposeInput<'_>,
    out_dir: &Path,
) -> Result<std::path::PathBuf, ComposeError> {
    let mut allow_lists: Vec<Vec<String>> = Vec::new();
    let mut deny_lists: Vec<Vec<String>> = Vec::new();
    let mut env: BTreeMap<String, String> = BTreeMap::new();
    let mut model: Option<String> = None;

    for contribution in input.settings {
        if let Some(settings) = &contribution.settings {
            if let Some(perms) = &settings.permissions {
                allow_lists.push(perms.allow.clone());
                deny_lists.push(perms.deny.clone());
            }
            for (key, value) in &settings.env {
                env.insert(key.clone(), value.clone());
            }
            if let Some(m) = &settings.model
                && !m.is_empty()
            {
                model = Some(m.clone());
            }
        }

        let artifact = input
            .artifacts
            .iter()
            .find(|a| a.space_id == contribution.space_id);
        if let Some(artifact) = artifact {
            let perm_path = artifact.artifact_path.join("permissions.toml");
            if perm_path.is_file() {
                let config = PermissionsConfig::load(&perm_path)?;
                let (allow, deny) = to_claude_settings_permissions(&config);
                allow_lists.push(allow);
                deny_lists.push(deny);
            }
        }
    }

    let mut settings = Map::new();
    settings.insert(
        "permissions".into(),
        json!({
            "allow": concat_dedup(allow_lists),
            "deny": concat_dedup(deny_lists),
        }),
    );
    if !env.is_empty() {
        settings.insert("env".into(), json!(env));
    }
    if let Some(model) = model {
        settings.insert("model".into(), json!(model));
    }

    let path = out_dir.join("settings.json");
    asp_store::write_json_pretty(&path, &Value::Object(settings), false)?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use asp_core::{ArtifactRecord, HarnessId, SpaceKey};
    use asp_manifest::{SettingsSection, SpacePermissions};
    use crate::SettingsInput;

    fn artifact(dir: &Path, space_id: &str, build: impl FnOnce(&Path)) -> ArtifactRecord {
        let path = dir.join(format!("artifact-{space_id}"));
        std::fs::create_dir_all(&path).unwrap();
        build(&path);
        ArtifactRecord {
            space_key: SpaceKey::parse(&format!("{space_id}@abcdefabcdef")).unwrap(),
            space_id: space_id.into(),
            artifact_path: path,
            plugin_name: space_id.into(),
            plugin_version: None,
            files: vec![],
            warnings: vec![],
        }
    }

    fn compose_fixture(
        artifacts: &[ArtifactRecord],
        settings: &[SettingsInput],
    ) -> (tempfile::TempDir, ComposeOutcome) {
        let out = tempfile::tempdir().unwrap();
        let input = ComposeInput {
            harness: HarnessId::Claude,
            target_name: "dev",
            artifacts,
            settings,
            yolo: false,
        };
        let outcome = crate::compose_target(&input, &out.path().join("bundle")).unwrap();
        (out, outcome)
    }

    fn settings_for(space_id: &str, allow: &[&str], model: Option<&str>) -> SettingsInput {
        SettingsInput {
            space_id: space_id.into(),
            settings: Some(SettingsSection {
                permissions: Some(SpacePermissions {
                    allow: allow.iter().map(|s| (*s).to_owned()).collect(),
                    deny: vec![],
                }),
                env: std::collections::BTreeMap::new(),
                model: model.map(str::to_owned),
            }),
        }
    }

    // -- 1. Plugin dirs reproduce load order alphabetically -------------------------

    #[test]
    fn plugin_dirs_reproduce_load_order() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![
            artifact(dir.path(), "base", |p| {
                std::fs::write(p.join("CLAUDE.md"), "base").unwrap();
            }),
            artifact(dir.path(), "frontend", |_| {}),
        ];
        let (_out, outcome) = compose_fixture(&artifacts, &[]);

        let names: Vec<String> = outcome
            .bundle
            .plugin_dirs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["000-base", "001-frontend"]);
        assert!(outcome.bundle.plugin_dirs[0].join("CLAUDE.md").is_file());

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, names, "alphabetic order must equal load order");
    }

    // -- 2. MCP later-wins with collision warning --------------------------------------

    #[test]
    fn mcp_later_wins_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![
            artifact(dir.path(), "mcp-collision-a", |p| {
                std::fs::create_dir_all(p.join("mcp")).unwrap();
                std::fs::write(
                    p.join("mcp/mcp.json"),
                    serde_json::json!({"mcpServers": {"shared-server": {
                        "command": "npx",
                        "args": ["-y", "@example/shared-server-v1"],
                    }}})
                    .to_string(),
                )
                .unwrap();
            }),
            artifact(dir.path(), "mcp-collision-b", |p| {
                std::fs::create_dir_all(p.join("mcp")).unwrap();
                std::fs::write(
                    p.join("mcp/mcp.json"),
                    serde_json::json!({"mcpServers": {"shared-server": {
                        "command": "npx",
                        "args": ["-y", "@example/shared-server-v2"],
                    }}})
                    .to_string(),
                )
                .unwrap();
            }),
        ];
        let (_out, outcome) = compose_fixture(&artifacts, &[]);

        let mcp_path = outcome.bundle.mcp_config_path.as_ref().unwrap();
        let mcp: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(mcp_path).unwrap()).unwrap();
        let args = mcp["mcpServers"]["shared-server"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "@example/shared-server-v2"));
        assert!(outcome.warnings.iter().any(|w| w.code == "W207"));
    }

    // -- 3. No MCP declarations, no mcp.json ---------------------------------------------

    #[test]
    fn no_mcp_means_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![artifact(dir.path(), "base", |_| {})];
        let (_out, outcome) = compose_fixture(&artifacts, &[]);
        assert!(outcome.bundle.mcp_config_path.is_none());
        assert!(!outcome.bundle.root_dir.join("mcp.json").exists());
    }

    // -- 4. settings.json always written, allow concat-deduped ------------------------------

    #[test]
    fn settings_always_written_and_deduped() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![
            artifact(dir.path(), "base", |p| {
                std::fs::write(p.join("permissions.toml"), "[exec]\ncommands = [\"npm\"]\n")
                    .unwrap();
            }),
            artifact(dir.path(), "frontend", |_| {}),
        ];
        let settings = vec![
            settings_for("base", &["Bash(git *)"], Some("haiku")),
            settings_for("frontend", &["Bash(git *)", "WebSearch"], Some("sonnet")),
        ];
        let (_out, outcome) = compose_fixture(&artifacts, &settings);

        let text =
            std::fs::read_to_string(outcome.bundle.settings_path.as_ref().unwrap()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        let allow: Vec<&str> = doc["permissions"]["allow"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(allow, vec!["Bash(git *)", "Bash(npm *)", "WebSearch"]);
        // model: last non-empty wins.
        assert_eq!(doc["model"], "sonnet");
    }

    // -- 5. Empty target still writes settings.json -----------------------------------------

    #[test]
    fn empty_target_still_writes_settings() {
        let (_out, outcome) = compose_fixture(&[], &[]);
        let path = outcome.bundle.settings_path.as_ref().unwrap();
        assert!(path.is_file());
        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert!(doc["permissions"]["allow"].as_array().unwrap().is_empty());
    }

    // -- 6. env later-wins ---------------------------------------------------------------------

    #[test]
    fn env_later_wins() {
        let mut base_env = std::collections::BTreeMap::new();
        base_env.insert("NODE_ENV".to_owned(), "production".to_owned());
        let mut front_env = std::collections::BTreeMap::new();
        front_env.insert("NODE_ENV".to_owned(), "development".to_owned());
        front_env.insert("EXTRA".to_owned(), "1".to_owned());

        let settings = vec![
            SettingsInput {
                space_id: "base".into(),
                settings: Some(SettingsSection {
                    permissions: None,
                    env: base_env,
                    model: None,
                }),
            },
            SettingsInput {
                space_id: "frontend".into(),
                settings: Some(SettingsSection {
                    permissions: None,
                    env: front_env,
                    model: None,
                }),
            },
        ];
        let (_out, outcome) = compose_fixture(&[], &settings);
        let doc: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(outcome.bundle.settings_path.as_ref().unwrap()).unwrap(),
        )
        .unwrap();
        assert_eq!(doc["env"]["NODE_ENV"], "development");
        assert_eq!(doc["env"]["EXTRA"], "1");
    }

    // -- 7. Bundle reload round-trip ------------------------------------------------------------

    #[test]
    fn bundle_reloads_from_meta() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![artifact(dir.path(), "base", |_| {})];
        let (_out, outcome) = compose_fixture(&artifacts, &[]);
        let reloaded = crate::load_bundle(&outcome.bundle.root_dir).unwrap();
        assert_eq!(reloaded, outcome.bundle);

        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(
            crate::load_bundle(empty.path()),
            Err(ComposeError::NotComposed { .. })
        ));
    }
}
