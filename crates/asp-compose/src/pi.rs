// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pi-family composition.
//!
//! Extensions were already namespaced per space at materialize time, so the
//! merge is a flat copy with collision detection (W303). Skills merge by
//! directory name, tolerating duplicates whose content is identical. Hook
//! scripts move under `hooks-scripts/<spaceId>/` and the generated bridge
//! extension dispatches Pi events onto them.

use asp_core::{ComposedTargetBundle, PiBundle, PiSdkBundle, Warning};
use asp_manifest::HooksConfig;
use asp_materialize::hooks::pi_bridge_hooks;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::bridge::{BRIDGE_FILE_NAME, BridgeHook, BridgeSpec, generate_bridge_source};
use crate::{ComposeError, ComposeInput, ComposeOutcome};

pub(crate) fn compose(
    input: &ComposeInput<'_>,
    out_dir: &Path,
) -> Result<ComposeOutcome, ComposeError> {
    let mut warnings = Vec::new();

    let extensions_dir = merge_extensions(input, out_dir, &mut warnings)?;
    let skills_dir = merge_skills(input, out_dir, &mut warnings)?;
    let bridge_path = compose_bridge(input, out_dir, &mut warnings)?;

    let pi = PiBundle {
        extensions_dir: extensions_dir.clone(),
        bridge_path: bridge_path.clone(),
        skills_dir: skills_dir.clone(),
    };

    let pi_sdk = if input.harness == asp_core::HarnessId::PiSdk {
        Some(write_sdk_manifest(
            input,
            out_dir,
            &extensions_dir,
            skills_dir.as_deref(),
            bridge_path.as_deref(),
        )?)
    } else {
        None
    };

    Ok(ComposeOutcome {
        bundle: ComposedTargetBundle {
            harness: input.harness,
            target_name: input.target_name.to_owned(),
            root_dir: out_dir.to_path_buf(),
            plugin_dirs: vec![],
            mcp_config_path: None,
            settings_path: None,
            pi: Some(pi),
            pi_sdk,
            codex: None,
        },
        warnings,
    })
}

/// Flat-merge namespaced extensions; a post-namespace collision is W303.
fn merge_extensions(
    input: &ComposeInput<'_>,
    out_dir: &Path,
    warnings: &mut Vec<Warning>,
) -> Result<PathBuf, ComposeError> {
    let dst = out_dir.join("extensions");
    std::fs::create_dir_all(&dst).map_err(|e| asp_store::StoreError::Io {
        path: dst.display().to_string(),
        source: e,
    })?;

    for artifact in input.artifacts {
        let src = artifact.artifact_path.join("extensions");
        if !src.is_dir() {
            continue;
        }
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&src)
            .map_err(|e| asp_store::StoreError::Io {
                path: src.display().to_string(),
                source: e,
            })?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "js"))
            .collect();
        entries.sort();

        for entry in entries {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let target = dst.join(name);
            if target.exists() {
                warnings.push(Warning::warning(
                    "W303",
                    format!(
                        "extension '{name}' collides after namespacing (space '{}')",
                        artifact.space_id
                    ),
                    &[&artifact.space_id],
                ));
                continue;
            }
            asp_store::link_or_copy(&entry, &target)?;
        }
    }
    Ok(dst)
}

/// Merge skill directories by name; duplicates with differing content warn.
fn merge_skills(
    input: &ComposeInput<'_>,
    out_dir: &Path,
    warnings: &mut Vec<Warning>,
) -> Result<Option<PathBuf>, ComposeError> {
    let dst = out_dir.join("skills");
    let mut any = false;

    for artifact in input.artifacts {
        let src = artifact.artifact_path.join("skills");
        if !src.is_dir() {
            continue;
        }
        let skills = std::fs::read_dir(&src).map_err(|e| asp_store::StoreError::Io {
            path: src.display().to_string(),
            source: e,
        })?;
        for skill in skills.filter_map(Result::ok) {
            if !skill.path().is_dir() {
                continue;
            }
            let name = skill.file_name().to_string_lossy().into_owned();
            let target = dst.join(&name);
            if target.exists() {
                if trees_differ(&skill.path(), &target) {
                    warnings.push(Warning::warning(
                        "W208",
                        format!(
                            "skill '{name}' from space '{}' duplicates an earlier skill with different content",
                            artifact.space_id
                        ),
                        &[&artifact.space_id],
                    ));
                }
                continue;
            }
            asp_store::link_or_copy_tree(&skill.path(), &target)?;
            any = true;
        }
    }
    Ok(any.then_some(dst))
}

/// Stage hook scripts per space and generate the bridge extension.
fn compose_bridge(
    input: &ComposeInput<'_>,
    out_dir: &Path,
    warnings: &mut Vec<Warning>,
) -> Result<Option<PathBuf>, ComposeError> {
    let mut hooks = Vec::new();

    for artifact in input.artifacts {
        let scripts_dir = artifact.artifact_path.join("hooks-scripts");
        if !scripts_dir.is_dir() {
            continue;
        }
        let staged = out_dir.join("hooks-scripts").join(&artifact.space_id);
        asp_store::link_or_copy_tree(&scripts_dir, &staged)?;

        let hooks_toml = scripts_dir.join("hooks.toml");
        if !hooks_toml.is_file() {
            continue;
        }
        let Ok(config) = HooksConfig::load(&hooks_toml) else {
            // Materialization already recorded the W204.
            continue;
        };

        for (pi_event, def) in pi_bridge_hooks(&config) {
            if def.blocking {
                warnings.push(Warning::info(
                    "W301",
                    format!(
                        "blocking hook '{}' in space '{}': Pi cannot deterministically block tool calls",
                        def.script, artifact.space_id
                    ),
                    &[&artifact.space_id],
                ));
            }
            hooks.push(BridgeHook {
                event: pi_event.to_owned(),
                script: resolve_script(&artifact.space_id, &def.script),
                tools: def.tools.clone().unwrap_or_default(),
                blocking: def.blocking,
                space_id: artifact.space_id.clone(),
            });
        }
    }

    if hooks.is_empty() {
        return Ok(None);
    }

    let spec = BridgeSpec {
        target_name: input.target_name.to_owned(),
        harness: input.harness.to_string(),
        space_ids: input.artifacts.iter().map(|a| a.space_id.clone()).collect(),
        hooks,
        yolo: input.yolo,
    };
    let path = out_dir.join("extensions").join(BRIDGE_FILE_NAME);
    asp_store::write_atomic(&path, generate_bridge_source(&spec).as_bytes(), false)?;
    Ok(Some(path))
}

/// Resolve a declared script to the command the bridge runs.
///
/// Absolute paths and commands containing whitespace pass through unchanged;
/// everything else lands under `hooks-scripts/<spaceId>/`, with an optional
/// `scripts/` prefix treated as equivalent to none.
fn resolve_script(space_id: &str, script: &str) -> String {
    if Path::new(script).is_absolute() || script.contains(char::is_whitespace) {
        return script.to_owned();
    }
    let bare = script.strip_prefix("scripts/").unwrap_or(script);
    format!("hooks-scripts/{space_id}/{bare}")
}

/// Whether two directory trees differ in file set or content.
fn trees_differ(a: &Path, b: &Path) -> bool {
    let list = |root: &Path| -> Vec<(PathBuf, Vec<u8>)> {
        let mut files: Vec<(PathBuf, Vec<u8>)> = walkdir::WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = e.path().strip_prefix(root).ok()?.to_path_buf();
                let content = std::fs::read(e.path()).ok()?;
                Some((rel, content))
            })
            .collect();
        files.sort();
        files
    };
    list(a) != list(b)
}

/// Emit the Pi SDK `bundle.json` manifest.
fn write_sdk_manifest(
    input: &ComposeInput<'_>,
    out_dir: &Path,
    extensions_dir: &Path,
    skills_dir: Option<&Path>,
    bridge_path: Option<&Path>,
) -> Result<PiSdkBundle, ComposeError> {
    let mut extensions: Vec<String> = std::fs::read_dir(extensions_dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|e| e == "js"))
                .filter_map(|p| {
                    p.strip_prefix(out_dir)
                        .ok()
                        .map(|r| r.to_string_lossy().into_owned())
                })
                .collect()
        })
        .unwrap_or_default();
    extensions.sort();

    let context_files: Vec<String> = input
        .artifacts
        .iter()
        .filter(|a| a.artifact_path.join("AGENT.md").is_file())
        .map(|a| {
            a.artifact_path
                .join("AGENT.md")
                .to_string_lossy()
                .into_owned()
        })
        .collect();

    let mut manifest = json!({
        "schemaVersion": 1,
        "harnessId": "pi-sdk",
        "targetName": input.target_name,
        "rootDir": out_dir.to_string_lossy(),
        "extensions": extensions,
    });
    if let Some(skills) = skills_dir {
        manifest["skillsDir"] = json!(skills.to_string_lossy());
    }
    if !context_files.is_empty() {
        manifest["contextFiles"] = json!(context_files);
    }
    if let Some(bridge) = bridge_path {
        manifest["hooks"] = json!({
            "bridge": bridge.strip_prefix(out_dir).unwrap_or(bridge).to_string_lossy(),
        });
    }

    let path = out_dir.join("bundle.json");
    asp_store::write_json_pretty(&path, &manifest, false)?;
    Ok(PiSdkBundle {
        bundle_json_path: path,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use asp_core::{ArtifactRecord, HarnessId, SpaceKey};

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

    fn compose_pi(
        harness: HarnessId,
        artifacts: &[ArtifactRecord],
    ) -> (tempfile::TempDir, ComposeOutcome) {
        let out = tempfile::tempdir().unwrap();
        let input = ComposeInput {
            harness,
            target_name: "dev",
            artifacts,
            settings: &[],
            yolo: false,
        };
        let outcome = crate::compose_target(&input, &out.path().join("bundle")).unwrap();
        (out, outcome)
    }

    // -- 1. Namespaced extensions merge flat ----------------------------------------

    #[test]
    fn extensions_merge_flat() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![
            artifact(dir.path(), "base", |p| {
                std::fs::create_dir_all(p.join("extensions")).unwrap();
                std::fs::write(p.join("extensions/base__util.js"), "// a").unwrap();
            }),
            artifact(dir.path(), "frontend", |p| {
                std::fs::create_dir_all(p.join("extensions")).unwrap();
                std::fs::write(p.join("extensions/frontend__ui.js"), "// b").unwrap();
            }),
        ];
        let (_out, outcome) = compose_pi(HarnessId::Pi, &artifacts);
        let ext = outcome.bundle.pi.as_ref().unwrap().extensions_dir.clone();
        assert!(ext.join("base__util.js").is_file());
        assert!(ext.join("frontend__ui.js").is_file());
        assert!(outcome.warnings.iter().all(|w| w.code != "W303"));
    }

    // -- 2. Post-namespace collision is W303 -------------------------------------------

    #[test]
    fn post_namespace_collision_is_w303() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![
            artifact(dir.path(), "dup", |p| {
                std::fs::create_dir_all(p.join("extensions")).unwrap();
                std::fs::write(p.join("extensions/dup__x.js"), "// 1").unwrap();
            }),
            artifact(dir.path(), "dup-two", |p| {
                std::fs::create_dir_all(p.join("extensions")).unwrap();
                // Same emitted file name, different space.
                std::fs::write(p.join("extensions/dup__x.js"), "// 2").unwrap();
            }),
        ];
        let (_out, outcome) = compose_pi(HarnessId::Pi, &artifacts);
        assert!(outcome.warnings.iter().any(|w| w.code == "W303"));
        // First writer wins; the file still exists.
        let ext = outcome.bundle.pi.as_ref().unwrap().extensions_dir.clone();
        assert_eq!(std::fs::read_to_string(ext.join("dup__x.js")).unwrap(), "// 1");
    }

    // -- 3. Duplicate skills tolerated; differing content warns ---------------------------

    #[test]
    fn duplicate_skills_warn_when_content_differs() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![
            artifact(dir.path(), "one", |p| {
                std::fs::create_dir_all(p.join("skills/review")).unwrap();
                std::fs::write(p.join("skills/review/SKILL.md"), "same").unwrap();
            }),
            artifact(dir.path(), "two", |p| {
                std::fs::create_dir_all(p.join("skills/review")).unwrap();
                std::fs::write(p.join("skills/review/SKILL.md"), "same").unwrap();
            }),
            artifact(dir.path(), "three", |p| {
                std::fs::create_dir_all(p.join("skills/review")).unwrap();
                std::fs::write(p.join("skills/review/SKILL.md"), "different").unwrap();
            }),
        ];
        let (_out, outcome) = compose_pi(HarnessId::Pi, &artifacts);
        let w208: Vec<_> = outcome.warnings.iter().filter(|w| w.code == "W208").collect();
        assert_eq!(w208.len(), 1);
        assert_eq!(w208[0].spaces, vec!["three"]);
    }

    // -- 4. Bridge generated with blocking notice and script staging -----------------------

    #[test]
    fn bridge_generated_with_blocking_notice() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![artifact(dir.path(), "base", |p| {
            std::fs::create_dir_all(p.join("hooks-scripts")).unwrap();
            std::fs::write(
                p.join("hooks-scripts/hooks.toml"),
                concat!(
                    "[[hook]]\n",
                    "event = \"pre_tool_use\"\n",
                    "script = \"scripts/check.sh\"\n",
                    "blocking = true\n",
                    "tools = [\"Bash\"]\n",
                ),
            )
            .unwrap();
            std::fs::create_dir_all(p.join("hooks-scripts/scripts")).unwrap();
            std::fs::write(p.join("hooks-scripts/scripts/check.sh"), "#!/bin/sh\n").unwrap();
        })];
        let (_out, outcome) = compose_pi(HarnessId::Pi, &artifacts);

        let bridge = outcome.bundle.pi.as_ref().unwrap().bridge_path.clone().unwrap();
        let source = std::fs::read_to_string(&bridge).unwrap();
        // scripts/ prefix and bare name are equivalent.
        assert!(source.contains("hooks-scripts/base/check.sh"));
        assert!(outcome.warnings.iter().any(|w| {
            w.code == "W301" && w.severity == asp_core::Severity::Info
        }));
        assert!(
            outcome
                .bundle
                .root_dir
                .join("hooks-scripts/base/scripts/check.sh")
                .is_file()
        );
    }

    // -- 5. No hooks, no bridge ---------------------------------------------------------------

    #[test]
    fn no_hooks_no_bridge() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![artifact(dir.path(), "base", |_| {})];
        let (_out, outcome) = compose_pi(HarnessId::Pi, &artifacts);
        assert!(outcome.bundle.pi.as_ref().unwrap().bridge_path.is_none());
    }

    // -- 6. Script resolution rules -------------------------------------------------------------

    #[test]
    fn script_resolution_rules() {
        assert_eq!(
            resolve_script("base", "check.sh"),
            "hooks-scripts/base/check.sh"
        );
        assert_eq!(
            resolve_script("base", "scripts/check.sh"),
            "hooks-scripts/base/check.sh"
        );
        assert_eq!(resolve_script("base", "/usr/bin/guard"), "/usr/bin/guard");
        assert_eq!(
            resolve_script("base", "python3 guard.py --strict"),
            "python3 guard.py --strict"
        );
    }

    // -- 7. Pi SDK bundle.json ------------------------------------------------------------------

    #[test]
    fn pi_sdk_writes_bundle_json() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![artifact(dir.path(), "base", |p| {
            std::fs::create_dir_all(p.join("extensions")).unwrap();
            std::fs::write(p.join("extensions/base__util.js"), "// a").unwrap();
            std::fs::write(p.join("AGENT.md"), "ctx").unwrap();
        })];
        let (_out, outcome) = compose_pi(HarnessId::PiSdk, &artifacts);

        let sdk = outcome.bundle.pi_sdk.as_ref().unwrap();
        let doc: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&sdk.bundle_json_path).unwrap(),
        )
        .unwrap();
        assert_eq!(doc["schemaVersion"], 1);
        assert_eq!(doc["harnessId"], "pi-sdk");
        assert_eq!(doc["targetName"], "dev");
        assert_eq!(doc["extensions"][0], "extensions/base__util.js");
        assert!(doc["contextFiles"][0].as_str().unwrap().ends_with("AGENT.md"));
    }
}
