// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-lint
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! W201–W304 checks over materialized artifacts.

use asp_core::{ArtifactRecord, HarnessId, Severity, Warning};
use asp_manifest::{HooksConfig, PermissionsConfig};
use asp_materialize::permissions::lint_only_facets;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

/// Whether any finding is an error (which aborts `run` before spawn).
#[must_use]
pub fn has_errors(findings: &[Warning]) -> bool {
    findings.iter().any(|w| w.severity == Severity::Error)
}

/// Lint a target's materialized artifacts for `harness`.
///
/// Checks run in code order (W201 first); within a check, artifacts are
/// visited in load order, so the output is deterministic for a given input
/// set.
#[must_use]
pub fn lint_artifacts(harness: HarnessId, artifacts: &[ArtifactRecord]) -> Vec<Warning> {
    let mut findings = Vec::new();
    check_command_collisions(artifacts, &mut findings);
    check_unqualified_commands(artifacts, &mut findings);
    check_hooks(harness, artifacts, &mut findings);
    check_plugin_name_collisions(artifacts, &mut findings);
    check_permissions(harness, artifacts, &mut findings);
    findings
}

// ---------------------------------------------------------------------------
// W201: command collision
// ---------------------------------------------------------------------------

fn check_command_collisions(artifacts: &[ArtifactRecord], findings: &mut Vec<Warning>) {
    let mut owners: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for artifact in artifacts {
        for name in command_names(&artifact.artifact_path) {
            owners.entry(name).or_default().push(&artifact.space_id);
        }
    }
    for (name, spaces) in owners {
        if spaces.len() > 1 {
            findings.push(Warning::warning(
                "W201",
                format!(
                    "command '{name}' is provided by multiple spaces: {}",
                    spaces.join(", ")
                ),
                &spaces,
            ));
        }
    }
}

/// Base names (no extension) of `commands/*.md` in an artifact.
fn command_names(artifact_path: &Path) -> Vec<String> {
    let commands = artifact_path.join("commands");
    let Ok(entries) = std::fs::read_dir(&commands) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "md"))
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// W202: unqualified command reference in agent markdown
// ---------------------------------------------------------------------------

fn check_unqualified_commands(artifacts: &[ArtifactRecord], findings: &mut Vec<Warning>) {
    let all_commands: std::collections::BTreeSet<String> = artifacts
        .iter()
        .flat_map(|a| command_names(&a.artifact_path))
        .collect();
    if all_commands.is_empty() {
        return;
    }

    // A slash command at a word boundary. The leading class rejects URL and
    // filesystem-path contexts; the trailing class rejects `/plugin:name`
    // qualified forms and deeper path segments.
    let reference = Regex::new(r#"(?m)(?:^|[\s(\[{"'`])/([a-z][a-z0-9-]*)(?:$|[\s.,;)\]}"'`])"#)
        .expect("static regex compiles");

    for artifact in artifacts {
        let agents_dir = artifact.artifact_path.join("agents");
        let Ok(entries) = std::fs::read_dir(&agents_dir) else {
            continue;
        };
        let mut files: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "md"))
            .collect();
        files.sort();

        for file in files {
            let Ok(text) = std::fs::read_to_string(&file) else {
                continue;
            };
            let mut mentioned: Vec<&str> = reference
                .captures_iter(&text)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str())
                .filter(|name| all_commands.contains(*name))
                .collect();
            mentioned.sort_unstable();
            mentioned.dedup();

            for name in mentioned {
                findings.push(Warning::warning(
                    "W202",
                    format!(
                        "agent '{}' references '/{name}' unqualified; use '/<plugin>:{name}'",
                        file.file_stem().unwrap_or_default().to_string_lossy()
                    ),
                    &[&artifact.space_id],
                ));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// W203 / W204 / W206: hook configuration and scripts
// ---------------------------------------------------------------------------

fn check_hooks(harness: HarnessId, artifacts: &[ArtifactRecord], findings: &mut Vec<Warning>) {
    let hooks_dir_name = if asp_harness::artifact_family(harness) == HarnessId::Pi {
        "hooks-scripts"
    } else {
        "hooks"
    };

    for artifact in artifacts {
        let hooks_dir = artifact.artifact_path.join(hooks_dir_name);
        if !hooks_dir.is_dir() {
            continue;
        }
        let hooks_toml = hooks_dir.join("hooks.toml");
        let hooks_json = hooks_dir.join("hooks.json");

        let config = hooks_toml
            .is_file()
            .then(|| HooksConfig::load(&hooks_toml).ok())
            .flatten();
        let json_valid = hooks_json.is_file()
            && std::fs::read_to_string(&hooks_json)
                .is_ok_and(|t| serde_json::from_str::<serde_json::Value>(&t).is_ok());

        if config.is_none() && !json_valid {
            findings.push(Warning::error(
                "W204",
                format!(
                    "space '{}' has a {hooks_dir_name}/ directory but no valid hooks.toml or hooks.json",
                    artifact.space_id
                ),
                &[&artifact.space_id],
            ));
            continue;
        }

        let Some(config) = config else { continue };
        for def in &config.hooks {
            if def.script.contains("..") {
                findings.push(Warning::warning(
                    "W203",
                    format!(
                        "space '{}' hook script '{}' escapes the plugin root",
                        artifact.space_id, def.script
                    ),
                    &[&artifact.space_id],
                ));
            }

            let script = hooks_dir.join(
                def.script
                    .strip_prefix("scripts/")
                    .unwrap_or(def.script.as_str()),
            );
            let fallback = hooks_dir.join(&def.script);
            let resolved = if script.is_file() {
                Some(script)
            } else if fallback.is_file() {
                Some(fallback)
            } else {
                None
            };
            if let Some(script) = resolved
                && !is_executable(&script)
            {
                findings.push(Warning::warning(
                    "W206",
                    format!(
                        "space '{}' hook script '{}' is not executable",
                        artifact.space_id, def.script
                    ),
                    &[&artifact.space_id],
                ));
            }
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

// ---------------------------------------------------------------------------
// W205: plugin name collision
// ---------------------------------------------------------------------------

fn check_plugin_name_collisions(artifacts: &[ArtifactRecord], findings: &mut Vec<Warning>) {
    let mut owners: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for artifact in artifacts {
        owners
            .entry(&artifact.plugin_name)
            .or_default()
            .push(&artifact.space_id);
    }
    for (name, spaces) in owners {
        if spaces.len() > 1 {
            findings.push(Warning::warning(
                "W205",
                format!(
                    "plugin name '{name}' is used by multiple spaces: {}",
                    spaces.join(", ")
                ),
                &spaces,
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// W304: lint-only permission facets
// ---------------------------------------------------------------------------

fn check_permissions(
    harness: HarnessId,
    artifacts: &[ArtifactRecord],
    findings: &mut Vec<Warning>,
) {
    for artifact in artifacts {
        let path = artifact.artifact_path.join("permissions.toml");
        if !path.is_file() {
            continue;
        }
        let Ok(config) = PermissionsConfig::load(&path) else {
            continue;
        };
        let facets = lint_only_facets(harness, &config);
        if !facets.is_empty() {
            let names: Vec<&str> = facets.iter().map(|f| f.as_str()).collect();
            findings.push(Warning::warning(
                "W304",
                format!(
                    "space '{}' declares permissions '{}' that {harness} cannot enforce",
                    artifact.space_id,
                    names.join("', '")
                ),
                &[&artifact.space_id],
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
