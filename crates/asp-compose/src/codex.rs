// SPDX-License-Identifier: MIT OR Apache-2.0
//! Codex home-template assembly.
//!
//! Codex reads everything from `CODEX_HOME`, so composition produces a
//! `codex.home/` template: `config.toml` (with the unioned MCP servers in
//! Codex's TOML shape), `AGENTS.md` concatenated from the composed spaces,
//! merged `skills/`, commands republished as `prompts/`, and a copy of the
//! user's `auth.json` when one can be found.

use asp_core::{CodexBundle, ComposedTargetBundle, Warning};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::claude::collect_mcp_servers;
use crate::{ComposeError, ComposeInput, ComposeOutcome};

/// Directory name of the assembled home template inside the bundle.
pub const CODEX_HOME_DIR: &str = "codex.home";

pub(crate) fn compose(
    input: &ComposeInput<'_>,
    out_dir: &Path,
) -> Result<ComposeOutcome, ComposeError> {
    let mut warnings = Vec::new();
    let home = out_dir.join(CODEX_HOME_DIR);
    std::fs::create_dir_all(&home).map_err(|e| asp_store::StoreError::Io {
        path: home.display().to_string(),
        source: e,
    })?;

    let servers = collect_mcp_servers(input, &mut warnings)?;
    write_config_toml(&home, &servers)?;
    if !servers.is_empty() {
        asp_store::write_json_pretty(
            &home.join("mcp.json"),
            &serde_json::json!({ "mcpServers": servers }),
            false,
        )?;
    }

    write_agents_md(input, &home)?;
    merge_skills(input, &home)?;
    publish_prompts(input, &home)?;
    link_auth(&home, &mut warnings)?;

    Ok(ComposeOutcome {
        bundle: ComposedTargetBundle {
            harness: input.harness,
            target_name: input.target_name.to_owned(),
            root_dir: out_dir.to_path_buf(),
            plugin_dirs: vec![],
            mcp_config_path: None,
            settings_path: None,
            pi: None,
            pi_sdk: None,
            codex: Some(CodexBundle {
                home_template_path: home,
            }),
        },
        warnings,
    })
}

/// Emit `config.toml` with the MCP servers in Codex's `[mcp_servers.<name>]`
/// shape.
fn write_config_toml(
    home: &Path,
    servers: &BTreeMap<String, Value>,
) -> Result<(), ComposeError> {
    let mut doc = toml::Table::new();
    if !servers.is_empty() {
        let mut table = toml::Table::new();
        for (name, config) in servers {
            let mut server = toml::Table::new();
            if let Some(command) = config.get("command").and_then(Value::as_str) {
                server.insert("command".into(), toml::Value::String(command.into()));
            }
            if let Some(args) = config.get("args").and_then(Value::as_array) {
                let args = args
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| toml::Value::String(s.into()))
                    .collect();
                server.insert("args".into(), toml::Value::Array(args));
            }
            if let Some(env) = config.get("env").and_then(Value::as_object) {
                let mut env_table = toml::Table::new();
                for (key, value) in env {
                    if let Some(value) = value.as_str() {
                        env_table.insert(key.clone(), toml::Value::String(value.into()));
                    }
                }
                server.insert("env".into(), toml::Value::Table(env_table));
            }
            table.insert(name.clone(), toml::Value::Table(server));
        }
        doc.insert("mcp_servers".into(), toml::Value::Table(table));
    }

    let text = format!(
        "# Generated by asp; per-run options come from the command line.\n{}",
        toml::to_string(&doc).unwrap_or_default()
    );
    asp_store::write_atomic(&home.join("config.toml"), text.as_bytes(), false)?;
    Ok(())
}

/// Concatenate the composed spaces' instructions into `AGENTS.md`.
fn write_agents_md(input: &ComposeInput<'_>, home: &Path) -> Result<(), ComposeError> {
    let mut sections = Vec::new();
    for artifact in input.artifacts {
        let instructions = artifact.artifact_path.join("CLAUDE.md");
        if let Ok(text) = std::fs::read_to_string(&instructions) {
            sections.push(text.trim_end().to_owned());
        }
    }
    if sections.is_empty() {
        return Ok(());
    }
    let body = sections.join("\n\n");
    asp_store::write_atomic(&home.join("AGENTS.md"), format!("{body}\n").as_bytes(), false)?;
    Ok(())
}

fn merge_skills(input: &ComposeInput<'_>, home: &Path) -> Result<(), ComposeError> {
    for artifact in input.artifacts {
        let src = artifact.artifact_path.join("skills");
        if src.is_dir() {
            asp_store::link_or_copy_tree(&src, &home.join("skills"))?;
        }
    }
    Ok(())
}

/// Republish command markdown as Codex prompts; later spaces win name
/// collisions (the linter reports them as W201).
fn publish_prompts(input: &ComposeInput<'_>, home: &Path) -> Result<(), ComposeError> {
    let prompts = home.join("prompts");
    for artifact in input.artifacts {
        let commands = artifact.artifact_path.join("commands");
        if !commands.is_dir() {
            continue;
        }
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&commands)
            .map_err(|e| asp_store::StoreError::Io {
                path: commands.display().to_string(),
                source: e,
            })?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "md"))
            .collect();
        entries.sort();
        for entry in entries {
            if let Some(name) = entry.file_name() {
                let target = prompts.join(name);
                if target.exists() {
                    std::fs::remove_file(&target).map_err(|e| asp_store::StoreError::Io {
                        path: target.display().to_string(),
                        source: e,
                    })?;
                }
                asp_store::link_or_copy(&entry, &target)?;
            }
        }
    }
    Ok(())
}

/// Copy the user's Codex OAuth file into the template when one exists.
fn link_auth(home: &Path, warnings: &mut Vec<Warning>) -> Result<(), ComposeError> {
    let candidates = [
        std::env::var("CODEX_HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("auth.json")),
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(".codex").join("auth.json")),
    ];
    for candidate in candidates.into_iter().flatten() {
        if candidate.is_file() {
            asp_store::link_or_copy(&candidate, &home.join("auth.json"))?;
            return Ok(());
        }
    }
    warnings.push(Warning::info(
        "W209",
        "no codex auth.json found; the harness will prompt for login",
        &[],
    ));
    Ok(())
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

    fn compose_codex(artifacts: &[ArtifactRecord]) -> (tempfile::TempDir, ComposeOutcome) {
        let out = tempfile::tempdir().unwrap();
        let input = ComposeInput {
            harness: HarnessId::Codex,
            target_name: "dev",
            artifacts,
            settings: &[],
            yolo: false,
        };
        let outcome = crate::compose_target(&input, &out.path().join("bundle")).unwrap();
        (out, outcome)
    }

    // -- 1. Home template carries config.toml and AGENTS.md --------------------------

    #[test]
    fn home_template_assembled() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![
            artifact(dir.path(), "base", |p| {
                std::fs::write(p.join("CLAUDE.md"), "Base rules.").unwrap();
            }),
            artifact(dir.path(), "frontend", |p| {
                std::fs::write(p.join("CLAUDE.md"), "Frontend rules.").unwrap();
                std::fs::create_dir_all(p.join("commands")).unwrap();
                std::fs::write(p.join("commands/build.md"), "build").unwrap();
            }),
        ];
        let (_out, outcome) = compose_codex(&artifacts);
        let home = outcome
            .bundle
            .codex
            .as_ref()
            .unwrap()
            .home_template_path
            .clone();

        assert!(home.join("config.toml").is_file());
        let agents = std::fs::read_to_string(home.join("AGENTS.md")).unwrap();
        assert!(agents.contains("Base rules."));
        assert!(agents.contains("Frontend rules."));
        let base_idx = agents.find("Base rules.").unwrap();
        let front_idx = agents.find("Frontend rules.").unwrap();
        assert!(base_idx < front_idx, "load order preserved");
        assert!(home.join("prompts/build.md").is_file());
    }

    // -- 2. MCP servers land in config.toml and mcp.json ---------------------------------

    #[test]
    fn mcp_lands_in_config_toml() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![artifact(dir.path(), "mcp-server-a", |p| {
            std::fs::create_dir_all(p.join("mcp")).unwrap();
            std::fs::write(
                p.join("mcp/mcp.json"),
                serde_json::json!({"mcpServers": {"server-alpha": {
                    "command": "npx",
                    "args": ["-y", "@example/server-alpha"],
                    "env": {"ALPHA_KEY": "test-value"},
                }}})
                .to_string(),
            )
            .unwrap();
        })];
        let (_out, outcome) = compose_codex(&artifacts);
        let home = outcome
            .bundle
            .codex
            .as_ref()
            .unwrap()
            .home_template_path
            .clone();

        let config = std::fs::read_to_string(home.join("config.toml")).unwrap();
        assert!(config.contains("[mcp_servers.server-alpha]"));
        assert!(config.contains("command = \"npx\""));
        assert!(config.contains("ALPHA_KEY = \"test-value\""));
        assert!(home.join("mcp.json").is_file());
    }

    // -- 3. No instructions, no AGENTS.md --------------------------------------------------

    #[test]
    fn no_instructions_no_agents_md() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = vec![artifact(dir.path(), "base", |_| {})];
        let (_out, outcome) = compose_codex(&artifacts);
        let home = outcome
            .bundle
            .codex
            .as_ref()
            .unwrap()
            .home_template_path
            .clone();
        assert!(!home.join("AGENTS.md").exists());
        assert!(home.join("config.toml").is_file());
    }
}
