// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deep validation coverage across all four manifest surfaces.

use asp_manifest::{
    HooksConfig, ManifestError, PermissionsConfig, ProjectManifest, SpaceManifest,
};

fn validation_issues(err: ManifestError) -> Vec<String> {
    match err {
        ManifestError::Validation { issues, .. } => issues,
        other => panic!("expected Validation, got {other:?}"),
    }
}

// ── space.toml ──────────────────────────────────────────────────────

#[test]
fn space_collects_every_issue_in_one_pass() {
    let bad = r#"
        schema = 9
        id = "Nope Nope"
        version = "one.two"
        [plugin]
        name = "ALSO NOPE"
        version = "x"
        [deps]
        spaces = ["space:ok@stable", "broken", "space:ok@branch/"]
    "#;
    let issues = validation_issues(SpaceManifest::parse(bad, "space.toml").unwrap_err());
    assert!(issues.iter().any(|i| i.starts_with("schema:")));
    assert!(issues.iter().any(|i| i.starts_with("id:")));
    assert!(issues.iter().any(|i| i.starts_with("version:")));
    assert!(issues.iter().any(|i| i.starts_with("plugin.name:")));
    assert!(issues.iter().any(|i| i.starts_with("plugin.version:")));
    assert!(issues.iter().any(|i| i.contains("deps.spaces[1]")));
    assert!(issues.iter().any(|i| i.contains("deps.spaces[2]")));
    assert!(
        !issues.iter().any(|i| i.contains("deps.spaces[0]")),
        "the valid ref must not be flagged"
    );
}

#[test]
fn space_error_display_names_the_file() {
    let err = SpaceManifest::parse("schema = 2\nid = \"x\"\n", "registry/spaces/x/space.toml")
        .unwrap_err();
    assert!(err.to_string().contains("registry/spaces/x/space.toml"));
}

#[test]
fn space_dep_selectors_accept_every_kind() {
    let toml = r#"
        schema = 1
        id = "kitchen-sink"
        [deps]
        spaces = [
            "space:a@stable",
            "space:b@^1.0.0",
            "space:c@1.2.3",
            "space:d@branch/main",
            "space:e@0123456789abcdef0123456789abcdef01234567",
            "space:f@dev",
        ]
    "#;
    let manifest = SpaceManifest::parse(toml, "space.toml").unwrap();
    assert_eq!(manifest.space_refs().len(), 6);
}

#[test]
fn space_description_boundary() {
    let exactly = format!(
        "schema = 1\nid = \"b\"\ndescription = \"{}\"\n",
        "x".repeat(500)
    );
    assert!(SpaceManifest::parse(&exactly, "space.toml").is_ok());

    let over = format!(
        "schema = 1\nid = \"b\"\ndescription = \"{}\"\n",
        "x".repeat(501)
    );
    assert!(SpaceManifest::parse(&over, "space.toml").is_err());
}

// ── asp-targets.toml ────────────────────────────────────────────────

#[test]
fn targets_collects_issues_across_targets() {
    let bad = r#"
        schema = 1
        [targets.empty]
        compose = []
        [targets.broken]
        compose = ["nope"]
    "#;
    let issues =
        validation_issues(ProjectManifest::parse(bad, "asp-targets.toml").unwrap_err());
    assert!(issues.iter().any(|i| i.contains("targets.empty.compose")));
    assert!(issues.iter().any(|i| i.contains("targets.broken.compose[0]")));
}

#[test]
fn targets_defaults_and_overrides() {
    let toml = r#"
        schema = 1
        [claude]
        model = "haiku"
        [targets.a]
        compose = ["space:x@stable"]
        [targets.b]
        compose = ["space:x@stable"]
        yolo = true
        [targets.b.resolver]
        locked = false
        allow_dirty = true
        [targets.b.claude]
        model = "opus"
    "#;
    let manifest = ProjectManifest::parse(toml, "asp-targets.toml").unwrap();
    assert_eq!(manifest.claude.as_ref().unwrap().model.as_deref(), Some("haiku"));

    let a = &manifest.targets["a"];
    assert!(a.resolver.locked);
    assert!(!a.resolver.allow_dirty);
    assert!(!a.yolo);
    assert!(a.claude.is_none());

    let b = &manifest.targets["b"];
    assert!(!b.resolver.locked);
    assert!(b.resolver.allow_dirty);
    assert!(b.yolo);
    assert_eq!(b.claude.as_ref().unwrap().model.as_deref(), Some("opus"));
}

#[test]
fn targets_round_trips_through_toml() {
    let toml = r#"
        schema = 1
        [targets.dev]
        compose = ["space:frontend@stable"]
        description = "Development"
    "#;
    let manifest = ProjectManifest::parse(toml, "asp-targets.toml").unwrap();
    let serialized = toml::to_string(&manifest).unwrap();
    let back = ProjectManifest::parse(&serialized, "asp-targets.toml").unwrap();
    assert_eq!(back, manifest);
}

// ── hooks.toml ──────────────────────────────────────────────────────

#[test]
fn hooks_all_canonical_events_parse() {
    let body: String = [
        "pre_tool_use",
        "post_tool_use",
        "session_start",
        "session_end",
        "stop",
        "user_prompt_submit",
        "subagent_start",
        "subagent_stop",
        "pre_compact",
    ]
    .iter()
    .map(|event| format!("[[hook]]\nevent = \"{event}\"\nscript = \"{event}.sh\"\n"))
    .collect();
    let config = HooksConfig::parse(&body, "hooks.toml").unwrap();
    assert_eq!(config.hooks.len(), 9);
}

#[test]
fn hooks_reject_unknown_event_and_harness() {
    assert!(
        HooksConfig::parse("[[hook]]\nevent = \"on_save\"\nscript = \"x\"\n", "hooks.toml")
            .is_err()
    );
    assert!(
        HooksConfig::parse(
            "[[hook]]\nevent = \"stop\"\nscript = \"x\"\nharness = \"codex\"\n",
            "hooks.toml"
        )
        .is_err(),
        "only claude/pi are valid harness filters"
    );
}

// ── permissions.toml ────────────────────────────────────────────────

#[test]
fn permissions_partial_documents() {
    let deny_only = PermissionsConfig::parse("[deny.write]\npaths = [\"/etc/**\"]\n", "p.toml")
        .unwrap();
    assert!(deny_only.read.is_empty());
    assert!(!deny_only.deny.is_empty());
    assert_eq!(deny_only.deny.write.paths, vec!["/etc/**"]);

    let exec_only =
        PermissionsConfig::parse("[exec]\ncommands = [\"make\"]\n", "p.toml").unwrap();
    assert!(!exec_only.exec.is_empty());
    assert!(exec_only.deny.is_empty());
}
