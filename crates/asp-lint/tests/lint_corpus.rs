// SPDX-License-Identifier: MIT OR Apache-2.0
//! Linter behavior over a mixed corpus of artifacts, the way a composed
//! target presents them.

use asp_core::{ArtifactRecord, HarnessId, Severity, SpaceKey};
use asp_lint::{has_errors, lint_artifacts};
use std::path::Path;

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

/// A corpus with one of everything: colliding commands, an unqualified
/// agent reference, a traversal-y hook, unenforceable permissions.
fn mixed_corpus(dir: &Path) -> Vec<ArtifactRecord> {
    vec![
        artifact(dir, "base", |p| {
            std::fs::create_dir_all(p.join("commands")).unwrap();
            std::fs::write(p.join("commands/build.md"), "base build").unwrap();
            std::fs::write(p.join("commands/deploy.md"), "deploy").unwrap();
        }),
        artifact(dir, "frontend", |p| {
            std::fs::create_dir_all(p.join("commands")).unwrap();
            std::fs::write(p.join("commands/build.md"), "frontend build").unwrap();
            std::fs::create_dir_all(p.join("agents")).unwrap();
            std::fs::write(
                p.join("agents/reviewer.md"),
                "Before review, run /build and then /deploy.\n",
            )
            .unwrap();
        }),
        artifact(dir, "guard", |p| {
            std::fs::create_dir_all(p.join("hooks")).unwrap();
            std::fs::write(
                p.join("hooks/hooks.toml"),
                "[[hook]]\nevent = \"pre_tool_use\"\nscript = \"../../escape.sh\"\n",
            )
            .unwrap();
            std::fs::write(
                p.join("permissions.toml"),
                "[network]\nhosts = [\"api.example.com\"]\n",
            )
            .unwrap();
        }),
    ]
}

#[test]
fn mixed_corpus_reports_each_code_once_per_finding() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = mixed_corpus(dir.path());
    let findings = lint_artifacts(HarnessId::Claude, &artifacts);

    // W201: only `build` collides; `deploy` has a single provider.
    let w201: Vec<_> = findings.iter().filter(|w| w.code == "W201").collect();
    assert_eq!(w201.len(), 1);
    assert!(w201[0].message.contains("'build'"));

    // W202: both referenced commands exist somewhere, both unqualified.
    let w202: Vec<_> = findings.iter().filter(|w| w.code == "W202").collect();
    assert_eq!(w202.len(), 2);

    // W203 for the escaping hook path.
    assert!(findings.iter().any(|w| w.code == "W203"));

    // W304 for the network facet Claude cannot enforce.
    let w304: Vec<_> = findings.iter().filter(|w| w.code == "W304").collect();
    assert_eq!(w304.len(), 1);
    assert_eq!(w304[0].spaces, vec!["guard"]);

    // Nothing here is an error.
    assert!(!has_errors(&findings));
}

#[test]
fn severity_split_matches_the_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let mut artifacts = mixed_corpus(dir.path());
    // Add a W204 producer (hooks dir, broken config).
    artifacts.push(artifact(dir.path(), "broken", |p| {
        std::fs::create_dir_all(p.join("hooks")).unwrap();
        std::fs::write(p.join("hooks/hooks.toml"), "[[hook]\n").unwrap();
    }));

    let findings = lint_artifacts(HarnessId::Claude, &artifacts);
    assert!(has_errors(&findings));
    for finding in &findings {
        match finding.code.as_str() {
            "W204" => assert_eq!(finding.severity, Severity::Error),
            "W201" | "W202" | "W203" | "W206" | "W304" => {
                assert_eq!(finding.severity, Severity::Warning, "{}", finding.code);
            }
            other => panic!("unexpected code {other}"),
        }
    }
}

#[test]
fn pi_artifacts_use_the_pi_hook_namespace() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = vec![artifact(dir.path(), "pi-space", |p| {
        // A valid Pi artifact keeps hooks under hooks-scripts/.
        std::fs::create_dir_all(p.join("hooks-scripts")).unwrap();
        std::fs::write(
            p.join("hooks-scripts/hooks.toml"),
            "[[hook]]\nevent = \"pre_tool_use\"\nscript = \"ok.sh\"\n",
        )
        .unwrap();
        std::fs::write(p.join("hooks-scripts/ok.sh"), "#!/bin/sh\n").unwrap();
    })];

    // Linting the same artifacts for Claude looks at hooks/, which does not
    // exist, so the hook checks are silent either way.
    let claude = lint_artifacts(HarnessId::Claude, &artifacts);
    assert!(claude.iter().all(|w| w.code != "W204"));

    let pi = lint_artifacts(HarnessId::Pi, &artifacts);
    assert!(pi.iter().all(|w| w.code != "W204"));
    // The script lacks execute bits, which Pi linting does flag.
    #[cfg(unix)]
    assert!(pi.iter().any(|w| w.code == "W206"));
}

#[test]
fn empty_input_is_empty_output() {
    assert!(lint_artifacts(HarnessId::Claude, &[]).is_empty());
}
