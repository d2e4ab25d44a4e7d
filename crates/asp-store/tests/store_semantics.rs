// SPDX-License-Identifier: MIT OR Apache-2.0
//! Store semantics: digest composition, rename-race idempotence, and
//! snapshot immutability from the caller's point of view.

use asp_core::{CommitSha, SpaceId};
use asp_registry::GitRegistry;
use asp_registry::resolve::testing::RegistryFixture;
use asp_store::{AspHome, SnapshotStore};
use std::path::Path;

fn id(s: &str) -> SpaceId {
    SpaceId::new(s).unwrap()
}

fn registry_with(build: impl FnOnce(&RegistryFixture)) -> (tempfile::TempDir, GitRegistry, CommitSha) {
    let dir = tempfile::tempdir().unwrap();
    let fx = RegistryFixture::init(dir.path());
    build(&fx);
    let commit = CommitSha::new(&fx.commit("content")).unwrap();
    let registry = GitRegistry::open(dir.path()).unwrap();
    (dir, registry, commit)
}

fn store() -> (tempfile::TempDir, SnapshotStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::open(&AspHome::new(dir.path())).unwrap();
    (dir, store)
}

// ── Digest composition ──────────────────────────────────────────────

#[test]
fn digest_covers_path_mode_and_content() {
    let (_d1, reg_a, commit_a) = registry_with(|fx| {
        fx.write("spaces/probe/space.toml", "schema = 1\nid = \"probe\"\n");
        fx.write("spaces/probe/file.txt", "same content");
    });
    // Same content at a different path.
    let (_d2, reg_b, commit_b) = registry_with(|fx| {
        fx.write("spaces/probe/space.toml", "schema = 1\nid = \"probe\"\n");
        fx.write("spaces/probe/renamed.txt", "same content");
    });
    // Same path, content, but executable mode.
    let (_d3, reg_c, commit_c) = registry_with(|fx| {
        fx.write("spaces/probe/space.toml", "schema = 1\nid = \"probe\"\n");
        fx.write("spaces/probe/file.txt", "same content");
        fx.make_executable("spaces/probe/file.txt");
    });

    let (_h, store) = store();
    let a = store.compute_integrity(&reg_a, &id("probe"), &commit_a).unwrap();
    let b = store.compute_integrity(&reg_b, &id("probe"), &commit_b).unwrap();
    let c = store.compute_integrity(&reg_c, &id("probe"), &commit_c).unwrap();

    assert_ne!(a, b, "path must be part of the digest");
    assert_ne!(a, c, "mode must be part of the digest");
    assert_ne!(b, c);
}

#[test]
fn identical_content_from_different_repos_digests_equal() {
    let build = |fx: &RegistryFixture| {
        fx.write("spaces/probe/space.toml", "schema = 1\nid = \"probe\"\n");
        fx.write("spaces/probe/data.txt", "payload");
    };
    let (_d1, reg_a, commit_a) = registry_with(build);
    let (_d2, reg_b, commit_b) = registry_with(build);

    let (_h, store) = store();
    let a = store.compute_integrity(&reg_a, &id("probe"), &commit_a).unwrap();
    let b = store.compute_integrity(&reg_b, &id("probe"), &commit_b).unwrap();
    // Commits differ (timestamps), content digests do not.
    assert_eq!(a, b);
}

// ── Rename-race idempotence ─────────────────────────────────────────

#[test]
fn losing_the_rename_race_is_not_an_error() {
    let (_d, registry, commit) = registry_with(|fx| {
        fx.write("spaces/probe/space.toml", "schema = 1\nid = \"probe\"\n");
        fx.write("spaces/probe/data.txt", "payload");
    });
    let (_h, store) = store();

    // First creation computes the digest and lands the snapshot.
    let integrity = store.ensure_snapshot(&registry, &id("probe"), &commit).unwrap();
    let snapshot = store.snapshot_path(&integrity);
    assert!(snapshot.is_dir());

    // Scribble a marker inside the existing snapshot: a second ensure must
    // treat the prior snapshot as authoritative and leave it alone.
    std::fs::write(snapshot.join("marker"), "prior").unwrap();
    let again = store.ensure_snapshot(&registry, &id("probe"), &commit).unwrap();
    assert_eq!(again, integrity);
    assert_eq!(
        std::fs::read_to_string(snapshot.join("marker")).unwrap(),
        "prior"
    );
}

// ── Staging hygiene ─────────────────────────────────────────────────

#[test]
fn temp_area_holds_no_leftovers_after_success() {
    let (_d, registry, commit) = registry_with(|fx| {
        fx.write("spaces/probe/space.toml", "schema = 1\nid = \"probe\"\n");
        fx.write("spaces/probe/nested/deep/file.txt", "x");
    });
    let (home_dir, store) = store();
    store.ensure_snapshot(&registry, &id("probe"), &commit).unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(home_dir.path().join("temp"))
        .unwrap()
        .filter_map(Result::ok)
        .collect();
    assert!(leftovers.is_empty(), "staging dirs must not leak: {leftovers:?}");
}

#[test]
fn nested_paths_survive_extraction() {
    let (_d, registry, commit) = registry_with(|fx| {
        fx.write("spaces/probe/space.toml", "schema = 1\nid = \"probe\"\n");
        fx.write("spaces/probe/skills/review/SKILL.md", "review skill");
        fx.write("spaces/probe/hooks/scripts/guard.sh", "#!/bin/sh\n");
    });
    let (_h, store) = store();
    let integrity = store.ensure_snapshot(&registry, &id("probe"), &commit).unwrap();
    let snapshot = store.snapshot_path(&integrity);
    assert_eq!(
        std::fs::read_to_string(snapshot.join("skills/review/SKILL.md")).unwrap(),
        "review skill"
    );
    assert!(snapshot.join("hooks/scripts/guard.sh").is_file());
}

// ── Symlink preservation ────────────────────────────────────────────

#[cfg(unix)]
#[test]
fn symlinks_are_preserved_as_symlinks() {
    let dir = tempfile::tempdir().unwrap();
    let fx = RegistryFixture::init(dir.path());
    fx.write("spaces/probe/space.toml", "schema = 1\nid = \"probe\"\n");
    fx.write("spaces/probe/real.txt", "target content");
    std::os::unix::fs::symlink(
        "real.txt",
        dir.path().join("spaces/probe/alias.txt"),
    )
    .unwrap();
    let commit = CommitSha::new(&fx.commit("links")).unwrap();
    let registry = GitRegistry::open(dir.path()).unwrap();

    let (_h, store) = store();
    let integrity = store.ensure_snapshot(&registry, &id("probe"), &commit).unwrap();
    let alias = store.snapshot_path(&integrity).join("alias.txt");
    let meta = std::fs::symlink_metadata(&alias).unwrap();
    assert!(meta.file_type().is_symlink());
    assert_eq!(std::fs::read_link(&alias).unwrap(), Path::new("real.txt"));
}
