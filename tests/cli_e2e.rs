// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end CLI tests that exercise the `asp` binary from the outside.

use assert_cmd::Command;
use asp_registry::resolve::testing::standard_registry;
use predicates::prelude::*;
use std::path::Path;

/// Helper: build a [`Command`] for the `asp` binary.
fn asp() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("asp").expect("binary `asp` should be built")
}

/// Helper: a project + registry + home rooted in one temp dir.
struct Fixture {
    root: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let registry = root.path().join("registry");
        std::fs::create_dir_all(&registry).unwrap();
        standard_registry(&registry);

        let project = root.path().join("project");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(
            project.join("asp-targets.toml"),
            concat!(
                "schema = 1\n",
                "[targets.dev]\n",
                "compose = [\"space:frontend@stable\"]\n",
                "description = \"Development bundle\"\n",
            ),
        )
        .unwrap();
        Self { root }
    }

    fn project(&self) -> std::path::PathBuf {
        self.root.path().join("project")
    }

    fn cmd(&self, args: &[&str]) -> Command {
        let mut cmd = asp();
        cmd.current_dir(self.project())
            .arg("--asp-home")
            .arg(self.root.path().join("home"))
            .arg("--registry")
            .arg(self.root.path().join("registry"))
            .args(args);
        cmd
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 1. Help and schema
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn help_lists_all_subcommands() {
    asp()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Agent Spaces CLI"))
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("explain"))
        .stdout(predicate::str::contains("diff"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("doctor"))
        .stdout(predicate::str::contains("gc"));
}

#[test]
fn schema_prints_json() {
    asp()
        .args(["schema", "lock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lockfileVersion"));
    asp()
        .args(["schema", "space"])
        .assert()
        .success()
        .stdout(predicate::str::contains("schema"));
}

// ═══════════════════════════════════════════════════════════════════════
// 2. resolve / list
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn resolve_prints_load_order() {
    let fx = Fixture::new();
    fx.cmd(&["resolve"])
        .assert()
        .success()
        .stdout(predicate::str::contains("target dev"))
        .stdout(predicate::str::contains("base@"))
        .stdout(predicate::str::contains("frontend@"));
    // Resolution never writes the lock.
    assert!(!fx.project().join("asp-lock.json").exists());
}

#[test]
fn list_shows_targets() {
    let fx = Fixture::new();
    fx.cmd(&["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dev: Development bundle"));
}

#[test]
fn resolve_unknown_target_fails() {
    let fx = Fixture::new();
    fx.cmd(&["resolve", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown target 'ghost'"));
}

// ═══════════════════════════════════════════════════════════════════════
// 3. install / build / explain / diff
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn install_writes_lock_and_bundle() {
    let fx = Fixture::new();
    fx.cmd(&["install"])
        .assert()
        .success()
        .stdout(predicate::str::contains("installed dev"));

    let lock = fx.project().join("asp-lock.json");
    assert!(lock.is_file());
    let text = std::fs::read_to_string(&lock).unwrap();
    assert!(text.ends_with('\n'));
    assert!(
        fx.project()
            .join("asp_modules/dev/claude/settings.json")
            .is_file()
    );
}

#[test]
fn build_prints_bundle_path() {
    let fx = Fixture::new();
    fx.cmd(&["build", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            Path::new("asp_modules").join("dev").join("claude").to_str().unwrap(),
        ));
}

#[test]
fn explain_after_install() {
    let fx = Fixture::new();
    fx.cmd(&["install"]).assert().success();
    fx.cmd(&["explain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("target dev"))
        .stdout(predicate::str::contains("space/base/stable"))
        .stdout(predicate::str::contains("integrity: sha256:"));

    fx.cmd(&["explain", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"resolved_from\""));
}

#[test]
fn diff_reports_no_changes_when_fresh() {
    let fx = Fixture::new();
    fx.cmd(&["install"]).assert().success();
    fx.cmd(&["diff", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no changes"));
}

// ═══════════════════════════════════════════════════════════════════════
// 4. run --dry-run
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn run_dry_run_prints_copy_pasteable_command() {
    let fx = Fixture::new();
    fx.cmd(&["run", "dev", "--dry-run", "-p", "hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains("claude"))
        .stdout(predicate::str::contains("--plugin-dir"))
        .stdout(predicate::str::contains("--settings"))
        .stdout(predicate::str::contains("-p hello"));
}

#[test]
fn run_dry_run_pi_model_aliasing() {
    let fx = Fixture::new();
    fx.cmd(&[
        "run", "dev", "--harness", "pi", "--dry-run", "--model", "sonnet", "-p", "x",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("--no-skills"))
    .stdout(predicate::str::contains("claude-sonnet"));
}

// ═══════════════════════════════════════════════════════════════════════
// 5. doctor / gc
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn doctor_reports_layout() {
    let fx = Fixture::new();
    fx.cmd(&["install"]).assert().success();
    fx.cmd(&["doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("asp home:"))
        .stdout(predicate::str::contains("registry: ok"));
}

#[test]
fn gc_dry_run_reports_orphans() {
    let fx = Fixture::new();
    fx.cmd(&["install"]).assert().success();

    let orphan = fx.root.path().join("home/store/spaces").join("0".repeat(64));
    std::fs::create_dir_all(&orphan).unwrap();
    std::fs::write(orphan.join("b.bin"), vec![0u8; 1000]).unwrap();

    fx.cmd(&["gc", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would remove 1 snapshot(s), 1000 byte(s)"));
    assert!(orphan.is_dir());

    fx.cmd(&["gc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed 1 snapshot(s), 1000 byte(s)"));
    assert!(!orphan.exists());
}

// ═══════════════════════════════════════════════════════════════════════
// 6. Ad-hoc runs
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn run_space_without_a_project() {
    let fx = Fixture::new();
    // No project manifest needed: run straight from a reference.
    let empty = fx.root.path().join("elsewhere");
    std::fs::create_dir_all(&empty).unwrap();
    let mut cmd = asp();
    cmd.current_dir(&empty)
        .arg("--asp-home")
        .arg(fx.root.path().join("home"))
        .arg("--registry")
        .arg(fx.root.path().join("registry"))
        .args(["run-space", "space:base@stable", "--dry-run", "-p", "hi"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("claude"));

    // The global lock recorded the ad-hoc pin.
    let global = fx.root.path().join("home/global-lock.json");
    assert!(global.is_file());
    let text = std::fs::read_to_string(&global).unwrap();
    assert!(text.contains("_global"));
}

#[test]
fn run_local_dev_space() {
    let fx = Fixture::new();
    let space_dir = fx.root.path().join("registry/spaces/frontend");
    let mut cmd = asp();
    cmd.current_dir(fx.project())
        .arg("--asp-home")
        .arg(fx.root.path().join("home"))
        .arg("--registry")
        .arg(fx.root.path().join("registry"))
        .arg("run-local")
        .arg(&space_dir)
        .args(["--dry-run", "-p", "hi"]);
    cmd.assert().success();

    let text =
        std::fs::read_to_string(fx.root.path().join("home/global-lock.json")).unwrap();
    assert!(text.contains("frontend@dev"));
    assert!(text.contains("sha256:dev"));
}

// ═══════════════════════════════════════════════════════════════════════
// 7. Error surfaces
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn missing_manifest_is_a_clean_error() {
    let root = tempfile::tempdir().unwrap();
    let mut cmd = asp();
    cmd.current_dir(root.path())
        .arg("--asp-home")
        .arg(root.path().join("home"))
        .args(["install"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}
