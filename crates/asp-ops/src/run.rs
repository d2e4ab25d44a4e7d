// SPDX-License-Identifier: MIT OR Apache-2.0
//! `run` and the ad-hoc global/dev runs.
//!
//! `run` reuses the composed bundle on disk when it exists (or rebuilds on
//! `refresh`), lints, halts on lint errors, and hands the bundle to the
//! invoker. Global and dev runs synthesize a throwaway target under
//! `ASP_HOME`, merge their pins into `global-lock.json`, then invoke.

use asp_compose::load_bundle;
use asp_core::{ArtifactRecord, HarnessId, SpaceRef, Warning};
use asp_harness::AvailabilityOracle;
use asp_invoke::{
    RunEventSink, RunOptions, SequencedSink, SettingSources, build_run_command, spawn_harness,
};
use asp_lint::{has_errors, lint_artifacts};
use asp_lock::{LockBuilder, merge_global, read_lock_if_exists, write_lock};
use asp_manifest::{ClaudeOptions, CodexOptions, ProjectManifest, SpaceManifest, TargetDef};
use asp_registry::{GitRegistry, SelectorResolver};
use asp_resolver::{Closure, ClosureNode, walk_closure};
use asp_store::SnapshotStore;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::install::{InstallOptions, ResolvedTarget, install, materialize_and_compose};
use crate::{ARTIFACTS_META_NAME, OpsContext, OpsError};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Per-run configuration assembled by the CLI.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The harness to run.
    pub harness: HarnessId,
    /// Model override from the command line.
    pub model: Option<String>,
    /// Skip permission prompts.
    pub yolo: bool,
    /// Interactive session.
    pub interactive: bool,
    /// Prompt for one-shot runs.
    pub prompt: Option<String>,
    /// Print the command instead of spawning.
    pub dry_run: bool,
    /// Rebuild the bundle even when one exists.
    pub refresh: bool,
    /// Stable external session id, when the caller tracks sessions.
    pub session_id: Option<String>,
}

/// What a run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Lint and compose findings that were surfaced.
    pub warnings: Vec<Warning>,
    /// The shell-quoted command.
    pub command: String,
    /// Harness exit code; `None` for dry runs.
    pub exit_code: Option<i32>,
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Run a target on a harness.
///
/// # Errors
///
/// [`OpsError::LintErrors`] when findings include an error severity,
/// [`OpsError::HarnessUnavailable`] when the binary cannot be found, plus
/// everything `install` can raise on the rebuild path.
pub async fn run_target<S: RunEventSink>(
    ctx: &OpsContext,
    target: &str,
    cfg: &RunConfig,
    oracle: &dyn AvailabilityOracle,
    sink: &mut SequencedSink<S>,
) -> Result<RunReport, OpsError> {
    let manifest = ProjectManifest::load(&ctx.project_manifest_path())?;
    let definition = manifest
        .targets
        .get(target)
        .ok_or_else(|| OpsError::UnknownTarget {
            name: target.into(),
        })?
        .clone();

    let out_dir = asp_harness::target_output_dir(&ctx.project_root, target, cfg.harness);
    let (bundle, artifacts, mut warnings) = if cfg.refresh || !out_dir.join(ARTIFACTS_META_NAME).is_file()
    {
        let mut outcome = install(
            ctx,
            &InstallOptions {
                harness: cfg.harness,
                target: Some(target.into()),
                use_lock: definition.resolver.locked,
            },
        )?;
        let composed = outcome
            .bundles
            .remove(target)
            .ok_or_else(|| OpsError::UnknownTarget {
                name: target.into(),
            })?;
        let artifacts = read_artifacts_meta(&out_dir)?;
        (composed.bundle, artifacts, composed.warnings)
    } else {
        (load_bundle(&out_dir)?, read_artifacts_meta(&out_dir)?, Vec::new())
    };

    warnings.extend(lint_artifacts(cfg.harness, &artifacts));
    if has_errors(&warnings) {
        return Err(OpsError::LintErrors { findings: warnings });
    }

    let run_options = merged_run_options(ctx, &manifest, &definition, cfg);
    let mut command = build_run_command(&bundle, &run_options);

    if let Some(session_id) = &cfg.session_id {
        apply_session_home(ctx, cfg.harness, session_id, &bundle, &mut command)?;
    }
    let command_display = command.display();

    if cfg.dry_run {
        info!(command = %command_display, "dry run");
        return Ok(RunReport {
            warnings,
            command: command_display,
            exit_code: None,
        });
    }

    let availability = oracle
        .detect(cfg.harness)
        .ok_or(OpsError::HarnessUnavailable {
            harness: cfg.harness,
        })?;

    if let Some(session_id) = &cfg.session_id {
        let record =
            asp_invoke::load_or_create_session(&ctx.home, session_id, cfg.harness)?;
        asp_invoke::touch_session(&ctx.home, record)?;
    }

    for warning in &warnings {
        warn!(code = %warning.code, "{warning}");
    }
    let code = spawn_harness(&command, Some(&availability.binary), sink).await?;
    Ok(RunReport {
        warnings,
        command: command_display,
        exit_code: Some(code),
    })
}

/// Point a stateful harness at its per-session home so multi-turn runs
/// resume consistently: Pi's agent dir, and a per-session copy of the Codex
/// home template (Codex mutates its home, so the shared template stays
/// pristine).
fn apply_session_home(
    ctx: &OpsContext,
    harness: HarnessId,
    session_id: &str,
    bundle: &asp_core::ComposedTargetBundle,
    command: &mut asp_invoke::HarnessCommand,
) -> Result<(), OpsError> {
    let record_path = asp_invoke::session_record_path(&ctx.home, session_id);
    let hash = record_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match harness {
        HarnessId::Pi => {
            let session_home = ctx.home.session_home("pi", &hash);
            std::fs::create_dir_all(&session_home).map_err(|e| {
                asp_store::StoreError::Io {
                    path: session_home.display().to_string(),
                    source: e,
                }
            })?;
            command.env.insert(
                "PI_CODING_AGENT_DIR".into(),
                session_home.display().to_string(),
            );
        }
        HarnessId::Codex => {
            let session_home = ctx.home.session_home("codex", &hash);
            if !session_home.is_dir()
                && let Some(codex) = &bundle.codex
            {
                asp_store::copy_tree(&codex.home_template_path, &session_home)?;
            }
            if session_home.is_dir() {
                command
                    .env
                    .insert("CODEX_HOME".into(), session_home.display().to_string());
            }
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn read_artifacts_meta(out_dir: &Path) -> Result<Vec<ArtifactRecord>, OpsError> {
    let path = out_dir.join(ARTIFACTS_META_NAME);
    let text = std::fs::read_to_string(&path).map_err(|_| {
        asp_compose::ComposeError::NotComposed {
            path: out_dir.display().to_string(),
        }
    })?;
    serde_json::from_str(&text).map_err(|_| {
        asp_compose::ComposeError::NotComposed {
            path: out_dir.display().to_string(),
        }
        .into()
    })
}

/// Merge project defaults, target options, and CLI overrides (CLI wins).
fn merged_run_options(
    ctx: &OpsContext,
    manifest: &ProjectManifest,
    definition: &TargetDef,
    cfg: &RunConfig,
) -> RunOptions {
    let claude = merge_claude(manifest.claude.as_ref(), definition.claude.as_ref());
    let codex = merge_codex(manifest.codex.as_ref(), definition.codex.as_ref());

    RunOptions {
        model: cfg.model.clone().or(claude.model).or(codex.model),
        yolo: cfg.yolo || definition.yolo,
        interactive: cfg.interactive,
        prompt: cfg.prompt.clone(),
        permission_mode: claude.permission_mode,
        setting_sources: match claude.setting_sources {
            Some(value) if value == "none" => SettingSources::Omit,
            Some(value) => SettingSources::Value(value),
            None => SettingSources::Empty,
        },
        approval_policy: codex.approval_policy,
        sandbox_mode: codex.sandbox_mode,
        profile: codex.profile,
        project_root: ctx.project_root.clone(),
        cwd: ctx.project_root.clone(),
    }
}

fn merge_claude(base: Option<&ClaudeOptions>, overlay: Option<&ClaudeOptions>) -> ClaudeOptions {
    let base = base.cloned().unwrap_or_default();
    let overlay = overlay.cloned().unwrap_or_default();
    ClaudeOptions {
        model: overlay.model.or(base.model),
        permission_mode: overlay.permission_mode.or(base.permission_mode),
        setting_sources: overlay.setting_sources.or(base.setting_sources),
    }
}

fn merge_codex(base: Option<&CodexOptions>, overlay: Option<&CodexOptions>) -> CodexOptions {
    let base = base.cloned().unwrap_or_default();
    let overlay = overlay.cloned().unwrap_or_default();
    CodexOptions {
        model: overlay.model.or(base.model),
        approval_policy: overlay.approval_policy.or(base.approval_policy),
        sandbox_mode: overlay.sandbox_mode.or(base.sandbox_mode),
        profile: overlay.profile.or(base.profile),
    }
}

// ---------------------------------------------------------------------------
// Global and dev runs
// ---------------------------------------------------------------------------

/// Name of the synthesized target for ad-hoc global runs.
pub const GLOBAL_TARGET: &str = "_global";

/// Run a single space reference without a project, pinning into the global
/// lock.
///
/// # Errors
///
/// Same surface as [`run_target`], with resolution errors for the reference
/// itself.
pub async fn run_global_space<S: RunEventSink>(
    ctx: &OpsContext,
    reference: &SpaceRef,
    cfg: &RunConfig,
    oracle: &dyn AvailabilityOracle,
    sink: &mut SequencedSink<S>,
) -> Result<RunReport, OpsError> {
    let registry = GitRegistry::open(&ctx.registry_path)?;
    let resolver = SelectorResolver::new(&registry);
    let compose = vec![reference.clone()];
    let closure = walk_closure(&resolver, &compose)?;

    run_synthesized(ctx, &registry, GLOBAL_TARGET, compose, closure, cfg, oracle, sink).await
}

/// Run a space working directory in dev mode, pinning into the global lock.
///
/// The directory must contain a `space.toml`; dependencies resolve against
/// the registry while the space itself is read live from `dir`.
///
/// # Errors
///
/// Same surface as [`run_global_space`].
pub async fn run_local_space<S: RunEventSink>(
    ctx: &OpsContext,
    dir: &Path,
    cfg: &RunConfig,
    oracle: &dyn AvailabilityOracle,
    sink: &mut SequencedSink<S>,
) -> Result<RunReport, OpsError> {
    let manifest = SpaceManifest::load(&dir.join("space.toml"))?;
    let id: asp_core::SpaceId = manifest.id.parse()?;

    let registry = GitRegistry::open(&ctx.registry_path)?;
    let resolver = SelectorResolver::new(&registry);

    // Dependencies come from the registry; the dev node itself reads `dir`.
    let mut closure = walk_closure(&resolver, &manifest.space_refs())?;
    let commit = asp_core::CommitSha::dev();
    let key = asp_core::SpaceKey::new(&id, &commit);
    let deps = closure.load_order.clone();
    closure.load_order.push(key.clone());
    closure.roots = vec![key.clone()];
    closure.nodes.insert(
        key.clone(),
        ClosureNode {
            key: key.clone(),
            id: id.clone(),
            commit: commit.clone(),
            path: dir.display().to_string(),
            manifest,
            resolved_from: asp_core::ResolvedSelector {
                kind: asp_core::SelectorKind::Dev,
                commit,
                display: "dev".into(),
            },
            selector_text: "dev".into(),
            deps,
        },
    );

    let target_name = id.to_string();
    run_synthesized(
        ctx,
        &registry,
        &target_name,
        vec![SpaceRef::parse(&format!("space:{id}@dev"))?],
        closure,
        cfg,
        oracle,
        sink,
    )
    .await
}

/// Shared tail of the global/dev runs: snapshot, lock-merge, materialize,
/// compose, lint, invoke.
#[allow(clippy::too_many_arguments)]
async fn run_synthesized<S: RunEventSink>(
    ctx: &OpsContext,
    registry: &GitRegistry,
    target_name: &str,
    compose: Vec<SpaceRef>,
    closure: Closure,
    cfg: &RunConfig,
    oracle: &dyn AvailabilityOracle,
    sink: &mut SequencedSink<S>,
) -> Result<RunReport, OpsError> {
    let store = SnapshotStore::open(&ctx.home)?;

    let mut integrities = BTreeMap::new();
    for node in closure.ordered_nodes() {
        let integrity = if node.commit.is_dev() {
            asp_core::Integrity::dev()
        } else {
            store.ensure_snapshot(registry, &node.id, &node.commit)?
        };
        integrities.insert(node.key.clone(), integrity);
    }

    let mut builder = LockBuilder::new(&ctx.registry_url());
    builder.add_target(target_name, &compose, &closure, &integrities);
    let new_lock = builder.finish();

    let global_path = ctx.home.global_lock_path();
    let merged = match read_lock_if_exists(&global_path)? {
        Some(existing) => merge_global(existing, new_lock),
        None => new_lock,
    };
    write_lock(&global_path, &merged)?;

    // Synthesized bundles live under ASP_HOME, not in any project.
    let target = ResolvedTarget {
        definition: TargetDef {
            compose: compose.iter().map(SpaceRef::serialize).collect(),
            description: None,
            claude: None,
            codex: None,
            resolver: Default::default(),
            yolo: cfg.yolo,
        },
        compose,
        closure,
    };
    let scratch_ctx = OpsContext {
        home: ctx.home.clone(),
        registry_path: ctx.registry_path.clone(),
        project_root: ctx.home.temp().join(target_name),
    };
    let outcome = materialize_and_compose(
        &scratch_ctx,
        registry,
        &store,
        target_name,
        &target,
        cfg.harness,
        &integrities,
    )?;

    let out_dir =
        asp_harness::target_output_dir(&scratch_ctx.project_root, target_name, cfg.harness);
    let artifacts = read_artifacts_meta(&out_dir)?;
    let mut warnings = outcome.warnings;
    warnings.extend(lint_artifacts(cfg.harness, &artifacts));
    if has_errors(&warnings) {
        return Err(OpsError::LintErrors { findings: warnings });
    }

    let run_options = RunOptions {
        model: cfg.model.clone(),
        yolo: cfg.yolo,
        interactive: cfg.interactive,
        prompt: cfg.prompt.clone(),
        permission_mode: None,
        setting_sources: SettingSources::Empty,
        approval_policy: None,
        sandbox_mode: None,
        profile: None,
        project_root: scratch_ctx.project_root.clone(),
        cwd: std::env::current_dir().unwrap_or_else(|_| scratch_ctx.project_root.clone()),
    };
    let command = build_run_command(&outcome.bundle, &run_options);
    let display = command.display();

    if cfg.dry_run {
        return Ok(RunReport {
            warnings,
            command: display,
            exit_code: None,
        });
    }
    let availability = oracle
        .detect(cfg.harness)
        .ok_or(OpsError::HarnessUnavailable {
            harness: cfg.harness,
        })?;
    let code = spawn_harness(&command, Some(&availability.binary), sink).await?;
    Ok(RunReport {
        warnings,
        command: display,
        exit_code: Some(code),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
