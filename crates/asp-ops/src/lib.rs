// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-ops
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The orchestration pipelines over the Agent Spaces crates.

use asp_store::AspHome;
use std::path::{Path, PathBuf};

/// Scoped environment overlays. The only module touching process-global
/// state, and therefore the only one allowed `unsafe` (edition 2024 makes
/// `set_var` unsafe).
#[allow(unsafe_code)]
pub mod env;
/// `explain`, `list`, and `doctor`.
pub mod explain;
/// `resolve`, `install`, and `build`.
pub mod install;
/// `diff` and `gc`.
pub mod maintenance;
/// `run` and the ad-hoc global/dev runs.
pub mod run;

pub use env::EnvGuard;
pub use explain::{DoctorReport, SpaceExplain, TargetExplain, doctor, explain, list_targets};
pub use install::{InstallOptions, InstallOutcome, build, install, resolve_targets};
pub use maintenance::{diff, gc};
pub use run::{RunConfig, RunReport, run_global_space, run_local_space, run_target};

/// File recording the artifact list next to a composed bundle, enabling the
/// reload path to lint without recomposing.
pub const ARTIFACTS_META_NAME: &str = "artifacts.meta.json";

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything an orchestration call needs to know about its surroundings.
///
/// `ASP_HOME` is an explicit argument here; the environment variable is only
/// a default applied by the CLI.
#[derive(Debug, Clone)]
pub struct OpsContext {
    /// The ASP home directory.
    pub home: AspHome,
    /// The registry checkout path.
    pub registry_path: PathBuf,
    /// The project root (where `asp-targets.toml` lives).
    pub project_root: PathBuf,
}

impl OpsContext {
    /// Build a context.
    #[must_use]
    pub fn new(home: AspHome, registry_path: &Path, project_root: &Path) -> Self {
        Self {
            home,
            registry_path: registry_path.to_path_buf(),
            project_root: project_root.to_path_buf(),
        }
    }

    /// The registry URL recorded in locks.
    #[must_use]
    pub fn registry_url(&self) -> String {
        self.registry_path.display().to_string()
    }

    /// Path of the project manifest.
    #[must_use]
    pub fn project_manifest_path(&self) -> PathBuf {
        self.project_root.join(asp_manifest::targets::PROJECT_MANIFEST_NAME)
    }

    /// Path of the project lock.
    #[must_use]
    pub fn project_lock_path(&self) -> PathBuf {
        self.project_root.join(asp_lock::PROJECT_LOCK_NAME)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the orchestrators.
#[derive(Debug, thiserror::Error)]
pub enum OpsError {
    /// A manifest failed to load or validate.
    #[error(transparent)]
    Manifest(#[from] asp_manifest::ManifestError),

    /// Registry access or selector resolution failed.
    #[error(transparent)]
    Registry(#[from] asp_registry::RegistryError),

    /// Closure walking failed.
    #[error(transparent)]
    Resolver(#[from] asp_resolver::ResolverError),

    /// Store or snapshot work failed.
    #[error(transparent)]
    Store(#[from] asp_store::StoreError),

    /// Lock reading or writing failed.
    #[error(transparent)]
    Lock(#[from] asp_lock::LockError),

    /// Artifact materialization failed.
    #[error(transparent)]
    Materialize(#[from] asp_materialize::MaterializeError),

    /// Bundle composition failed.
    #[error(transparent)]
    Compose(#[from] asp_compose::ComposeError),

    /// Harness invocation failed.
    #[error(transparent)]
    Invoke(#[from] asp_invoke::InvokeError),

    /// A reference failed to parse.
    #[error(transparent)]
    Ref(#[from] asp_core::RefError),

    /// The named target is not declared in the project manifest.
    #[error("unknown target '{name}'")]
    UnknownTarget {
        /// The requested target name.
        name: String,
    },

    /// Lint findings include errors; the run was aborted before spawn.
    #[error("Lint errors found - aborting")]
    LintErrors {
        /// Every finding, errors included.
        findings: Vec<asp_core::Warning>,
    },

    /// The harness binary is not available on this machine.
    #[error("harness '{harness}' is not available (no binary found)")]
    HarnessUnavailable {
        /// The harness that was requested.
        harness: asp_core::HarnessId,
    },
}
