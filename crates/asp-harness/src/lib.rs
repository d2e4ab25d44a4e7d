// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-harness
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Per-harness conventions and the binary availability oracle.

use asp_core::HarnessId;
use std::path::{Path, PathBuf};

/// Directory under the project root that holds composed bundles.
pub const ASP_MODULES_DIR: &str = "asp_modules";

// ---------------------------------------------------------------------------
// Conventions
// ---------------------------------------------------------------------------

/// The artifact family a harness consumes.
///
/// The Claude Agent SDK loads Claude Code artifacts unchanged; the Pi SDK
/// loads Pi artifacts plus a `bundle.json` manifest.
#[must_use]
pub fn artifact_family(harness: HarnessId) -> HarnessId {
    match harness {
        HarnessId::Claude | HarnessId::ClaudeAgentSdk => HarnessId::Claude,
        HarnessId::Pi | HarnessId::PiSdk => HarnessId::Pi,
        HarnessId::Codex => HarnessId::Codex,
    }
}

/// The instructions file name a harness reads from an artifact root.
#[must_use]
pub fn instructions_file(harness: HarnessId) -> &'static str {
    match artifact_family(harness) {
        HarnessId::Claude => "CLAUDE.md",
        HarnessId::Codex => "AGENTS.md",
        _ => "AGENT.md",
    }
}

/// Output directory of a target's composed bundle:
/// `<project>/asp_modules/<target>/<harness>/`.
#[must_use]
pub fn target_output_dir(project_root: &Path, target: &str, harness: HarnessId) -> PathBuf {
    project_root
        .join(ASP_MODULES_DIR)
        .join(target)
        .join(harness.as_str())
}

/// The binary a harness is launched through.
#[must_use]
pub fn binary_name(harness: HarnessId) -> &'static str {
    match harness {
        HarnessId::Claude | HarnessId::ClaudeAgentSdk => "claude",
        HarnessId::Pi => "pi",
        HarnessId::PiSdk => "bun",
        HarnessId::Codex => "codex",
    }
}

/// Environment variable that overrides the probed binary path, when one
/// exists for the harness.
#[must_use]
pub fn binary_override_env(harness: HarnessId) -> Option<&'static str> {
    match harness {
        HarnessId::Claude | HarnessId::ClaudeAgentSdk => Some("ASP_CLAUDE_PATH"),
        HarnessId::Pi => Some("PI_PATH"),
        HarnessId::PiSdk | HarnessId::Codex => None,
    }
}

// ---------------------------------------------------------------------------
// Availability oracle
// ---------------------------------------------------------------------------

/// What a detection probe learned about a harness binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessAvailability {
    /// Resolved binary path.
    pub binary: PathBuf,
    /// Version string, when the probe captured one.
    pub version: Option<String>,
}

/// Boolean "available + version" oracle for harness binaries.
///
/// The real probes live outside the core; orchestrators accept any
/// implementation so tests can script availability.
pub trait AvailabilityOracle {
    /// Probe for `harness`, returning `None` when it is not available.
    fn detect(&self, harness: HarnessId) -> Option<HarnessAvailability>;
}

/// PATH-walking oracle honoring the per-harness override variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathOracle;

impl AvailabilityOracle for PathOracle {
    fn detect(&self, harness: HarnessId) -> Option<HarnessAvailability> {
        if let Some(var) = binary_override_env(harness)
            && let Ok(value) = std::env::var(var)
            && !value.is_empty()
        {
            let path = PathBuf::from(value);
            return path.is_file().then_some(HarnessAvailability {
                binary: path,
                version: None,
            });
        }

        let name = binary_name(harness);
        let path_var = std::env::var_os("PATH")?;
        for dir in std::env::split_paths(&path_var) {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(HarnessAvailability {
                    binary: candidate,
                    version: None,
                });
            }
        }
        None
    }
}

/// Scripted oracle for tests: every harness is available (or none).
#[derive(Debug, Clone, Copy)]
pub struct FixedOracle {
    /// Whether every probe succeeds.
    pub available: bool,
}

impl AvailabilityOracle for FixedOracle {
    fn detect(&self, harness: HarnessId) -> Option<HarnessAvailability> {
        self.available.then(|| HarnessAvailability {
            binary: PathBuf::from(binary_name(harness)),
            version: Some("0.0.0-test".into()),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
