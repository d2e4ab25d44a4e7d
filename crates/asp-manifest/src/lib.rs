// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-manifest
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Typed readers for the four TOML surfaces of Agent Spaces.

/// Canonical hook declarations (`hooks.toml`).
pub mod hooks;
/// Canonical permission declarations (`permissions.toml`).
pub mod permissions;
/// Space manifests (`space.toml`).
pub mod space;
/// Project manifests (`asp-targets.toml`).
pub mod targets;

pub use hooks::{HookDef, HookEvent, HookHarness, HooksConfig};
pub use permissions::{DenySection, ExecSection, HostSection, PathSection, PermissionsConfig};
pub use space::{
    AuthorMeta, DepsSection, HarnessSection, PluginMeta, SettingsSection, SpaceManifest,
    SpacePermissions,
};
pub use targets::{ClaudeOptions, CodexOptions, ProjectManifest, ResolverOptions, TargetDef};

/// Maximum length of a manifest `description` field.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Manifest schema version understood by this build.
pub const MANIFEST_SCHEMA: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating a manifest.
///
/// Both variants are fatal to the enclosing operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    /// The file could not be read.
    #[error("failed to read manifest '{path}': {reason}")]
    Io {
        /// Source path of the manifest.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },

    /// The content is not valid TOML for the expected schema.
    #[error("failed to parse manifest '{path}': {reason}")]
    Parse {
        /// Source path of the manifest.
        path: String,
        /// Underlying TOML error.
        reason: String,
    },

    /// The content parsed but violates the schema.
    #[error("invalid manifest '{path}': {}", issues.join("; "))]
    Validation {
        /// Source path of the manifest.
        path: String,
        /// Field-level issues, each naming the field.
        issues: Vec<String>,
    },
}

impl ManifestError {
    /// Build a validation error, or `Ok(())` when no issues were collected.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Validation`] when `issues` is nonempty.
    pub fn check(path: &str, issues: Vec<String>) -> Result<(), Self> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Self::Validation {
                path: path.into(),
                issues,
            })
        }
    }
}
