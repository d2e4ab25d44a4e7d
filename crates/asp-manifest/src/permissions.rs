// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical permission declarations (`permissions.toml`).
//!
//! A space describes the access it needs in harness-neutral facets; each
//! harness enforces what it can and the rest is surfaced by the linter.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ManifestError;

/// File name of the canonical permissions document.
pub const PERMISSIONS_FILE_NAME: &str = "permissions.toml";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// The `permissions.toml` document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct PermissionsConfig {
    /// Paths the space needs to read.
    #[serde(default, skip_serializing_if = "PathSection::is_empty")]
    pub read: PathSection,
    /// Paths the space needs to write.
    #[serde(default, skip_serializing_if = "PathSection::is_empty")]
    pub write: PathSection,
    /// Commands and patterns the space needs to execute.
    #[serde(default, skip_serializing_if = "ExecSection::is_empty")]
    pub exec: ExecSection,
    /// Hosts the space needs to reach.
    #[serde(default, skip_serializing_if = "HostSection::is_empty")]
    pub network: HostSection,
    /// Parallel deny lists.
    #[serde(default, skip_serializing_if = "DenySection::is_empty")]
    pub deny: DenySection,
}

/// A list of path globs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct PathSection {
    /// Path globs, relative to the project root.
    #[serde(default)]
    pub paths: Vec<String>,
}

impl PathSection {
    /// Whether no paths are listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Commands and command patterns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExecSection {
    /// Bare command names (translated to `Bash(cmd *)` on Claude).
    #[serde(default)]
    pub commands: Vec<String>,
    /// Full command patterns (translated to `Bash(pattern)` on Claude).
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl ExecSection {
    /// Whether no commands or patterns are listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.patterns.is_empty()
    }
}

/// A list of network hosts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct HostSection {
    /// Host names (no scheme).
    #[serde(default)]
    pub hosts: Vec<String>,
}

impl HostSection {
    /// Whether no hosts are listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Deny lists mirroring the allow facets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DenySection {
    /// Paths that must not be read.
    #[serde(default, skip_serializing_if = "PathSection::is_empty")]
    pub read: PathSection,
    /// Paths that must not be written.
    #[serde(default, skip_serializing_if = "PathSection::is_empty")]
    pub write: PathSection,
    /// Commands and patterns that must not execute.
    #[serde(default, skip_serializing_if = "ExecSection::is_empty")]
    pub exec: ExecSection,
    /// Hosts that must not be reached.
    #[serde(default, skip_serializing_if = "HostSection::is_empty")]
    pub network: HostSection,
}

impl DenySection {
    /// Whether every deny facet is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read.is_empty()
            && self.write.is_empty()
            && self.exec.is_empty()
            && self.network.is_empty()
    }
}

impl PermissionsConfig {
    /// Whether the document declares nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read.is_empty()
            && self.write.is_empty()
            && self.exec.is_empty()
            && self.network.is_empty()
            && self.deny.is_empty()
    }

    /// Parse a `permissions.toml` document.
    ///
    /// # Errors
    ///
    /// [`ManifestError::Parse`] when the TOML is malformed.
    pub fn parse(content: &str, source_path: &str) -> Result<Self, ManifestError> {
        toml::from_str(content).map_err(|e| ManifestError::Parse {
            path: source_path.into(),
            reason: e.to_string(),
        })
    }

    /// Read and parse a `permissions.toml` file on disk.
    ///
    /// # Errors
    ///
    /// [`ManifestError::Io`] when the file cannot be read, plus the
    /// [`PermissionsConfig::parse`] errors.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
