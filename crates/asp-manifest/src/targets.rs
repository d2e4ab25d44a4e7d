// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `asp-targets.toml` project manifest.

use asp_core::SpaceRef;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{MANIFEST_SCHEMA, ManifestError, MAX_DESCRIPTION_LEN};

/// File name of the project manifest.
pub const PROJECT_MANIFEST_NAME: &str = "asp-targets.toml";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// The project manifest declaring composable targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProjectManifest {
    /// Manifest schema version. Must be `1`.
    pub schema: u32,

    /// Project-wide Claude option defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude: Option<ClaudeOptions>,

    /// Project-wide Codex option defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codex: Option<CodexOptions>,

    /// Named targets. Must be nonempty.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetDef>,
}

/// A named composition of spaces.
///
/// Scalar fields precede the table-valued ones so the struct serializes
/// back to valid TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TargetDef {
    /// Ordered space references to compose. Must be nonempty.
    pub compose: Vec<String>,

    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Skip permission prompts when invoking the harness.
    #[serde(default)]
    pub yolo: bool,

    /// Claude options overriding the project defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claude: Option<ClaudeOptions>,

    /// Codex options overriding the project defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codex: Option<CodexOptions>,

    /// Resolution behavior.
    #[serde(default)]
    pub resolver: ResolverOptions,
}

/// Claude-family invocation options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClaudeOptions {
    /// Model passed as `--model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Permission mode passed as `--permission-mode`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_mode: Option<String>,
    /// `--setting-sources` value. `None` omits the flag entirely; an empty
    /// string passes an empty value; anything else passes through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting_sources: Option<String>,
}

/// Codex invocation options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct CodexOptions {
    /// Model passed as `--model`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Approval policy passed as `--approval-policy`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_policy: Option<String>,
    /// Sandbox mode passed as `--sandbox-mode`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_mode: Option<String>,
    /// Config profile passed as `--profile`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

/// Per-target resolution behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResolverOptions {
    /// Pin selectors from the existing lock when present.
    #[serde(default = "default_true")]
    pub locked: bool,
    /// Tolerate a dirty registry working tree.
    #[serde(default)]
    pub allow_dirty: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            locked: true,
            allow_dirty: false,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loading + validation
// ---------------------------------------------------------------------------

impl ProjectManifest {
    /// Parse and validate an `asp-targets.toml` document.
    ///
    /// # Errors
    ///
    /// [`ManifestError::Parse`] when the TOML is malformed,
    /// [`ManifestError::Validation`] when the schema is violated.
    pub fn parse(content: &str, source_path: &str) -> Result<Self, ManifestError> {
        let manifest: Self = toml::from_str(content).map_err(|e| ManifestError::Parse {
            path: source_path.into(),
            reason: e.to_string(),
        })?;
        manifest.validate(source_path)?;
        Ok(manifest)
    }

    /// Read, parse, and validate a project manifest on disk.
    ///
    /// # Errors
    ///
    /// [`ManifestError::Io`] when the file cannot be read, plus the
    /// [`ProjectManifest::parse`] errors.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    fn validate(&self, path: &str) -> Result<(), ManifestError> {
        let mut issues = Vec::new();

        if self.schema != MANIFEST_SCHEMA {
            issues.push(format!(
                "schema: expected {MANIFEST_SCHEMA}, found {}",
                self.schema
            ));
        }
        if self.targets.is_empty() {
            issues.push("targets: at least one target is required".into());
        }
        for (name, target) in &self.targets {
            if target.compose.is_empty() {
                issues.push(format!("targets.{name}.compose: must not be empty"));
            }
            for (i, raw) in target.compose.iter().enumerate() {
                if let Err(e) = SpaceRef::parse(raw) {
                    issues.push(format!("targets.{name}.compose[{i}]: {e}"));
                }
            }
            if let Some(d) = &target.description
                && d.chars().count() > MAX_DESCRIPTION_LEN
            {
                issues.push(format!(
                    "targets.{name}.description: exceeds {MAX_DESCRIPTION_LEN} characters"
                ));
            }
        }

        ManifestError::check(path, issues)
    }

    /// A target's compose list as parsed references.
    ///
    /// Returns `None` for unknown target names. Validation already checked
    /// the references, so parsing cannot fail after a successful load.
    #[must_use]
    pub fn compose_refs(&self, target: &str) -> Option<Vec<SpaceRef>> {
        self.targets.get(target).map(|t| {
            t.compose
                .iter()
                .filter_map(|raw| SpaceRef::parse(raw).ok())
                .collect()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
