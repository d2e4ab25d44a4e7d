// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `space.toml` manifest.

use asp_core::{HarnessId, SpaceId, SpaceRef, id::is_kebab_case};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{MANIFEST_SCHEMA, ManifestError, MAX_DESCRIPTION_LEN};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// The manifest a space carries at its root (`space.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpaceManifest {
    /// Manifest schema version. Must be `1`.
    pub schema: u32,

    /// The space id, matching the directory name under `spaces/`.
    pub id: String,

    /// Optional semver version of the space content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Optional free-form description (at most 500 characters).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Plugin identity metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginMeta>,

    /// Declared dependencies.
    #[serde(default)]
    pub deps: DepsSection,

    /// Settings contributed to target composition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsSection>,

    /// Harness support declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harness: Option<HarnessSection>,
}

/// Plugin metadata block of a space manifest.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct PluginMeta {
    /// Plugin name (kebab-case). Defaults to the space id when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Plugin version (semver).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Author record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorMeta>,
    /// Search keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// SPDX license expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Homepage URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Repository URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

/// Plugin author record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuthorMeta {
    /// Author display name.
    pub name: String,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Author URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Dependency block of a space manifest.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DepsSection {
    /// Space references this space depends on, in declared order.
    #[serde(default)]
    pub spaces: Vec<String>,
}

/// Settings a space contributes to composed `settings.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct SettingsSection {
    /// Permission list additions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<SpacePermissions>,
    /// Environment variables (later spaces override earlier on collision).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Preferred model (last non-empty value wins).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Allow/deny permission entries contributed by a space.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct SpacePermissions {
    /// Entries appended to `permissions.allow`.
    #[serde(default)]
    pub allow: Vec<String>,
    /// Entries appended to `permissions.deny`.
    #[serde(default)]
    pub deny: Vec<String>,
}

/// Harness support declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct HarnessSection {
    /// Harnesses this space supports. Empty means all.
    #[serde(default)]
    pub supports: Vec<HarnessId>,
}

// ---------------------------------------------------------------------------
// Loading + validation
// ---------------------------------------------------------------------------

impl SpaceManifest {
    /// Parse and validate a `space.toml` document.
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

    /// Read, parse, and validate a `space.toml` file on disk.
    ///
    /// # Errors
    ///
    /// [`ManifestError::Io`] when the file cannot be read, plus the
    /// [`SpaceManifest::parse`] errors.
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
        if let Err(e) = SpaceId::new(&self.id) {
            issues.push(format!("id: {e}"));
        }
        if let Some(v) = &self.version
            && semver::Version::parse(v).is_err()
        {
            issues.push(format!("version: '{v}' is not valid semver"));
        }
        if let Some(d) = &self.description
            && d.chars().count() > MAX_DESCRIPTION_LEN
        {
            issues.push(format!(
                "description: exceeds {MAX_DESCRIPTION_LEN} characters"
            ));
        }
        if let Some(plugin) = &self.plugin {
            if let Some(name) = &plugin.name
                && !is_kebab_case(name)
            {
                issues.push(format!("plugin.name: '{name}' is not kebab-case"));
            }
            if let Some(v) = &plugin.version
                && semver::Version::parse(v).is_err()
            {
                issues.push(format!("plugin.version: '{v}' is not valid semver"));
            }
        }
        for (i, raw) in self.deps.spaces.iter().enumerate() {
            if let Err(e) = SpaceRef::parse(raw) {
                issues.push(format!("deps.spaces[{i}]: {e}"));
            }
        }

        ManifestError::check(path, issues)
    }

    /// The declared dependencies as parsed references.
    ///
    /// Validation already checked these, so this never fails after a
    /// successful [`SpaceManifest::parse`].
    #[must_use]
    pub fn space_refs(&self) -> Vec<SpaceRef> {
        self.deps
            .spaces
            .iter()
            .filter_map(|raw| SpaceRef::parse(raw).ok())
            .collect()
    }

    /// The plugin name this space materializes as (plugin.name or the id).
    #[must_use]
    pub fn plugin_name(&self) -> &str {
        self.plugin
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .unwrap_or(&self.id)
    }

    /// The plugin version (plugin.version falling back to the space version).
    #[must_use]
    pub fn plugin_version(&self) -> Option<&str> {
        self.plugin
            .as_ref()
            .and_then(|p| p.version.as_deref())
            .or(self.version.as_deref())
    }

    /// Whether this space declares support for `harness`.
    ///
    /// An absent or empty `harness.supports` list means every harness.
    #[must_use]
    pub fn supports_harness(&self, harness: HarnessId) -> bool {
        match &self.harness {
            Some(section) if !section.supports.is_empty() => {
                section.supports.iter().any(|h| {
                    *h == harness
                        || (h.is_claude_family() && harness.is_claude_family())
                        || (h.is_pi_family() && harness.is_pi_family())
                })
            }
            _ => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
