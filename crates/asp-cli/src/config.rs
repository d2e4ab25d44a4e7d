// SPDX-License-Identifier: MIT OR Apache-2.0
//! User-level configuration for the `asp` CLI.
//!
//! Loaded from `$ASP_HOME/config.toml` when present. Everything here is a
//! default; command-line flags always win, and the file is optional so a
//! fresh machine works with no setup.

use asp_core::HarnessId;
use schemars::JsonSchema;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Defaults applied when the corresponding flag is absent.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct CliConfig {
    /// Default registry source (path or git URL).
    #[serde(default)]
    pub registry: Option<String>,

    /// Default harness for `install`/`build`/`run`.
    #[serde(default)]
    pub harness: Option<String>,

    /// Default log filter when `ASP_LOG` and `--verbose` are absent.
    #[serde(default)]
    pub log: Option<String>,
}

/// Errors found while validating a [`CliConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliConfigError {
    /// The `harness` value is not a known harness id.
    UnknownHarness {
        /// The offending value.
        value: String,
    },
    /// The `registry` value is empty.
    EmptyRegistry,
}

impl fmt::Display for CliConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliConfigError::UnknownHarness { value } => {
                write!(f, "unknown harness '{value}' in config")
            }
            CliConfigError::EmptyRegistry => write!(f, "registry in config must not be empty"),
        }
    }
}

impl std::error::Error for CliConfigError {}

/// Load the CLI config from `home_root/config.toml`.
///
/// A missing file yields defaults; a malformed file is an error (silent
/// fallback would hide typos forever).
///
/// # Errors
///
/// Parse failures and validation failures.
pub fn load_cli_config(home_root: &Path) -> anyhow::Result<CliConfig> {
    let path = home_root.join("config.toml");
    if !path.is_file() {
        return Ok(CliConfig::default());
    }
    let content = std::fs::read_to_string(&path).map_err(|e| {
        anyhow::anyhow!("failed to read config file '{}': {e}", path.display())
    })?;
    let config: CliConfig = toml::from_str(&content).map_err(|e| {
        anyhow::anyhow!("failed to parse config file '{}': {e}", path.display())
    })?;
    if let Err(errors) = validate_cli_config(&config) {
        let summary = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        anyhow::bail!("invalid config file '{}': {summary}", path.display());
    }
    Ok(config)
}

/// Validate a parsed config, returning every semantic error found.
///
/// # Errors
///
/// One entry per problem.
pub fn validate_cli_config(config: &CliConfig) -> Result<(), Vec<CliConfigError>> {
    let mut errors = Vec::new();

    if let Some(harness) = &config.harness
        && harness.parse::<HarnessId>().is_err()
    {
        errors.push(CliConfigError::UnknownHarness {
            value: harness.clone(),
        });
    }
    if let Some(registry) = &config.registry
        && registry.trim().is_empty()
    {
        errors.push(CliConfigError::EmptyRegistry);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// The default harness, honoring the config when it names one.
#[must_use]
pub fn default_harness(config: &CliConfig) -> HarnessId {
    config
        .harness
        .as_deref()
        .and_then(|h| h.parse().ok())
        .unwrap_or(HarnessId::Claude)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
