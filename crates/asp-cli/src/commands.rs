// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared command implementations for the `asp` CLI.

use anyhow::{Context, Result};
use schemars::schema_for;

/// Schema types that can be printed by the `schema` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchemaKind {
    /// JSON schema for the lock file.
    Lock,
    /// JSON schema for `space.toml`.
    Space,
    /// JSON schema for `asp-targets.toml`.
    Targets,
    /// JSON schema for `hooks.toml`.
    Hooks,
    /// JSON schema for `permissions.toml`.
    Permissions,
}

/// Return the JSON schema string for the given kind.
///
/// # Errors
///
/// Serialization failures only.
pub fn schema_json(kind: SchemaKind) -> Result<String> {
    let value = match kind {
        SchemaKind::Lock => serde_json::to_value(schema_for!(asp_core::LockFile))?,
        SchemaKind::Space => serde_json::to_value(schema_for!(asp_manifest::SpaceManifest))?,
        SchemaKind::Targets => {
            serde_json::to_value(schema_for!(asp_manifest::ProjectManifest))?
        }
        SchemaKind::Hooks => serde_json::to_value(schema_for!(asp_manifest::HooksConfig))?,
        SchemaKind::Permissions => {
            serde_json::to_value(schema_for!(asp_manifest::PermissionsConfig))?
        }
    };
    serde_json::to_string_pretty(&value).context("serialize schema")
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Every schema kind serializes -------------------------------------------

    #[test]
    fn every_schema_kind_serializes() {
        for kind in [
            SchemaKind::Lock,
            SchemaKind::Space,
            SchemaKind::Targets,
            SchemaKind::Hooks,
            SchemaKind::Permissions,
        ] {
            let schema = schema_json(kind).unwrap();
            let value: serde_json::Value = serde_json::from_str(&schema).unwrap();
            assert!(value.is_object(), "{kind:?}");
        }
    }
}
