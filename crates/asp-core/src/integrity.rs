// SPDX-License-Identifier: MIT OR Apache-2.0
//! Snapshot integrity digests.
//!
//! An [`Integrity`] is `sha256:<64-hex>` — the content digest of a snapshot,
//! which doubles as the snapshot directory name in the store — or the
//! `sha256:dev` sentinel for dev spaces that are never snapshotted.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of every integrity string.
pub const INTEGRITY_PREFIX: &str = "sha256:";

/// Digest sentinel for dev spaces.
pub const DEV_INTEGRITY: &str = "sha256:dev";

/// A snapshot content digest: `sha256:<64-hex>` or the `sha256:dev` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Integrity(String);

/// Errors produced when parsing an integrity string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid integrity '{input}': {reason}")]
pub struct IntegrityError {
    /// The offending input.
    pub input: String,
    /// What was wrong with it.
    pub reason: String,
}

impl Integrity {
    /// The dev sentinel.
    #[must_use]
    pub fn dev() -> Self {
        Self(DEV_INTEGRITY.into())
    }

    /// Wrap a raw 64-hex digest (without prefix).
    #[must_use]
    pub fn from_hex(hex: &str) -> Self {
        Self(format!("{INTEGRITY_PREFIX}{}", hex.to_ascii_lowercase()))
    }

    /// Parse a full `sha256:...` string.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityError`] when the prefix is missing or the digest is
    /// not 64 hex characters (and not the dev sentinel).
    pub fn parse(raw: &str) -> Result<Self, IntegrityError> {
        if raw == DEV_INTEGRITY {
            return Ok(Self::dev());
        }
        let hex = raw
            .strip_prefix(INTEGRITY_PREFIX)
            .ok_or_else(|| IntegrityError {
                input: raw.into(),
                reason: format!("missing '{INTEGRITY_PREFIX}' prefix"),
            })?;
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IntegrityError {
                input: raw.into(),
                reason: "digest must be 64 hex characters".into(),
            });
        }
        Ok(Self(format!(
            "{INTEGRITY_PREFIX}{}",
            hex.to_ascii_lowercase()
        )))
    }

    /// Whether this is the dev sentinel.
    #[must_use]
    pub fn is_dev(&self) -> bool {
        self.0 == DEV_INTEGRITY
    }

    /// The bare hex digest without the `sha256:` prefix.
    ///
    /// This is the snapshot directory basename under `store/spaces/`.
    #[must_use]
    pub fn hex(&self) -> &str {
        &self.0[INTEGRITY_PREFIX.len()..]
    }

    /// The full `sha256:...` string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Integrity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Integrity {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Parse and display --------------------------------------------------

    #[test]
    fn parses_valid_integrity() {
        let hex = "ab".repeat(32);
        let i = Integrity::parse(&format!("sha256:{hex}")).unwrap();
        assert_eq!(i.hex(), hex);
        assert_eq!(i.to_string(), format!("sha256:{hex}"));
        assert!(!i.is_dev());
    }

    // -- 2. Dev sentinel -------------------------------------------------------

    #[test]
    fn dev_sentinel() {
        let i = Integrity::parse("sha256:dev").unwrap();
        assert!(i.is_dev());
        assert_eq!(i, Integrity::dev());
        assert_eq!(i.hex(), "dev");
    }

    // -- 3. Rejects malformed --------------------------------------------------

    #[test]
    fn rejects_malformed() {
        assert!(Integrity::parse("md5:abcd").is_err());
        assert!(Integrity::parse("sha256:short").is_err());
        assert!(Integrity::parse(&format!("sha256:{}", "g".repeat(64))).is_err());
    }

    // -- 4. Normalizes case ----------------------------------------------------

    #[test]
    fn normalizes_case() {
        let upper = "AB".repeat(32);
        let i = Integrity::parse(&format!("sha256:{upper}")).unwrap();
        assert_eq!(i.hex(), "ab".repeat(32));
    }
}
