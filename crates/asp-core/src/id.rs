// SPDX-License-Identifier: MIT OR Apache-2.0
//! Space identifiers, commit SHAs, and pinned space keys.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::reference::RefError;

/// Maximum length of a [`SpaceId`] in bytes.
pub const MAX_SPACE_ID_LEN: usize = 64;

/// Commit sentinel used for dev-mode spaces read live from a working copy.
pub const DEV_COMMIT: &str = "dev";

// ---------------------------------------------------------------------------
// SpaceId
// ---------------------------------------------------------------------------

/// Validated identifier of a space.
///
/// Lowercase kebab-case: `^[a-z][a-z0-9]*(-[a-z0-9]+)*$`, at most 64 bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SpaceId(String);

impl SpaceId {
    /// Parse and validate a space id.
    ///
    /// # Errors
    ///
    /// Returns [`RefError::InvalidId`] when the string is empty, too long, or
    /// not lowercase kebab-case.
    pub fn new(raw: &str) -> Result<Self, RefError> {
        if raw.is_empty() {
            return Err(RefError::InvalidId {
                id: raw.into(),
                reason: "id must not be empty".into(),
            });
        }
        if raw.len() > MAX_SPACE_ID_LEN {
            return Err(RefError::InvalidId {
                id: raw.into(),
                reason: format!("id exceeds {MAX_SPACE_ID_LEN} characters"),
            });
        }
        if !is_kebab_case(raw) {
            return Err(RefError::InvalidId {
                id: raw.into(),
                reason: "id must be lowercase kebab-case starting with a letter".into(),
            });
        }
        Ok(Self(raw.to_owned()))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SpaceId {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Check whether `s` is lowercase kebab-case starting with a letter.
///
/// Shared by space ids and plugin names.
#[must_use]
pub fn is_kebab_case(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    let mut prev_hyphen = false;
    for c in chars {
        match c {
            'a'..='z' | '0'..='9' => prev_hyphen = false,
            '-' if !prev_hyphen => prev_hyphen = true,
            _ => return false,
        }
    }
    !prev_hyphen
}

// ---------------------------------------------------------------------------
// CommitSha
// ---------------------------------------------------------------------------

/// A pinned commit: a 40-hex SHA or the literal `dev` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CommitSha(String);

impl CommitSha {
    /// Wrap a 40-hex commit string, normalizing to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`RefError::InvalidSelector`] when the string is not 40 hex
    /// characters and not the `dev` sentinel.
    pub fn new(raw: &str) -> Result<Self, RefError> {
        if raw == DEV_COMMIT {
            return Ok(Self(DEV_COMMIT.into()));
        }
        if raw.len() == 40 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(Self(raw.to_ascii_lowercase()));
        }
        Err(RefError::InvalidSelector {
            selector: raw.into(),
            reason: "expected a 40-hex commit sha".into(),
        })
    }

    /// The `dev` sentinel commit.
    #[must_use]
    pub fn dev() -> Self {
        Self(DEV_COMMIT.into())
    }

    /// Whether this is the `dev` sentinel.
    #[must_use]
    pub fn is_dev(&self) -> bool {
        self.0 == DEV_COMMIT
    }

    /// The commit as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Abbreviate a commit to the 12-character form used in [`SpaceKey`]s.
///
/// The `dev` sentinel abbreviates to itself.
#[must_use]
pub fn short_commit(commit: &str) -> &str {
    if commit == DEV_COMMIT {
        commit
    } else {
        &commit[..commit.len().min(12)]
    }
}

// ---------------------------------------------------------------------------
// SpaceKey
// ---------------------------------------------------------------------------

/// Unique identity of a pinned space within a lock: `<id>@<commit12>`.
///
/// The same id at different commits is a different key. Dev spaces key as
/// `<id>@dev`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SpaceKey(String);

impl SpaceKey {
    /// Build the key for `id` pinned at `commit`.
    #[must_use]
    pub fn new(id: &SpaceId, commit: &CommitSha) -> Self {
        Self(format!("{id}@{}", short_commit(commit.as_str())))
    }

    /// Parse a key from its `<id>@<commit12>` wire form.
    ///
    /// # Errors
    ///
    /// Returns [`RefError::MalformedRef`] when the `@` separator is missing
    /// or the id half is not a valid [`SpaceId`].
    pub fn parse(raw: &str) -> Result<Self, RefError> {
        let (id, commit) = raw.split_once('@').ok_or_else(|| RefError::MalformedRef {
            input: raw.into(),
            reason: "space key must have the form <id>@<commit12>".into(),
        })?;
        SpaceId::new(id)?;
        if commit.is_empty() {
            return Err(RefError::MalformedRef {
                input: raw.into(),
                reason: "space key commit half must not be empty".into(),
            });
        }
        Ok(Self(raw.to_owned()))
    }

    /// The id half of the key.
    #[must_use]
    pub fn id(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(id, _)| id)
    }

    /// The abbreviated-commit half of the key.
    #[must_use]
    pub fn commit12(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, c)| c)
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SpaceKey {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Valid ids ---------------------------------------------------------

    #[test]
    fn accepts_valid_ids() {
        for id in ["base", "frontend", "a", "my-space-2", "x0-y1"] {
            assert!(SpaceId::new(id).is_ok(), "{id} should be valid");
        }
    }

    // -- 2. Invalid ids -------------------------------------------------------

    #[test]
    fn rejects_invalid_ids() {
        for id in ["", "Base", "1base", "-base", "base-", "ba--se", "ba_se", "ba se"] {
            assert!(SpaceId::new(id).is_err(), "{id:?} should be invalid");
        }
    }

    // -- 3. Id length cap -----------------------------------------------------

    #[test]
    fn rejects_overlong_id() {
        let long = "a".repeat(MAX_SPACE_ID_LEN + 1);
        assert!(SpaceId::new(&long).is_err());
        let max = "a".repeat(MAX_SPACE_ID_LEN);
        assert!(SpaceId::new(&max).is_ok());
    }

    // -- 4. Commit sha validation --------------------------------------------

    #[test]
    fn commit_sha_validation() {
        let sha = "a".repeat(40);
        assert!(CommitSha::new(&sha).is_ok());
        assert!(CommitSha::new("dev").unwrap().is_dev());
        assert!(CommitSha::new("abc").is_err());
        assert!(CommitSha::new(&"g".repeat(40)).is_err());
    }

    // -- 5. Commit sha normalizes to lowercase -------------------------------

    #[test]
    fn commit_sha_lowercases() {
        let sha = CommitSha::new(&"ABCDEF0123".repeat(4)).unwrap();
        assert_eq!(sha.as_str(), &"abcdef0123".repeat(4));
    }

    // -- 6. Short commit ------------------------------------------------------

    #[test]
    fn short_commit_abbreviates() {
        let sha = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(short_commit(sha), "0123456789ab");
        assert_eq!(short_commit("dev"), "dev");
    }

    // -- 7. SpaceKey round-trip ----------------------------------------------

    #[test]
    fn space_key_round_trip() {
        let id = SpaceId::new("frontend").unwrap();
        let commit = CommitSha::new(&"ab".repeat(20)).unwrap();
        let key = SpaceKey::new(&id, &commit);
        assert_eq!(key.as_str(), "frontend@abababababab");
        assert_eq!(key.id(), "frontend");
        assert_eq!(key.commit12(), "abababababab");
        assert_eq!(SpaceKey::parse(key.as_str()).unwrap(), key);
    }

    // -- 8. Dev keys -----------------------------------------------------------

    #[test]
    fn dev_space_key() {
        let id = SpaceId::new("scratch").unwrap();
        let key = SpaceKey::new(&id, &CommitSha::dev());
        assert_eq!(key.as_str(), "scratch@dev");
    }

    // -- 9. Malformed keys -----------------------------------------------------

    #[test]
    fn rejects_malformed_keys() {
        assert!(SpaceKey::parse("no-separator").is_err());
        assert!(SpaceKey::parse("@abc").is_err());
        assert!(SpaceKey::parse("ok@").is_err());
    }

    // -- 10. Kebab-case helper -------------------------------------------------

    #[test]
    fn kebab_case_helper() {
        assert!(is_kebab_case("plugin-name"));
        assert!(!is_kebab_case("Plugin"));
        assert!(!is_kebab_case("plugin--name"));
        assert!(!is_kebab_case(""));
    }
}
