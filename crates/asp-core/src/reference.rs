// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `space:<id>@<selector>` reference grammar.
//!
//! Parsing classifies the selector by a fixed priority table; serialization
//! preserves the original spelling so `parse ∘ serialize` is the identity for
//! every selector kind.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::id::{CommitSha, SpaceId};

/// Scheme prefix of every space reference.
pub const REF_SCHEME: &str = "space:";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by the reference grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefError {
    /// The reference does not have the `space:<id>@<selector>` shape.
    #[error("malformed reference '{input}': {reason}")]
    MalformedRef {
        /// The offending input.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The selector half could not be classified.
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector {
        /// The offending selector text.
        selector: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The id half is not a valid space id.
    #[error("invalid space id '{id}': {reason}")]
    InvalidId {
        /// The offending id text.
        id: String,
        /// What was wrong with it.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// How a reference picks a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Selector {
    /// A named tag such as `stable` or `latest`.
    Tag(String),
    /// A semver range expression, stored as written (`^1.0.0`, `~1.2`,
    /// `>=1.0 <2`, or a bare `v1.2.3` / `1.2.3` equality).
    SemverReq(String),
    /// A branch name, resolved to the branch tip at resolve time.
    Branch(String),
    /// A full 40-hex commit sha.
    Commit(String),
    /// The literal `dev`: read live from the registry working copy.
    Dev,
}

/// Discriminant of a [`Selector`], recorded in resolution provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// Named tag.
    Tag,
    /// Semver range.
    Semver,
    /// Branch tip.
    Branch,
    /// Explicit commit.
    Commit,
    /// Dev working copy.
    Dev,
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tag => "tag",
            Self::Semver => "semver",
            Self::Branch => "branch",
            Self::Commit => "commit",
            Self::Dev => "dev",
        };
        f.write_str(s)
    }
}

impl Selector {
    /// Classify a selector string.
    ///
    /// The priority table, applied in order:
    /// 1. literal `dev`
    /// 2. 40-hex commit
    /// 3. range operators (`^ ~ > < =`) or embedded space → semver range
    /// 4. `v?MAJOR.MINOR.PATCH` valid semver → equality range
    /// 5. `branch/<name>` prefix
    /// 6. anything else that fits the tag charset → tag
    ///
    /// # Errors
    ///
    /// Returns [`RefError::InvalidSelector`] for empty input, malformed
    /// ranges, empty branch names, and tags outside `[A-Za-z0-9._-]`.
    pub fn classify(raw: &str) -> Result<Self, RefError> {
        if raw.is_empty() {
            return Err(RefError::InvalidSelector {
                selector: raw.into(),
                reason: "selector must not be empty".into(),
            });
        }

        if raw == "dev" {
            return Ok(Self::Dev);
        }

        if raw.len() == 40 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(Self::Commit(raw.to_ascii_lowercase()));
        }

        if raw.starts_with(['^', '~', '>', '<', '=']) || raw.contains(' ') {
            parse_version_req(raw)?;
            return Ok(Self::SemverReq(raw.into()));
        }

        if let Some(version) = bare_version(raw)
            && semver::Version::parse(version).is_ok()
        {
            return Ok(Self::SemverReq(raw.into()));
        }

        if let Some(branch) = raw.strip_prefix("branch/") {
            if branch.is_empty() {
                return Err(RefError::InvalidSelector {
                    selector: raw.into(),
                    reason: "branch name must not be empty".into(),
                });
            }
            return Ok(Self::Branch(branch.into()));
        }

        if raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Ok(Self::Tag(raw.into()));
        }

        Err(RefError::InvalidSelector {
            selector: raw.into(),
            reason: "not a tag, semver range, branch, commit, or dev".into(),
        })
    }

    /// The wire spelling of this selector.
    #[must_use]
    pub fn serialize(&self) -> String {
        match self {
            Self::Tag(t) => t.clone(),
            Self::SemverReq(r) => r.clone(),
            Self::Branch(b) => format!("branch/{b}"),
            Self::Commit(c) => c.clone(),
            Self::Dev => "dev".into(),
        }
    }

    /// The classification discriminant.
    #[must_use]
    pub fn kind(&self) -> SelectorKind {
        match self {
            Self::Tag(_) => SelectorKind::Tag,
            Self::SemverReq(_) => SelectorKind::Semver,
            Self::Branch(_) => SelectorKind::Branch,
            Self::Commit(_) => SelectorKind::Commit,
            Self::Dev => SelectorKind::Dev,
        }
    }

    /// The parsed requirement of a [`Selector::SemverReq`].
    ///
    /// Bare `v1.2.3` / `1.2.3` selectors become the equality range `=1.2.3`;
    /// space-separated comparators are accepted alongside comma-separated
    /// ones.
    ///
    /// # Errors
    ///
    /// Returns [`RefError::InvalidSelector`] when called on a non-semver
    /// selector (ranges themselves were validated at classification time).
    pub fn version_req(&self) -> Result<semver::VersionReq, RefError> {
        match self {
            Self::SemverReq(raw) => {
                if let Some(version) = bare_version(raw)
                    && semver::Version::parse(version).is_ok()
                {
                    return parse_version_req(&format!("={version}"));
                }
                parse_version_req(raw)
            }
            other => Err(RefError::InvalidSelector {
                selector: other.serialize(),
                reason: "not a semver selector".into(),
            }),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// Strip the optional `v` prefix from a would-be bare version selector.
///
/// Returns `None` unless the remainder starts with `digits.`.
fn bare_version(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix('v').unwrap_or(raw);
    let digits = rest.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && rest[digits..].starts_with('.') {
        Some(rest)
    } else {
        None
    }
}

/// Parse a range expression, tolerating space-separated comparators
/// (`>=1.0 <2` as well as the comma form the semver crate expects).
fn parse_version_req(raw: &str) -> Result<semver::VersionReq, RefError> {
    let normalized = if raw.contains(' ') && !raw.contains(',') {
        // Rejoin a bare operator with the version that follows it, then
        // comma-separate the comparators.
        let mut comparators: Vec<String> = Vec::new();
        for token in raw.split_whitespace() {
            let dangling_op = comparators
                .last()
                .is_some_and(|prev| prev.chars().all(|c| matches!(c, '^' | '~' | '>' | '<' | '=')));
            match comparators.last_mut() {
                Some(last) if dangling_op => last.push_str(token),
                _ => comparators.push(token.to_owned()),
            }
        }
        comparators.join(", ")
    } else {
        raw.to_owned()
    };
    semver::VersionReq::parse(&normalized).map_err(|e| RefError::InvalidSelector {
        selector: raw.into(),
        reason: format!("invalid semver range: {e}"),
    })
}

// ---------------------------------------------------------------------------
// SpaceRef
// ---------------------------------------------------------------------------

/// A reference to a space: `space:<id>@<selector>`.
///
/// Serializes as its wire form, a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpaceRef {
    /// The space being referenced.
    pub id: SpaceId,
    /// How to pick its commit.
    pub selector: Selector,
}

impl SpaceRef {
    /// Build a reference from parts.
    #[must_use]
    pub fn new(id: SpaceId, selector: Selector) -> Self {
        Self { id, selector }
    }

    /// Parse the `space:<id>@<selector>` wire form.
    ///
    /// # Errors
    ///
    /// Returns [`RefError::MalformedRef`] when the `space:` prefix or the `@`
    /// separator is missing or the id half is empty, and the underlying
    /// id/selector errors otherwise.
    pub fn parse(raw: &str) -> Result<Self, RefError> {
        let rest = raw
            .strip_prefix(REF_SCHEME)
            .ok_or_else(|| RefError::MalformedRef {
                input: raw.into(),
                reason: format!("missing '{REF_SCHEME}' prefix"),
            })?;
        let (id, selector) = rest.split_once('@').ok_or_else(|| RefError::MalformedRef {
            input: raw.into(),
            reason: "missing '@' between id and selector".into(),
        })?;
        if id.is_empty() {
            return Err(RefError::MalformedRef {
                input: raw.into(),
                reason: "id must not be empty".into(),
            });
        }
        Ok(Self {
            id: SpaceId::new(id)?,
            selector: Selector::classify(selector)?,
        })
    }

    /// The wire form of this reference.
    #[must_use]
    pub fn serialize(&self) -> String {
        format!("{REF_SCHEME}{}@{}", self.id, self.selector.serialize())
    }
}

impl fmt::Display for SpaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

impl FromStr for SpaceRef {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SpaceRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&SpaceRef::serialize(self))
    }
}

impl<'de> Deserialize<'de> for SpaceRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SpaceRef::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ResolvedSelector
// ---------------------------------------------------------------------------

/// Provenance of a selector resolution: which kind matched, the pinned
/// commit, and a human-readable display of what was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResolvedSelector {
    /// The selector kind that matched.
    pub kind: SelectorKind,
    /// The pinned commit (or the `dev` sentinel).
    pub commit: CommitSha,
    /// Display string, e.g. `stable -> space/base/stable` or `^1.0 -> v1.2.0`.
    pub display: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
