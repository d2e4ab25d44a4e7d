// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-core
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! The stable contract for Agent Spaces.
//!
//! Every type that crosses a crate boundary lives here: reference grammar,
//! selector classification, pinned keys, snapshot integrities, harness
//! identifiers, the lock-file schema, and artifact/bundle records.

/// Artifact and composed-bundle records.
pub mod bundle;
/// Harness identifiers and family grouping.
pub mod harness;
/// Space identifiers and pinned space keys.
pub mod id;
/// Snapshot integrity digests.
pub mod integrity;
/// Lock-file schema types.
pub mod lock;
/// The `space:<id>@<selector>` reference grammar.
pub mod reference;
/// Warning codes shared by the composer, linter, and lock.
pub mod warning;

pub use bundle::{ArtifactRecord, CodexBundle, ComposedTargetBundle, PiBundle, PiSdkBundle};
pub use harness::HarnessId;
pub use id::{CommitSha, SpaceId, SpaceKey, short_commit};
pub use integrity::Integrity;
pub use lock::{
    LockFile, LockSpaceEntry, LockTargetEntry, PluginIdentity, RegistrySource, ResolvedFrom,
    SpaceDeps,
};
pub use reference::{RefError, ResolvedSelector, Selector, SelectorKind, SpaceRef};
pub use warning::{Severity, Warning};

/// Current lock-file schema version.
pub const LOCKFILE_VERSION: u32 = 1;

/// Current resolver algorithm version recorded in every lock.
pub const RESOLVER_VERSION: u32 = 1;
