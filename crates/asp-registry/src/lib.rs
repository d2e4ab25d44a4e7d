// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-registry
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Git working-tree registry adapter plus selector resolution.

/// The git adapter.
pub mod git;
/// Selector-to-commit resolution.
pub mod resolve;

pub use git::{GitRegistry, TreeEntry, TreeEntryKind, ensure_local_checkout};
pub use resolve::SelectorResolver;

/// Errors produced by registry access and selector resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The registry path is not a usable git checkout.
    #[error("registry unavailable at '{path}': {reason}")]
    Unavailable {
        /// Registry path that was probed.
        path: String,
        /// Why it is unusable.
        reason: String,
    },

    /// A selector did not resolve to anything in the registry.
    #[error("no match for 'space:{id}@{selector}' in the registry")]
    RefNotFound {
        /// The space id being resolved.
        id: String,
        /// The selector text that failed.
        selector: String,
    },

    /// The registry working tree has uncommitted changes.
    ///
    /// Only surfaced when the resolving target sets `allow_dirty = false`.
    #[error("registry working tree at '{path}' is dirty")]
    DirtyWorkingTree {
        /// Registry path.
        path: String,
    },

    /// A git invocation failed.
    #[error("git {command} failed: {reason}")]
    Git {
        /// The git subcommand that failed.
        command: String,
        /// Captured stderr or exit status.
        reason: String,
    },
}
