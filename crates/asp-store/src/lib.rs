// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-store
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Content-addressed snapshots, atomic filesystem primitives, and GC.

/// Atomic write and link-or-copy primitives.
pub mod fsutil;
/// Garbage collection over live lock integrities.
pub mod gc;
/// The `ASP_HOME` directory layout.
pub mod home;
/// Snapshot creation and lookup.
pub mod snapshot;

pub use fsutil::{copy_tree, link_or_copy, link_or_copy_tree, write_atomic, write_json_pretty};
pub use gc::{GcOutcome, collect_garbage};
pub use home::AspHome;
pub use snapshot::SnapshotStore;

/// Errors produced by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("store i/o at '{path}': {source}")]
    Io {
        /// Path involved in the failure.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Registry access failed while snapshotting.
    #[error(transparent)]
    Registry(#[from] asp_registry::RegistryError),

    /// A snapshot's content does not match the integrity the lock expects.
    #[error("integrity mismatch for '{key}': lock pins {expected}, computed {computed}")]
    IntegrityMismatch {
        /// The pinned space key.
        key: String,
        /// Integrity recorded in the lock.
        expected: String,
        /// Integrity computed from the registry.
        computed: String,
    },
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
