// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! asp-invoke
#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! Bundle → harness command line, plus spawn and session plumbing.

/// Per-harness argv construction.
pub mod argv;
/// Run-event sequencing.
pub mod events;
/// Session records.
pub mod session;
/// Harness process spawning.
pub mod spawn;

pub use argv::{HarnessCommand, RunOptions, SettingSources, build_run_command};
pub use events::{RunEvent, RunEventKind, RunEventSink, SequencedSink};
pub use session::{SessionRecord, load_or_create_session, session_record_path, touch_session};
pub use spawn::spawn_harness;

/// Errors produced by the invoker.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// A session record exists for this id under a different harness.
    #[error(
        "session '{external_id}' was created for harness '{recorded}', not '{requested}'"
    )]
    SessionHarnessMismatch {
        /// The external session id.
        external_id: String,
        /// Harness recorded in the session file.
        recorded: String,
        /// Harness requested for reuse.
        requested: String,
    },

    /// A session record failed to read or parse.
    #[error("failed to read session record '{path}': {reason}")]
    SessionRecord {
        /// Record path.
        path: String,
        /// Underlying failure.
        reason: String,
    },

    /// Writing a session record failed.
    #[error(transparent)]
    Store(#[from] asp_store::StoreError),

    /// Spawning the harness failed before the process started.
    #[error("failed to spawn '{binary}': {reason}")]
    Spawn {
        /// The binary that was launched.
        binary: String,
        /// Underlying failure.
        reason: String,
    },
}
