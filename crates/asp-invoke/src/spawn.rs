// SPDX-License-Identifier: MIT OR Apache-2.0
//! Harness process spawning.
//!
//! The child inherits stdio so interactive harnesses own the terminal; the
//! environment overlay applies to the child only, never to this process.

use tracing::info;

use crate::InvokeError;
use crate::argv::HarnessCommand;
use crate::events::{RunEventKind, RunEventSink, SequencedSink};

/// Spawn `command` and wait for it, reporting lifecycle events to `sink`.
///
/// Returns the harness exit code (`-1` when the process was terminated by a
/// signal).
///
/// # Errors
///
/// Returns [`InvokeError::Spawn`] when the binary cannot be started; after a
/// successful spawn the harness's own exit code propagates as `Ok`.
pub async fn spawn_harness<S: RunEventSink>(
    command: &HarnessCommand,
    binary_override: Option<&std::path::Path>,
    sink: &mut SequencedSink<S>,
) -> Result<i32, InvokeError> {
    sink.emit(RunEventKind::CommandBuilt {
        display: command.display(),
    });

    let program = binary_override
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| command.binary.clone());

    let mut child = tokio::process::Command::new(&program)
        .args(&command.args)
        .envs(&command.env)
        .current_dir(&command.cwd)
        .spawn()
        .map_err(|e| InvokeError::Spawn {
            binary: program.clone(),
            reason: e.to_string(),
        })?;

    if let Some(pid) = child.id() {
        sink.emit(RunEventKind::Spawned { pid });
    }
    info!(binary = %program, "harness spawned");

    let status = child.wait().await.map_err(|e| InvokeError::Spawn {
        binary: program,
        reason: e.to_string(),
    })?;
    let code = status.code().unwrap_or(-1);
    sink.emit(RunEventKind::Exited { code });
    Ok(code)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
