// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scoped environment overlays.
//!
//! Orchestrators sometimes need to adjust this process's environment before
//! spawning (e.g. `ASP_HOME` for a global run). The guard restores the
//! original value on every exit path, so an overlay never outlives its
//! orchestration call.

/// Restores an environment variable to its prior state on drop.
#[derive(Debug)]
pub struct EnvGuard {
    key: String,
    previous: Option<String>,
}

impl EnvGuard {
    /// Set `key` to `value`, remembering the prior state.
    #[must_use]
    pub fn set(key: &str, value: &str) -> Self {
        let previous = std::env::var(key).ok();
        // Overlays are applied before any harness spawn, while no other
        // thread reads the environment.
        unsafe { std::env::set_var(key, value) };
        Self {
            key: key.to_owned(),
            previous,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(value) => unsafe { std::env::set_var(&self.key, value) },
            None => unsafe { std::env::remove_var(&self.key) },
        }
    }
}
