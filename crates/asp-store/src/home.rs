// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `ASP_HOME` directory layout.
//!
//! Orchestrators carry an [`AspHome`] as an explicit argument; the
//! `ASP_HOME` environment variable is only a default, never a hidden
//! dependency.

use std::path::{Path, PathBuf};

use crate::StoreError;

/// Environment variable naming the ASP home directory.
pub const ASP_HOME_ENV: &str = "ASP_HOME";

/// The single global state directory of ASP.
///
/// ```text
/// $ASP_HOME/
///   store/spaces/<sha256>/   snapshots, immutable after creation
///   cache/materialized/      per-run scratch
///   sessions/{pi,codex}/     per-session harness homes
///   global-lock.json         lock for ad-hoc global runs
///   temp/                    atomic-swap staging area
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspHome {
    root: PathBuf,
}

impl AspHome {
    /// Use `root` as the home directory.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Resolve the home from `$ASP_HOME`, falling back to `~/.asp`.
    #[must_use]
    pub fn from_env() -> Self {
        if let Ok(dir) = std::env::var(ASP_HOME_ENV)
            && !dir.is_empty()
        {
            return Self::new(Path::new(&dir));
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        Self::new(&Path::new(&home).join(".asp"))
    }

    /// The home root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The snapshot store directory, `store/spaces/`.
    #[must_use]
    pub fn store_spaces(&self) -> PathBuf {
        self.root.join("store").join("spaces")
    }

    /// Per-run materialization scratch, `cache/materialized/`.
    #[must_use]
    pub fn cache_materialized(&self) -> PathBuf {
        self.root.join("cache").join("materialized")
    }

    /// Session records directory, `sessions/`.
    #[must_use]
    pub fn sessions(&self) -> PathBuf {
        self.root.join("sessions")
    }

    /// Per-harness session home, `sessions/<harness>/<hash>/`.
    #[must_use]
    pub fn session_home(&self, harness: &str, hash: &str) -> PathBuf {
        self.sessions().join(harness).join(hash)
    }

    /// The global lock path, `global-lock.json`.
    #[must_use]
    pub fn global_lock_path(&self) -> PathBuf {
        self.root.join("global-lock.json")
    }

    /// The atomic-swap staging area, `temp/`.
    #[must_use]
    pub fn temp(&self) -> PathBuf {
        self.root.join("temp")
    }

    /// Create the directory skeleton.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when a directory cannot be created.
    pub fn ensure_layout(&self) -> Result<(), StoreError> {
        for dir in [
            self.store_spaces(),
            self.cache_materialized(),
            self.sessions(),
            self.temp(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        }
        Ok(())
    }
}
