// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read-only adapter over a git checkout used as a space registry.
//!
//! Every operation shells out to `git` and never mutates the repository.

use asp_core::CommitSha;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::RegistryError;

/// Directory inside the registry that holds spaces.
pub const SPACES_DIR: &str = "spaces";

/// A read-only view of a git checkout serving as the space registry.
#[derive(Debug, Clone)]
pub struct GitRegistry {
    path: PathBuf,
}

/// Kind of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeEntryKind {
    /// A regular file blob.
    Blob,
    /// A subtree.
    Tree,
    /// A symlink blob (mode `120000`).
    Symlink,
}

/// One entry from `list_tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// File mode as git reports it (`100644`, `100755`, `120000`, `040000`).
    pub mode: String,
    /// Entry kind.
    pub kind: TreeEntryKind,
    /// Path relative to the listed prefix.
    pub path: String,
}

impl TreeEntry {
    /// Whether the executable bit is set.
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.mode == "100755"
    }
}

/// Resolve a registry source to a local checkout.
///
/// An existing directory is used directly. Anything else is treated as a
/// git URL: cloned into `cache_root/registries/<hash12>/` on first use and
/// fetched (with tags) on every later call, so tag and branch selectors see
/// the remote's current state.
///
/// # Errors
///
/// Returns [`RegistryError::Unavailable`] when the clone or fetch fails.
pub fn ensure_local_checkout(source: &str, cache_root: &Path) -> Result<PathBuf, RegistryError> {
    let as_path = Path::new(source);
    if as_path.is_dir() {
        return Ok(as_path.to_path_buf());
    }

    let hash = {
        use sha2::{Digest, Sha256};
        format!("{:x}", Sha256::digest(source.as_bytes()))
    };
    let checkout = cache_root.join("registries").join(&hash[..12]);

    if checkout.join(".git").exists() {
        debug!(source, checkout = %checkout.display(), "fetching registry");
        run_git_in(&checkout, &["fetch", "--tags", "--force", "origin"])?;
        run_git_in(&checkout, &["reset", "--hard", "origin/HEAD"])?;
        return Ok(checkout);
    }

    if let Some(parent) = checkout.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RegistryError::Unavailable {
            path: parent.display().to_string(),
            reason: e.to_string(),
        })?;
    }
    debug!(source, checkout = %checkout.display(), "cloning registry");
    let out = Command::new("git")
        .args(["clone", "--quiet", source])
        .arg(&checkout)
        .output()
        .map_err(|e| RegistryError::Unavailable {
            path: source.into(),
            reason: format!("failed to spawn git: {e}"),
        })?;
    if !out.status.success() {
        return Err(RegistryError::Unavailable {
            path: source.into(),
            reason: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
        });
    }
    Ok(checkout)
}

fn run_git_in(dir: &Path, args: &[&str]) -> Result<(), RegistryError> {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| RegistryError::Unavailable {
            path: dir.display().to_string(),
            reason: format!("failed to spawn git: {e}"),
        })?;
    if !out.status.success() {
        return Err(RegistryError::Git {
            command: args.first().copied().unwrap_or("git").to_owned(),
            reason: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
        });
    }
    Ok(())
}

impl GitRegistry {
    /// Open the registry checkout at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unavailable`] when `path` does not exist or
    /// is not inside a git work tree.
    pub fn open(path: &Path) -> Result<Self, RegistryError> {
        if !path.is_dir() {
            return Err(RegistryError::Unavailable {
                path: path.display().to_string(),
                reason: "not a directory".into(),
            });
        }
        let registry = Self {
            path: path.to_path_buf(),
        };
        let inside = registry.run_git(&["rev-parse", "--is-inside-work-tree"])?;
        if inside.trim() != "true" {
            return Err(RegistryError::Unavailable {
                path: path.display().to_string(),
                reason: "not a git work tree".into(),
            });
        }
        Ok(registry)
    }

    /// The registry checkout path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The working-copy directory of a space, used by dev selectors.
    #[must_use]
    pub fn space_dir(&self, id: &str) -> PathBuf {
        self.path.join(SPACES_DIR).join(id)
    }

    /// The in-repository path of a space, e.g. `spaces/base`.
    #[must_use]
    pub fn space_path(id: &str) -> String {
        format!("{SPACES_DIR}/{id}")
    }

    /// List every tag name in the registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Git`] when the invocation fails.
    pub fn list_tags(&self) -> Result<Vec<String>, RegistryError> {
        let out = self.run_git(&["tag", "--list"])?;
        Ok(out.lines().map(str::to_owned).collect())
    }

    /// Resolve a tag name to its commit.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Git`] when the tag does not exist.
    pub fn resolve_tag(&self, tag: &str) -> Result<CommitSha, RegistryError> {
        self.rev_parse(&format!("refs/tags/{tag}"))
    }

    /// Resolve a branch name to its tip commit.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Git`] when the branch does not exist.
    pub fn resolve_branch(&self, branch: &str) -> Result<CommitSha, RegistryError> {
        self.rev_parse(&format!("refs/heads/{branch}"))
    }

    /// Verify a commit exists, returning its full sha.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Git`] when the object is missing or not a
    /// commit.
    pub fn verify_commit(&self, sha: &str) -> Result<CommitSha, RegistryError> {
        self.rev_parse(sha)
    }

    /// Read a blob at `commit:path`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Git`] when the path does not exist at the
    /// commit.
    pub fn read_blob(&self, commit: &str, path: &str) -> Result<Vec<u8>, RegistryError> {
        self.run_git_bytes(&["show", &format!("{commit}:{path}")])
    }

    /// Recursively list the tree under `commit:prefix`.
    ///
    /// Paths in the result are relative to `prefix`. Only blobs and symlinks
    /// are returned; git reports files recursively so subtrees never appear.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Git`] when the prefix does not exist at the
    /// commit.
    pub fn list_tree(&self, commit: &str, prefix: &str) -> Result<Vec<TreeEntry>, RegistryError> {
        let spec = format!("{commit}:{prefix}");
        let out = self.run_git_bytes(&["ls-tree", "-r", "-z", &spec])?;
        let mut entries = Vec::new();
        for record in out.split(|b| *b == 0) {
            if record.is_empty() {
                continue;
            }
            let text = String::from_utf8_lossy(record);
            // "<mode> <type> <sha>\t<path>"
            let Some((meta, path)) = text.split_once('\t') else {
                continue;
            };
            let mut fields = meta.split_whitespace();
            let (Some(mode), Some(kind)) = (fields.next(), fields.next()) else {
                continue;
            };
            let kind = match (mode, kind) {
                ("120000", _) => TreeEntryKind::Symlink,
                (_, "blob") => TreeEntryKind::Blob,
                (_, "tree") => TreeEntryKind::Tree,
                _ => continue,
            };
            entries.push(TreeEntry {
                mode: mode.to_owned(),
                kind,
                path: path.to_owned(),
            });
        }
        Ok(entries)
    }

    /// Whether the working tree has uncommitted changes.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Git`] when the status probe fails.
    pub fn is_dirty(&self) -> Result<bool, RegistryError> {
        let out = self.run_git(&["status", "--porcelain=v1"])?;
        Ok(!out.trim().is_empty())
    }

    fn rev_parse(&self, spec: &str) -> Result<CommitSha, RegistryError> {
        let out = self.run_git(&["rev-parse", "--verify", &format!("{spec}^{{commit}}")])?;
        CommitSha::new(out.trim()).map_err(|e| RegistryError::Git {
            command: "rev-parse".into(),
            reason: e.to_string(),
        })
    }

    fn run_git(&self, args: &[&str]) -> Result<String, RegistryError> {
        let bytes = self.run_git_bytes(args)?;
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }

    fn run_git_bytes(&self, args: &[&str]) -> Result<Vec<u8>, RegistryError> {
        debug!(?args, registry = %self.path.display(), "git");
        let out = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .map_err(|e| RegistryError::Unavailable {
                path: self.path.display().to_string(),
                reason: format!("failed to spawn git: {e}"),
            })?;

        if !out.status.success() {
            return Err(RegistryError::Git {
                command: args.first().copied().unwrap_or("git").to_owned(),
                reason: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
            });
        }
        Ok(out.stdout)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
