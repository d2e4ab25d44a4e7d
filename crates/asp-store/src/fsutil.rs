// SPDX-License-Identifier: MIT OR Apache-2.0
//! Atomic write and link-or-copy primitives.
//!
//! Every mutation of a user-visible path goes through temp-file-plus-rename
//! so a hard terminate never leaves partial state visible.

use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::StoreError;

/// Atomically replace `path` with `bytes`.
///
/// Writes to a temporary sibling and renames it over the destination.
/// When `fsync` is set, the data is flushed to disk before the rename.
///
/// # Errors
///
/// Returns [`StoreError::Io`] on any filesystem failure; the temporary file
/// is cleaned up by its guard.
pub fn write_atomic(path: &Path, bytes: &[u8], fsync: bool) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| StoreError::io(path, e))?;
    if fsync {
        tmp.as_file().sync_all().map_err(|e| StoreError::io(path, e))?;
    }
    tmp.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Atomically write `value` as pretty-printed JSON with a trailing newline.
///
/// # Errors
///
/// Returns [`StoreError::Io`] on serialization or filesystem failure.
pub fn write_json_pretty<T: Serialize>(
    path: &Path,
    value: &T,
    fsync: bool,
) -> Result<(), StoreError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|e| {
        StoreError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    bytes.push(b'\n');
    write_atomic(path, &bytes, fsync)
}

/// Hardlink `src` to `dst`, falling back to a copy across filesystems.
///
/// Symlinks are re-created rather than followed. The fallback is
/// transparent: callers cannot observe which path was taken.
///
/// # Errors
///
/// Returns [`StoreError::Io`] when both the link and the copy fail.
pub fn link_or_copy(src: &Path, dst: &Path) -> Result<(), StoreError> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let meta = std::fs::symlink_metadata(src).map_err(|e| StoreError::io(src, e))?;
    if meta.file_type().is_symlink() {
        let target = std::fs::read_link(src).map_err(|e| StoreError::io(src, e))?;
        #[cfg(unix)]
        std::os::unix::fs::symlink(&target, dst).map_err(|e| StoreError::io(dst, e))?;
        #[cfg(not(unix))]
        std::fs::copy(src, dst).map_err(|e| StoreError::io(dst, e))?;
        return Ok(());
    }

    if std::fs::hard_link(src, dst).is_ok() {
        return Ok(());
    }
    std::fs::copy(src, dst)
        .map(|_| ())
        .map_err(|e| StoreError::io(dst, e))
}

/// Recursively link-or-copy a directory tree.
///
/// # Errors
///
/// Returns [`StoreError::Io`] on any filesystem failure.
pub fn link_or_copy_tree(src: &Path, dst: &Path) -> Result<(), StoreError> {
    for entry in walkdir::WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            StoreError::io(src, std::io::Error::other(e.to_string()))
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .unwrap_or_else(|_| entry.path());
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| StoreError::io(&target, e))?;
        } else {
            link_or_copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Recursively copy a directory tree, never hardlinking.
///
/// Used in dev mode so generated content cannot alias the working tree.
///
/// # Errors
///
/// Returns [`StoreError::Io`] on any filesystem failure.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<(), StoreError> {
    for entry in walkdir::WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            StoreError::io(src, std::io::Error::other(e.to_string()))
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .unwrap_or_else(|_| entry.path());
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| StoreError::io(&target, e))?;
        } else if entry.file_type().is_symlink() {
            link_or_copy(entry.path(), &target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
            std::fs::copy(entry.path(), &target).map_err(|e| StoreError::io(&target, e))?;
        }
    }
    Ok(())
}
