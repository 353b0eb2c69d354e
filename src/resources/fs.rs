//! File hashing, backups, and ignore-aware directory traversal.

use anyhow::{Context as _, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension appended to a file's name when it is backed up before being
/// overwritten (`.bashrc` becomes `.bashrc.backup`).
pub const BACKUP_SUFFIX: &str = "backup";

/// Compute the lowercase hex SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn file_sha256(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let bytes =
        std::fs::read(path).with_context(|| format!("reading {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(hex)
}

/// Whether two files have identical content. A missing file on either side
/// compares unequal; two missing files compare equal.
///
/// # Errors
///
/// Returns an error if either existing file cannot be read.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    match (a.is_file(), b.is_file()) {
        (false, false) => Ok(true),
        (true, true) => Ok(file_sha256(a)? == file_sha256(b)?),
        _ => Ok(false),
    }
}

/// The sibling path a backup of `target` is written to.
#[must_use]
pub fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map_or_else(
        || std::ffi::OsString::from(BACKUP_SUFFIX),
        std::ffi::OsStr::to_os_string,
    );
    name.push(".");
    name.push(BACKUP_SUFFIX);
    target.with_file_name(name)
}

/// Copy `target` to its backup sibling if it exists as a regular file.
/// Returns the backup path when one was written.
///
/// # Errors
///
/// Returns an error if the copy fails.
pub fn backup_file(target: &Path) -> Result<Option<PathBuf>> {
    if !target.is_file() {
        return Ok(None);
    }
    let backup = backup_path(target);
    std::fs::copy(target, &backup).with_context(|| {
        format!("backing up {} to {}", target.display(), backup.display())
    })?;
    Ok(Some(backup))
}

/// Copy a file, creating parent directories of the destination as needed.
///
/// # Errors
///
/// Returns an error if a directory or the file itself cannot be created.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    std::fs::copy(src, dst)
        .with_context(|| format!("copying {} to {}", src.display(), dst.display()))?;
    Ok(())
}

/// Whether a slash-separated relative path matches any ignore pattern.
#[must_use]
pub fn is_ignored(rel: &str, ignored: &[Regex]) -> bool {
    ignored.iter().any(|pattern| pattern.is_match(rel))
}

/// Collect the regular files under `root`, as paths relative to `root`,
/// excluding any whose slash-separated relative path matches an ignore
/// pattern. Results are sorted for deterministic processing order.
///
/// # Errors
///
/// Returns an error if the directory walk fails.
pub fn walk_files(root: &Path, ignored: &[Regex]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry =
            entry.with_context(|| format!("walking directory {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        let rel_str = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if is_ignored(&rel_str, ignored) {
            continue;
        }
        files.push(rel);
    }
    Ok(files)
}
