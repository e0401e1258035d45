//! File system helpers for the state store and the installer.
//!
//! - [`atomic_write`] writes through a temporary sibling and renames it into
//!   place, so readers see either the old or the new content.
//! - [`move_file`] renames, falling back to copy-and-remove when the rename
//!   crosses file systems.
//! - [`make_executable`] sets the executable bits on Unix.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// The content is written to a temporary file in the target's directory,
/// synced, then renamed over the target. Parent directories are created when
/// missing.
///
/// # Examples
///
/// ```rust,no_run
/// use walcman_updater::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// atomic_write(Path::new("/tmp/walcman/VERSION"), b"1.2.0\n").await?;
/// # Ok(())
/// # }
/// ```
pub async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let path = path.to_path_buf();
    let content = content.to_vec();

    tokio::task::spawn_blocking(move || atomic_write_blocking(&path, &content))
        .await
        .context("Atomic write task panicked")?
}

fn atomic_write_blocking(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    std::fs::create_dir_all(&parent)
        .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

    let mut temp = tempfile::NamedTempFile::new_in(&parent)
        .with_context(|| format!("Failed to create temp file in: {}", parent.display()))?;

    temp.write_all(content)
        .with_context(|| format!("Failed to write to temp file for: {}", path.display()))?;
    temp.as_file().sync_all().context("Failed to sync file to disk")?;

    temp.persist(path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Moves `from` to `to`, replacing `to` if it exists.
///
/// A plain rename is tried first. If it fails for any reason other than the
/// source being missing (typically a cross-device move), the file is copied
/// and the source removed. The rename error is returned when the copy fails
/// too.
pub async fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    let rename_err = match fs::rename(from, to).await {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(e),
        Err(e) => e,
    };

    debug!(
        "Rename {} -> {} failed ({}), falling back to copy",
        from.display(),
        to.display(),
        rename_err
    );

    if fs::copy(from, to).await.is_err() {
        return Err(rename_err);
    }
    fs::remove_file(from).await
}

/// Marks a file as executable for everyone who can read it (`0o755`).
#[cfg(unix)]
pub async fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path).await?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions).await
}

/// No-op on platforms without executable bits.
#[cfg(not(unix))]
pub async fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_atomic_write_creates_parents_and_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("nested").join("VERSION");

        atomic_write(&target, b"1.0.0\n").await.unwrap();
        assert_eq!(fs::read_to_string(&target).await.unwrap(), "1.0.0\n");

        atomic_write(&target, b"1.1.0\n").await.unwrap();
        assert_eq!(fs::read_to_string(&target).await.unwrap(), "1.1.0\n");

        // Only the target is left behind, no stray temp files
        let mut entries = fs::read_dir(target.parent().unwrap()).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_move_file_replaces_destination() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("a");
        let to = temp_dir.path().join("b");
        fs::write(&from, b"new").await.unwrap();
        fs::write(&to, b"old").await.unwrap();

        move_file(&from, &to).await.unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_move_file_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let err = move_file(&temp_dir.path().join("missing"), &temp_dir.path().join("b"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_make_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bin");
        fs::write(&path, b"#!/bin/sh\n").await.unwrap();

        make_executable(&path).await.unwrap();

        let mode = fs::metadata(&path).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
