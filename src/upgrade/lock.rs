//! Advisory lock serializing installs across processes.
//!
//! Two launches of walcman can both decide a check is due and race on the
//! download and the file moves. The pipeline takes this lock before the
//! download and holds it until the state files are written. The lock is
//! released when the guard is dropped (the file handle closes).

use crate::core::UpdateError;
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Guard holding the exclusive install lock.
#[derive(Debug)]
pub struct InstallLock {
    _file: File,
    path: PathBuf,
}

impl InstallLock {
    /// Wait for and take the exclusive lock at `path`.
    ///
    /// The lock file is created if missing. Waiting happens on the blocking
    /// pool so the runtime keeps going.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Lock`] when the file cannot be opened or locked.
    pub async fn acquire(path: &Path) -> Result<Self, UpdateError> {
        let lock_path = path.to_path_buf();
        let lock_error = |reason: String| UpdateError::Lock {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| lock_error(e.to_string()))?;
        }

        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new().create(true).write(true).truncate(false).open(&lock_path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| lock_error(e.to_string()))?
        .map_err(|e| lock_error(e.to_string()))?;

        debug!("Acquired update lock at {}", path.display());
        Ok(Self {
            _file: file,
            path: path.to_path_buf(),
        })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        debug!("Releasing update lock at {}", self.path.display());
    }
}
