use crate::core::InstallError;
use crate::upgrade::paths::InstallationPaths;
use crate::utils::fs::{make_executable, move_file};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Swaps a downloaded binary into the live location.
///
/// The swap is two moves, strictly ordered:
///
/// 1. live → backup. On failure nothing has been touched.
/// 2. temp → live. On failure the backup is moved back to the live path and
///    [`InstallError::Replace`] is returned whether or not that worked.
/// 3. The new live file is marked executable.
///
/// # Residual risk
///
/// Between steps 1 and 2 only the backup exists. If step 2 fails and the
/// restoring move fails as well, there is no binary at the live path at all;
/// [`InstallError::Replace::restored`] is `false` in that case and the
/// previous build is still at the backup path. The restoration is not
/// re-verified after it reports success.
///
/// # Examples
///
/// ```rust,no_run
/// use walcman_updater::upgrade::installer::BinaryInstaller;
/// use std::path::{Path, PathBuf};
///
/// # async fn example() -> anyhow::Result<()> {
/// let installer = BinaryInstaller::new(
///     PathBuf::from("/home/u/.config/walcman/walcman"),
///     PathBuf::from("/home/u/.config/walcman/walcman.backup"),
/// );
/// installer.install(Path::new("/home/u/.config/walcman/.walcman.update")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BinaryInstaller {
    live_path: PathBuf,
    backup_path: PathBuf,
}

impl BinaryInstaller {
    /// Installer replacing `live_path`, keeping the previous build at `backup_path`.
    pub fn new(live_path: PathBuf, backup_path: PathBuf) -> Self {
        Self {
            live_path,
            backup_path,
        }
    }

    /// Installer for the standard layout of `paths`.
    pub fn for_paths(paths: &InstallationPaths) -> Self {
        Self::new(paths.live_binary().to_path_buf(), paths.backup_binary().to_path_buf())
    }

    /// Replace the live binary with `temp_path`.
    ///
    /// # Errors
    ///
    /// - [`InstallError::Backup`] when the live binary cannot be moved aside
    /// - [`InstallError::Replace`] when the new binary cannot be moved into place
    pub async fn install(&self, temp_path: &Path) -> Result<(), InstallError> {
        info!("Moving {} to {}", self.live_path.display(), self.backup_path.display());
        move_file(&self.live_path, &self.backup_path).await.map_err(|source| {
            InstallError::Backup {
                live: self.live_path.clone(),
                backup: self.backup_path.clone(),
                source,
            }
        })?;

        info!("Moving {} to {}", temp_path.display(), self.live_path.display());
        if let Err(source) = move_file(temp_path, &self.live_path).await {
            warn!("Installing new binary failed ({source}), restoring previous binary");

            let restored = match move_file(&self.backup_path, &self.live_path).await {
                Ok(()) => true,
                Err(e) => {
                    error!(
                        "Failed to restore {} to {}: {e}",
                        self.backup_path.display(),
                        self.live_path.display()
                    );
                    false
                }
            };

            return Err(InstallError::Replace {
                temp: temp_path.to_path_buf(),
                live: self.live_path.clone(),
                restored,
                source,
            });
        }

        if let Err(e) = make_executable(&self.live_path).await {
            warn!("Failed to mark {} executable: {e}", self.live_path.display());
        }

        Ok(())
    }

    /// Put the backup back in place of the live binary.
    ///
    /// The current live binary, if any, is overwritten.
    ///
    /// # Errors
    ///
    /// - [`InstallError::NoBackup`] when there is nothing to restore
    /// - [`InstallError::Restore`] when the move fails
    pub async fn rollback(&self) -> Result<(), InstallError> {
        if !self.backup_exists() {
            return Err(InstallError::NoBackup {
                backup: self.backup_path.clone(),
            });
        }

        warn!("Restoring {} from {}", self.live_path.display(), self.backup_path.display());
        move_file(&self.backup_path, &self.live_path).await.map_err(|source| {
            InstallError::Restore {
                backup: self.backup_path.clone(),
                live: self.live_path.clone(),
                source,
            }
        })?;

        if let Err(e) = make_executable(&self.live_path).await {
            warn!("Failed to mark {} executable: {e}", self.live_path.display());
        }

        Ok(())
    }

    /// Whether a previous build is kept at the backup path.
    pub fn backup_exists(&self) -> bool {
        self.backup_path.exists()
    }

    /// Live binary path.
    pub fn live_path(&self) -> &Path {
        &self.live_path
    }

    /// Backup path.
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }
}
