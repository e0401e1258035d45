use crate::constants::{
    BACKUP_SUFFIX, BINARY_NAME, CONFIG_DIR, CONFIG_FILE, DEBUG_LOG_FILE, ENV_CONFIG_DIR,
    LAST_CHECK_FILE, LOCK_FILE, TEMP_DOWNLOAD_FILE, VERSION_FILE,
};
use crate::core::UpdateError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Fixed on-disk layout of a walcman installation.
///
/// Everything lives in the per-user configuration directory
/// (`~/.config/walcman` by default):
///
/// ```text
/// ~/.config/walcman/
/// ├── walcman             live binary
/// ├── walcman.backup      previous binary, kept after an update
/// ├── .walcman.update     temporary download
/// ├── VERSION             installed version
/// ├── config              user settings
/// ├── .last_check         epoch seconds of the last completed check
/// ├── .update.log         debug log of the background worker
/// └── .update.lock        advisory install lock
/// ```
///
/// The paths are computed once and never change for the lifetime of the
/// process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallationPaths {
    config_dir: PathBuf,
    live_binary: PathBuf,
    backup_binary: PathBuf,
    temp_download: PathBuf,
}

impl InstallationPaths {
    /// Lay out an installation rooted at `config_dir`.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            live_binary: config_dir.join(BINARY_NAME),
            backup_binary: config_dir.join(format!("{BINARY_NAME}{BACKUP_SUFFIX}")),
            temp_download: config_dir.join(TEMP_DOWNLOAD_FILE),
            config_dir,
        }
    }

    /// Resolve the configuration directory.
    ///
    /// Precedence: the explicit override, then `WALCMAN_CONFIG_DIR`, then
    /// `~/.config/walcman`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Paths`] when no override is given and the home
    /// directory cannot be determined.
    pub fn resolve(override_dir: Option<&Path>) -> Result<Self, UpdateError> {
        if let Some(dir) = override_dir {
            return Ok(Self::new(dir));
        }

        if let Some(dir) = std::env::var_os(ENV_CONFIG_DIR).filter(|v| !v.is_empty()) {
            return Ok(Self::new(PathBuf::from(dir)));
        }

        let home = dirs::home_dir().ok_or_else(|| UpdateError::Paths {
            reason: "home directory is not set".to_string(),
        })?;
        Ok(Self::new(home.join(CONFIG_DIR)))
    }

    /// Configuration directory all other paths live in.
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// The executable that gets replaced.
    pub fn live_binary(&self) -> &Path {
        &self.live_binary
    }

    /// Where the previous executable is kept.
    pub fn backup_binary(&self) -> &Path {
        &self.backup_binary
    }

    /// Where new builds are downloaded to before installation.
    pub fn temp_download(&self) -> &Path {
        &self.temp_download
    }

    /// Installed version record.
    pub fn version_file(&self) -> PathBuf {
        self.config_dir.join(VERSION_FILE)
    }

    /// User settings.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Timestamp of the last completed check.
    pub fn last_check_file(&self) -> PathBuf {
        self.config_dir.join(LAST_CHECK_FILE)
    }

    /// Worker debug log.
    pub fn debug_log_file(&self) -> PathBuf {
        self.config_dir.join(DEBUG_LOG_FILE)
    }

    /// Advisory install lock.
    pub fn lock_file(&self) -> PathBuf {
        self.config_dir.join(LOCK_FILE)
    }
}
