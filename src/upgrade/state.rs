use crate::constants::MAX_VERSION_LEN;
use crate::core::UpdateError;
use crate::upgrade::config::UpdateConfig;
use crate::upgrade::paths::InstallationPaths;
use crate::upgrade::throttle::CheckState;
use crate::utils::fs::atomic_write;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Reads and writes the small state files of an installation.
///
/// - `VERSION` holds the installed version on its first line.
/// - `.last_check` holds the epoch seconds of the last completed check.
///
/// Writes go through [`atomic_write`] so a crash never leaves a torn file.
/// Reads of `.last_check` are tolerant: anything unreadable means "no prior
/// check", which makes a check due rather than blocking updates forever.
#[derive(Debug, Clone)]
pub struct StateStore {
    version_file: PathBuf,
    last_check_file: PathBuf,
}

impl StateStore {
    /// State store for the given installation.
    pub fn new(paths: &InstallationPaths) -> Self {
        Self {
            version_file: paths.version_file(),
            last_check_file: paths.last_check_file(),
        }
    }

    /// Read the installed version.
    ///
    /// Only the first line is used, trimmed. Versions longer than the
    /// metadata bound are cut at that bound on a character boundary.
    ///
    /// # Errors
    ///
    /// [`UpdateError::LocalState`] when the file is missing, unreadable or
    /// empty.
    pub async fn read_local_version(&self) -> Result<String, UpdateError> {
        let content = fs::read_to_string(&self.version_file).await.map_err(|e| {
            UpdateError::LocalState {
                path: self.version_file.clone(),
                reason: e.to_string(),
            }
        })?;

        let version = content.lines().next().unwrap_or_default().trim();
        if version.is_empty() {
            return Err(UpdateError::LocalState {
                path: self.version_file.clone(),
                reason: "version record is empty".to_string(),
            });
        }

        Ok(truncate_chars(version, MAX_VERSION_LEN).to_string())
    }

    /// Record a newly installed version.
    ///
    /// # Errors
    ///
    /// [`UpdateError::LocalState`] when the record cannot be written.
    pub async fn write_local_version(&self, version: &str) -> Result<(), UpdateError> {
        atomic_write(&self.version_file, format!("{version}\n").as_bytes()).await.map_err(|e| {
            UpdateError::LocalState {
                path: self.version_file.clone(),
                reason: format!("{e:#}"),
            }
        })
    }

    /// Epoch seconds of the last completed check, if one is recorded.
    pub async fn read_last_check(&self) -> Option<i64> {
        let content = match fs::read_to_string(&self.last_check_file).await {
            Ok(content) => content,
            Err(e) => {
                debug!("No last-check record at {}: {e}", self.last_check_file.display());
                return None;
            }
        };

        match content.trim().parse::<i64>() {
            Ok(epoch) => Some(epoch),
            Err(_) => {
                debug!("Ignoring malformed last-check record: {:?}", content.trim());
                None
            }
        }
    }

    /// Record that a check completed at `epoch`.
    ///
    /// # Errors
    ///
    /// [`UpdateError::LocalState`] when the record cannot be written.
    pub async fn record_check(&self, epoch: i64) -> Result<(), UpdateError> {
        atomic_write(&self.last_check_file, format!("{epoch}\n").as_bytes()).await.map_err(|e| {
            UpdateError::LocalState {
                path: self.last_check_file.clone(),
                reason: format!("{e:#}"),
            }
        })
    }

    /// Assemble the throttle state from `config` and the persisted timestamp.
    pub async fn check_state(&self, config: &UpdateConfig) -> CheckState {
        CheckState {
            last_check: self.read_last_check().await,
            interval_seconds: config.interval_seconds(),
            enabled: config.enabled,
        }
    }
}

fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
