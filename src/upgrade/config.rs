use crate::constants::DEFAULT_CHECK_INTERVAL_HOURS;
use crate::core::UpdateError;
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// User-editable settings controlling background update checks.
///
/// Read from the line-oriented `config` file in the walcman configuration
/// directory. Only two keys are recognized:
///
/// ```text
/// # walcman configuration
/// update_check_enabled=1
/// check_interval_hours=24
/// ```
///
/// Blank lines and `#` comments are ignored, keys and values are trimmed, and
/// the last occurrence of a key wins. Unknown keys belong to other parts of
/// walcman and are skipped. A value that does not parse leaves that setting
/// at its default, so a half-broken file never disables checking by accident.
///
/// # Examples
///
/// ```rust,no_run
/// use walcman_updater::upgrade::config::UpdateConfig;
///
/// let config = UpdateConfig::parse("update_check_enabled=0\n");
/// assert!(!config.enabled);
/// assert_eq!(config.check_interval_hours, 24);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateConfig {
    /// Whether background checks run at all.
    ///
    /// # Default: `true`
    pub enabled: bool,

    /// Minimum time between two checks, in hours.
    ///
    /// # Default: `24`
    pub check_interval_hours: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_hours: DEFAULT_CHECK_INTERVAL_HOURS,
        }
    }
}

/// Key enabling or disabling background checks (`0`/`1`).
pub const KEY_ENABLED: &str = "update_check_enabled";

/// Key holding the check interval in whole hours.
pub const KEY_INTERVAL_HOURS: &str = "check_interval_hours";

impl UpdateConfig {
    /// Parse `key=value` configuration text, keeping defaults for anything
    /// missing or malformed.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                debug!("Ignoring config line without '=': {line:?}");
                continue;
            };

            match (key.trim(), value.trim()) {
                (KEY_ENABLED, value) => match parse_flag(value) {
                    Some(enabled) => config.enabled = enabled,
                    None => debug!("Ignoring invalid {KEY_ENABLED} value: {value:?}"),
                },
                (KEY_INTERVAL_HOURS, value) => match value.parse::<u64>() {
                    Ok(hours) if hours > 0 => config.check_interval_hours = hours,
                    _ => debug!("Ignoring invalid {KEY_INTERVAL_HOURS} value: {value:?}"),
                },
                _ => {}
            }
        }

        config
    }

    /// Read and parse the configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::ConfigUnavailable`] when the file is missing or
    /// unreadable. Content problems never fail; see [`UpdateConfig::parse`].
    pub async fn load_from(path: &Path) -> Result<Self, UpdateError> {
        let content =
            fs::read_to_string(path).await.map_err(|e| UpdateError::ConfigUnavailable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(Self::parse(&content))
    }

    /// Read the configuration file, falling back to defaults on any error.
    ///
    /// This is what the pipeline uses: configuration problems must never
    /// block or fail a check.
    pub async fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path).await {
            Ok(config) => config,
            Err(e) => {
                debug!("{e}; using default update settings");
                Self::default()
            }
        }
    }

    /// Check interval converted to seconds.
    #[must_use]
    pub const fn interval_seconds(&self) -> u64 {
        self.check_interval_hours.saturating_mul(3600)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = UpdateConfig::default();
        assert!(config.enabled);
        assert_eq!(config.check_interval_hours, 24);
        assert_eq!(config.interval_seconds(), 86400);
    }

    #[test]
    fn test_parse_recognized_keys() {
        let config = UpdateConfig::parse(
            "# comment\n\nvolume=80\nupdate_check_enabled = 0\ncheck_interval_hours= 6 \n",
        );
        assert!(!config.enabled);
        assert_eq!(config.check_interval_hours, 6);
    }

    #[test]
    fn test_parse_invalid_values_keep_defaults() {
        let config = UpdateConfig::parse(
            "update_check_enabled=maybe\ncheck_interval_hours=0\ncheck_interval_hours=-3\n",
        );
        assert_eq!(config, UpdateConfig::default());

        let config = UpdateConfig::parse("check_interval_hours=soon\ngarbage line\n");
        assert_eq!(config, UpdateConfig::default());
    }

    #[test]
    fn test_parse_last_value_wins() {
        let config = UpdateConfig::parse("update_check_enabled=0\nupdate_check_enabled=1\n");
        assert!(config.enabled);
    }

    #[tokio::test]
    async fn test_missing_file_is_config_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");

        let err = UpdateConfig::load_from(&path).await.unwrap_err();
        assert_eq!(err.stage(), "config");

        assert_eq!(UpdateConfig::load_or_default(&path).await, UpdateConfig::default());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config");
        fs::write(&path, "check_interval_hours=48\n").await.unwrap();

        let config = UpdateConfig::load_or_default(&path).await;
        assert!(config.enabled);
        assert_eq!(config.check_interval_hours, 48);
    }
}
