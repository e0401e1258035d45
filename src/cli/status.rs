//! The `status` command.

use crate::upgrade::config::UpdateConfig;
use crate::upgrade::debug_log::{DebugLog, DebugLogEntry};
use crate::upgrade::installer::BinaryInstaller;
use crate::upgrade::paths::InstallationPaths;
use crate::upgrade::pipeline::format_epoch;
use crate::upgrade::state::StateStore;
use crate::upgrade::throttle::should_check;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Show update state and settings.
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,

    /// Include the last N debug log entries
    #[arg(long, value_name = "N")]
    pub log: Option<usize>,
}

/// Everything `status` reports.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Installation directory
    pub config_dir: PathBuf,
    /// Content of `VERSION`, `None` when unreadable
    pub installed_version: Option<String>,
    /// Effective settings
    pub config: UpdateConfig,
    /// Epoch seconds of the last completed check
    pub last_check: Option<i64>,
    /// Epoch seconds when the next check becomes due
    pub next_check_due: Option<i64>,
    /// Whether a check would run now
    pub check_due: bool,
    /// Whether `<name>.backup` exists
    pub backup_available: bool,
    /// Most recent debug log entries, oldest first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<DebugLogEntry>,
}

impl StatusReport {
    /// Gather the report for the installation at `paths`.
    ///
    /// # Errors
    ///
    /// Fails only when the debug log exists but cannot be read.
    pub async fn collect(paths: &InstallationPaths, log_entries: usize) -> Result<Self> {
        let config = UpdateConfig::load_or_default(&paths.config_file()).await;
        let state = StateStore::new(paths);
        let check_state = state.check_state(&config).await;

        let log = if log_entries > 0 {
            DebugLog::new(paths.debug_log_file()).tail(log_entries).await?
        } else {
            Vec::new()
        };

        Ok(Self {
            config_dir: paths.config_dir().to_path_buf(),
            installed_version: state.read_local_version().await.ok(),
            config,
            last_check: check_state.last_check,
            next_check_due: check_state.next_due(),
            check_due: should_check(&check_state, Utc::now().timestamp()),
            backup_available: BinaryInstaller::for_paths(paths).backup_exists(),
            log,
        })
    }

    fn print(&self) {
        println!("{} {}", "Installation:".bold(), self.config_dir.display());
        match &self.installed_version {
            Some(version) => println!("{} {version}", "Installed version:".bold()),
            None => println!("{} {}", "Installed version:".bold(), "unknown".red()),
        }

        let enabled = if self.config.enabled { "enabled".green() } else { "disabled".yellow() };
        println!(
            "{} {enabled}, every {}h",
            "Update checks:".bold(),
            self.config.check_interval_hours
        );

        let last = self.last_check.map_or_else(|| "never".to_string(), format_epoch);
        println!("{} {last}", "Last check:".bold());
        let next = if self.check_due {
            "due now".cyan().to_string()
        } else {
            self.next_check_due.map_or_else(|| "-".to_string(), format_epoch)
        };
        println!("{} {next}", "Next check:".bold());
        println!(
            "{} {}",
            "Backup:".bold(),
            if self.backup_available { "available" } else { "none" }
        );

        if !self.log.is_empty() {
            println!("\n{}", "Recent update log:".bold());
            for entry in &self.log {
                match entry.timestamp {
                    Some(ts) => println!("  {} {}", format_epoch(ts).dimmed(), entry.message),
                    None => println!("  {}", entry.message),
                }
            }
        }
    }
}

impl StatusCommand {
    /// Print the status report.
    ///
    /// # Errors
    ///
    /// Fails when the installation directory cannot be resolved or the report
    /// cannot be gathered.
    pub async fn execute(self, config_dir: Option<&Path>) -> Result<()> {
        let paths = InstallationPaths::resolve(config_dir)?;
        let report = StatusReport::collect(&paths, self.log.unwrap_or(0)).await?;

        if self.json {
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialize status")?;
            println!("{json}");
        } else {
            report.print();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::InstallFixture;

    #[tokio::test]
    async fn test_collect_fresh_installation() {
        let fixture = InstallFixture::new("1.0.0").await.unwrap();

        let report = StatusReport::collect(&fixture.paths, 5).await.unwrap();

        assert_eq!(report.installed_version.as_deref(), Some("1.0.0"));
        assert_eq!(report.config, UpdateConfig::default());
        assert_eq!(report.last_check, None);
        assert!(report.check_due);
        assert!(!report.backup_available);
        assert!(report.log.is_empty());
    }

    #[tokio::test]
    async fn test_collect_reads_state() {
        let fixture = InstallFixture::new("1.1.0").await.unwrap();
        fixture.write_config("update_check_enabled=0\ncheck_interval_hours=6\n").await.unwrap();
        fixture.write_last_check(1_000).await.unwrap();
        tokio::fs::write(fixture.paths.backup_binary(), b"old").await.unwrap();
        let log = DebugLog::new(fixture.paths.debug_log_file());
        log.append("fetch failed: boom").await.unwrap();
        log.append("updated 1.0.0 -> 1.1.0").await.unwrap();

        let report = StatusReport::collect(&fixture.paths, 1).await.unwrap();

        assert!(!report.config.enabled);
        assert_eq!(report.config.check_interval_hours, 6);
        assert_eq!(report.last_check, Some(1_000));
        assert!(!report.check_due);
        assert!(report.backup_available);
        assert_eq!(report.log.len(), 1);
        assert_eq!(report.log[0].message, "updated 1.0.0 -> 1.1.0");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["installed_version"], "1.1.0");
        assert_eq!(json["config"]["enabled"], false);
    }
}
