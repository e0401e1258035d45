//! Release documents and on-disk installations for tests.

use crate::constants::MIN_ARTIFACT_SIZE;
use crate::upgrade::config::UpdateConfig;
use crate::upgrade::paths::InstallationPaths;
use crate::upgrade::pipeline::UpdateSnapshot;
use anyhow::{Context, Result};
use std::path::Path;
use tempfile::TempDir;
use tokio::fs;

/// Content of the live binary created by [`InstallFixture`].
pub const OLD_BINARY: &[u8] = b"#!/bin/sh\necho walcman old build\n";

/// A release document shaped like the GitHub "latest release" response.
///
/// `name` is the platform-qualified label `Linux-<tag>`. With `download_url`
/// set the document carries one asset; without it `assets` is empty.
pub fn release_body(tag: &str, download_url: Option<&str>) -> String {
    let assets = download_url.map_or_else(String::new, |url| {
        format!(
            r#"
    {{
      "name": "walcman-linux-x86_64",
      "content_type": "application/octet-stream",
      "size": 1048576,
      "browser_download_url": "{url}"
    }}
  "#
        )
    });

    format!(
        r#"{{
  "url": "https://api.github.com/repos/lassedtu/walcman/releases/1",
  "html_url": "https://github.com/lassedtu/walcman/releases/tag/{tag}",
  "tag_name": "{tag}",
  "target_commitish": "main",
  "name": "Linux-{tag}",
  "draft": false,
  "prerelease": false,
  "assets": [{assets}],
  "body": "Bug fixes and improvements"
}}"#
    )
}

/// A binary payload large enough to pass the plausibility check.
pub fn artifact(marker: &str) -> Vec<u8> {
    let mut bytes = format!("#!/bin/sh\necho walcman {marker}\n").into_bytes();
    bytes.resize(MIN_ARTIFACT_SIZE as usize + 1024, b'#');
    bytes
}

/// A walcman installation in a temporary configuration directory.
///
/// Created with a `VERSION` record and a live binary; `config`,
/// `.last_check` and the debug log are absent until written.
pub struct InstallFixture {
    /// Keeps the directory alive
    pub temp_dir: TempDir,
    /// Layout inside `temp_dir`
    pub paths: InstallationPaths,
}

impl InstallFixture {
    /// Installation at `version` with [`OLD_BINARY`] as live binary.
    pub async fn new(version: &str) -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temp dir")?;
        let paths = InstallationPaths::new(temp_dir.path().join("walcman"));

        fs::create_dir_all(paths.config_dir()).await?;
        fs::write(paths.version_file(), format!("{version}\n")).await?;
        fs::write(paths.live_binary(), OLD_BINARY).await?;

        Ok(Self {
            temp_dir,
            paths,
        })
    }

    /// Configuration directory.
    pub fn dir(&self) -> &Path {
        self.paths.config_dir()
    }

    /// Write the `config` file.
    pub async fn write_config(&self, content: &str) -> Result<()> {
        fs::write(self.paths.config_file(), content).await.context("Failed to write config")
    }

    /// Write `.last_check`.
    pub async fn write_last_check(&self, epoch: i64) -> Result<()> {
        fs::write(self.paths.last_check_file(), format!("{epoch}\n"))
            .await
            .context("Failed to write .last_check")
    }

    /// Raw `.last_check` content, `None` when absent.
    pub async fn last_check(&self) -> Option<String> {
        fs::read_to_string(self.paths.last_check_file()).await.ok()
    }

    /// Raw `VERSION` content.
    pub async fn version(&self) -> Result<String> {
        fs::read_to_string(self.paths.version_file()).await.context("Failed to read VERSION")
    }

    /// Live binary content.
    pub async fn live_binary(&self) -> Result<Vec<u8>> {
        fs::read(self.paths.live_binary()).await.context("Failed to read live binary")
    }

    /// Backup binary content, `None` when absent.
    pub async fn backup_binary(&self) -> Option<Vec<u8>> {
        fs::read(self.paths.backup_binary()).await.ok()
    }

    /// Debug log content, empty when absent.
    pub async fn debug_log(&self) -> String {
        fs::read_to_string(self.paths.debug_log_file()).await.unwrap_or_default()
    }

    /// Snapshot over this installation, reading `config` like a real run.
    pub async fn snapshot(&self, release_url: &str) -> UpdateSnapshot {
        let config = UpdateConfig::load_or_default(&self.paths.config_file()).await;
        UpdateSnapshot::new(self.paths.clone(), config, release_url.to_string())
    }
}
