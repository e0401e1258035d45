use crate::constants::{DEBUG_LOG_ROTATED_SUFFIX, MAX_DEBUG_LOG_LEN};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// One line of the debug log: `[<epoch seconds>] <message>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugLogEntry {
    /// Unix epoch seconds, `None` for lines not written by the updater
    pub timestamp: Option<i64>,
    /// Free-form message
    pub message: String,
}

impl DebugLogEntry {
    /// Create an entry stamped with the current time.
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Some(Utc::now().timestamp()),
            message: message.into(),
        }
    }

    /// Parse a log line. Lines without a valid `[epoch]` prefix are kept
    /// whole as the message.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let parsed = line.strip_prefix('[').and_then(|rest| {
            let (stamp, message) = rest.split_once("] ")?;
            Some((stamp.parse::<i64>().ok()?, message))
        });

        match parsed {
            Some((timestamp, message)) => Self {
                timestamp: Some(timestamp),
                message: message.to_string(),
            },
            None => Self {
                timestamp: None,
                message: line.to_string(),
            },
        }
    }
}

impl fmt::Display for DebugLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.timestamp {
            Some(timestamp) => write!(f, "[{timestamp}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Append-only diagnostics file of the background worker.
///
/// The worker has no stdout or stderr, so this is the only place its
/// failures become visible. Before an append, a log larger than 1 MiB is
/// moved to `<name>.1`, replacing any older rotation, so the file cannot grow
/// without bound.
#[derive(Debug, Clone)]
pub struct DebugLog {
    path: PathBuf,
}

impl DebugLog {
    /// Debug log stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a message stamped with the current time.
    pub async fn append(&self, message: impl Into<String>) -> Result<()> {
        self.append_entry(&DebugLogEntry::now(message)).await
    }

    /// Append a prepared entry.
    pub async fn append_entry(&self, entry: &DebugLogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }

        self.rotate_if_needed().await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open debug log: {}", self.path.display()))?;

        file.write_all(format!("{entry}\n").as_bytes())
            .await
            .with_context(|| format!("Failed to append to debug log: {}", self.path.display()))?;
        file.flush().await.context("Failed to flush debug log")?;

        Ok(())
    }

    /// Return up to `count` of the most recent entries, oldest first.
    ///
    /// Only the current file is read, not the rotated one. A missing log
    /// yields no entries.
    pub async fn tail(&self, count: usize) -> Result<Vec<DebugLogEntry>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read debug log: {}", self.path.display()));
            }
        };

        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(count);
        Ok(lines[start..].iter().map(|line| DebugLogEntry::parse(line)).collect())
    }

    fn rotated_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(DEBUG_LOG_ROTATED_SUFFIX);
        self.path.with_file_name(name)
    }

    async fn rotate_if_needed(&self) -> Result<()> {
        let len = match fs::metadata(&self.path).await {
            Ok(metadata) => metadata.len(),
            Err(_) => return Ok(()),
        };

        if len < MAX_DEBUG_LOG_LEN {
            return Ok(());
        }

        let rotated = self.rotated_path();
        debug!("Rotating debug log ({len} bytes) to {}", rotated.display());
        fs::rename(&self.path, &rotated)
            .await
            .with_context(|| format!("Failed to rotate debug log to {}", rotated.display()))
    }
}
