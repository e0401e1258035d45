//! The update pipeline, from throttle gate to state update.
//!
//! ```text
//! throttle gate ── disabled / not due ──────────────▶ Outcome::Disabled / NotDue
//!      │
//! fetch release ─▶ extract version ─▶ compare ── not newer ─▶ Outcome::UpToDate
//!      │
//! extract download URL
//!      │
//! take install lock ─▶ re-read VERSION, compare again
//!      │
//! download ─▶ install ─▶ write VERSION ─▶ write .last_check ─▶ Outcome::Updated
//! ```
//!
//! Stages run sequentially. Any error aborts the run; [`UpdatePipeline::run_logged`]
//! records it in the debug log, prefixed with the stage name. Outcomes that
//! change nothing write nothing, not even `.last_check`: throttling only
//! starts counting after an actual install.

use crate::constants::{ENV_RELEASE_URL, RELEASE_URL, fetch_timeout};
use crate::core::UpdateError;
use crate::upgrade::config::UpdateConfig;
use crate::upgrade::debug_log::DebugLog;
use crate::upgrade::download::ArtifactDownloader;
use crate::upgrade::installer::BinaryInstaller;
use crate::upgrade::lock::InstallLock;
use crate::upgrade::metadata::{ReleaseMetadata, extract_download_url, extract_version};
use crate::upgrade::paths::InstallationPaths;
use crate::upgrade::release::{ReleaseFetcher, preview};
use crate::upgrade::state::StateStore;
use crate::upgrade::throttle::should_check;
use crate::upgrade::version_check::is_newer;
use chrono::Utc;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything a pipeline run needs, read once at trigger time.
///
/// Nothing in the pipeline consults the environment or the configuration file
/// again after the snapshot is taken.
#[derive(Debug, Clone)]
pub struct UpdateSnapshot {
    /// Installation layout
    pub paths: InstallationPaths,
    /// Parsed `config` file, or defaults
    pub config: UpdateConfig,
    /// "Latest release" endpoint
    pub release_url: String,
    /// Bound on each network operation
    pub timeout: Duration,
    /// Skip the throttle gate
    pub force: bool,
}

impl UpdateSnapshot {
    /// Capture the current configuration.
    ///
    /// The configuration directory comes from `config_dir`, then
    /// `WALCMAN_CONFIG_DIR`, then `~/.config/walcman`. The release URL comes
    /// from `WALCMAN_RELEASE_URL` when set.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Paths`] when no configuration directory can be found.
    /// A missing or unreadable `config` file is not an error.
    pub async fn capture(config_dir: Option<&Path>) -> Result<Self, UpdateError> {
        let paths = InstallationPaths::resolve(config_dir)?;
        let config = UpdateConfig::load_or_default(&paths.config_file()).await;
        let release_url = std::env::var(ENV_RELEASE_URL)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| RELEASE_URL.to_string());

        Ok(Self::new(paths, config, release_url))
    }

    /// Snapshot from explicit parts, with the default timeout.
    pub fn new(paths: InstallationPaths, config: UpdateConfig, release_url: String) -> Self {
        Self {
            paths,
            config,
            release_url,
            timeout: fetch_timeout(),
            force: false,
        }
    }

    /// Set whether the throttle gate is bypassed.
    #[must_use]
    pub const fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Override the network timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// How a pipeline run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `update_check_enabled=0`.
    Disabled,
    /// The check interval has not elapsed yet.
    NotDue {
        /// Epoch seconds when the next check becomes due
        next_due: Option<i64>,
    },
    /// The remote release is not newer than the installed one.
    UpToDate {
        /// Installed version
        installed: String,
        /// Version reported by the release feed
        remote: String,
    },
    /// A new build was installed.
    Updated {
        /// Version before the update
        from: String,
        /// Version now installed
        to: String,
    },
}

impl Outcome {
    /// Process exit code for this outcome. Always `0`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        0
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "update checks are disabled"),
            Self::NotDue { next_due: Some(at) } => {
                write!(f, "no check due until {}", format_epoch(*at))
            }
            Self::NotDue { next_due: None } => write!(f, "no check due"),
            Self::UpToDate { installed, .. } => write!(f, "already up to date ({installed})"),
            Self::Updated { from, to } => write!(f, "updated {from} -> {to}"),
        }
    }
}

/// Exit code of a finished run: `0` for any outcome, `1` for any error.
#[must_use]
pub const fn exit_code(result: &Result<Outcome, UpdateError>) -> u8 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(_) => 1,
    }
}

/// Render epoch seconds as an RFC 3339 UTC timestamp.
pub(crate) fn format_epoch(epoch: i64) -> String {
    chrono::DateTime::from_timestamp(epoch, 0)
        .map_or_else(|| epoch.to_string(), |t| t.to_rfc3339())
}

/// Body of the last fetched release document, kept for failure reports.
#[derive(Debug, Default)]
struct FetchedBody {
    len: usize,
    preview: String,
}

/// One run of the update pipeline over a snapshot.
#[derive(Debug)]
pub struct UpdatePipeline {
    snapshot: UpdateSnapshot,
    state: StateStore,
    debug_log: DebugLog,
}

impl UpdatePipeline {
    /// Pipeline over `snapshot`.
    pub fn new(snapshot: UpdateSnapshot) -> Self {
        let state = StateStore::new(&snapshot.paths);
        let debug_log = DebugLog::new(snapshot.paths.debug_log_file());
        Self {
            snapshot,
            state,
            debug_log,
        }
    }

    /// Snapshot this pipeline runs over.
    pub fn snapshot(&self) -> &UpdateSnapshot {
        &self.snapshot
    }

    /// Run every stage once.
    ///
    /// # Errors
    ///
    /// The first stage failure, as an [`UpdateError`].
    pub async fn run(&self) -> Result<Outcome, UpdateError> {
        self.run_stages(&mut FetchedBody::default()).await
    }

    /// Run every stage once and record the result in the debug log.
    ///
    /// Failures are logged as `<stage> failed: <error>`; a successful install
    /// as `updated <from> -> <to>`. Other outcomes log nothing.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run); the error is logged before it is returned.
    pub async fn run_logged(&self) -> Result<Outcome, UpdateError> {
        let mut body = FetchedBody::default();
        let result = self.run_stages(&mut body).await;

        let line = match &result {
            Ok(Outcome::Updated { from, to }) => Some(format!("updated {from} -> {to}")),
            Ok(_) => None,
            Err(e @ UpdateError::Parse(_)) => Some(format!(
                "{} failed: {} (body {} bytes: {:?})",
                e.stage(),
                error_chain(e),
                body.len,
                body.preview
            )),
            Err(e) => Some(format!("{} failed: {}", e.stage(), error_chain(e))),
        };

        if let Some(line) = line
            && let Err(e) = self.debug_log.append(line).await
        {
            warn!("Failed to write debug log {}: {e:#}", self.debug_log.path().display());
        }

        result
    }

    async fn run_stages(&self, fetched: &mut FetchedBody) -> Result<Outcome, UpdateError> {
        let config = &self.snapshot.config;
        if !config.enabled {
            debug!("Update checks disabled");
            return Ok(Outcome::Disabled);
        }

        let check_state = self.state.check_state(config).await;
        let now = Utc::now().timestamp();
        if !self.snapshot.force && !should_check(&check_state, now) {
            debug!("Update check not due (last check {:?})", check_state.last_check);
            return Ok(Outcome::NotDue {
                next_due: check_state.next_due(),
            });
        }

        let fetcher = ReleaseFetcher::new(&self.snapshot.release_url, self.snapshot.timeout)?;
        let body = fetcher.fetch_latest().await?;
        fetched.len = body.len();
        fetched.preview = preview(&body);

        let version = extract_version(&body)?;
        debug!("Latest release is {version}");

        let installed = self.state.read_local_version().await?;
        if !is_newer(&version, &installed) {
            debug!("Installed {installed} is not older than {version}");
            return Ok(Outcome::UpToDate {
                installed,
                remote: version,
            });
        }

        // Only a newer release needs an artifact
        let release = ReleaseMetadata {
            download_url: extract_download_url(&body)?,
            version,
        };

        let _lock = InstallLock::acquire(&self.snapshot.paths.lock_file()).await?;

        // Another instance may have installed while we waited for the lock
        let installed = self.state.read_local_version().await?;
        if !is_newer(&release.version, &installed) {
            info!("{installed} was installed by another run");
            return Ok(Outcome::UpToDate {
                installed,
                remote: release.version,
            });
        }

        self.install_release(&release).await?;

        self.state.write_local_version(&release.version).await?;
        self.state.record_check(Utc::now().timestamp()).await?;

        info!("Updated {installed} -> {}", release.version);
        Ok(Outcome::Updated {
            from: installed,
            to: release.version,
        })
    }

    async fn install_release(&self, release: &ReleaseMetadata) -> Result<(), UpdateError> {
        let paths = &self.snapshot.paths;
        let temp = paths.temp_download();

        let downloader = ArtifactDownloader::new(self.snapshot.timeout)?;
        let size = downloader.download(&release.download_url, temp).await?;
        debug!("Downloaded {size} bytes for {}", release.version);

        let installer = BinaryInstaller::for_paths(paths);
        if let Err(e) = installer.install(temp).await {
            if let Err(remove) = tokio::fs::remove_file(temp).await
                && remove.kind() != std::io::ErrorKind::NotFound
            {
                warn!("Failed to remove {}: {remove}", temp.display());
            }
            return Err(e.into());
        }

        Ok(())
    }
}

/// `error: cause: cause` on one line.
fn error_chain(error: &UpdateError) -> String {
    let mut text = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.ends_with(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}
