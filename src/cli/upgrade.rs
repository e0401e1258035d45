//! Foreground update commands: `check`, `run` and `rollback`.

use crate::core::UpdateError;
use crate::upgrade::debug_log::DebugLog;
use crate::upgrade::installer::BinaryInstaller;
use crate::upgrade::metadata::extract_version;
use crate::upgrade::pipeline::{Outcome, UpdatePipeline, UpdateSnapshot};
use crate::upgrade::release::ReleaseFetcher;
use crate::upgrade::state::StateStore;
use crate::upgrade::version_check::{format_version_info, is_newer};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::Path;
use tracing::{debug, warn};

/// Ask the release feed for the latest version without installing anything.
///
/// Neither the throttle gate nor the enabled flag apply, and no state file is
/// written.
#[derive(Args, Debug)]
pub struct CheckCommand {}

impl CheckCommand {
    /// Run the check.
    ///
    /// # Errors
    ///
    /// Fails when the installation, the release feed or its metadata is
    /// unusable.
    pub async fn execute(self, config_dir: Option<&Path>) -> Result<()> {
        let snapshot = UpdateSnapshot::capture(config_dir).await?;
        let installed = StateStore::new(&snapshot.paths).read_local_version().await?;

        println!("{}", "Checking for updates...".cyan());

        let fetcher = ReleaseFetcher::new(&snapshot.release_url, snapshot.timeout)
            .map_err(UpdateError::from)?;
        let body = fetcher.fetch_latest().await.map_err(UpdateError::from)?;
        let latest = extract_version(&body).map_err(UpdateError::from)?;

        println!("{}", format_version_info(&installed, Some(&latest)));
        if is_newer(&latest, &installed) {
            println!("Run `walcman-updater run --force` to install it now");
        }

        Ok(())
    }
}

/// Run the update pipeline in the foreground.
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Check even if the check interval has not elapsed
    #[arg(short, long)]
    pub force: bool,
}

impl RunCommand {
    /// Run the pipeline once, logging to the debug log like the worker does.
    ///
    /// # Errors
    ///
    /// The [`UpdateError`] of the failing stage.
    pub async fn execute(self, config_dir: Option<&Path>) -> Result<()> {
        let snapshot = UpdateSnapshot::capture(config_dir).await?.with_force(self.force);
        debug!("Running update pipeline against {}", snapshot.release_url);

        let outcome = UpdatePipeline::new(snapshot).run_logged().await?;
        let line = outcome.to_string();
        match outcome {
            Outcome::Updated { .. } | Outcome::UpToDate { .. } => println!("{}", line.green()),
            Outcome::Disabled | Outcome::NotDue { .. } => println!("{}", line.yellow()),
        }

        Ok(())
    }
}

/// Restore the previous binary from `<name>.backup`.
///
/// `VERSION` is left as is: it keeps naming the build that was rolled back
/// from, so the next check does not reinstall it until a newer one appears.
#[derive(Args, Debug)]
pub struct RollbackCommand {}

impl RollbackCommand {
    /// Run the rollback.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Install`] when there is no backup or it cannot be moved.
    pub async fn execute(self, config_dir: Option<&Path>) -> Result<()> {
        let snapshot = UpdateSnapshot::capture(config_dir).await?;
        let installer = BinaryInstaller::for_paths(&snapshot.paths);

        println!("{}", "Rolling back to previous version...".yellow());
        installer.rollback().await.map_err(UpdateError::from)?;

        let log = DebugLog::new(snapshot.paths.debug_log_file());
        if let Err(e) = log.append("rolled back to backup binary").await {
            warn!("Failed to write debug log: {e:#}");
        }

        println!("{}", "Successfully rolled back to previous version".green());
        Ok(())
    }
}
