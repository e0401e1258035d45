//! Command-line interface for walcman-updater.
//!
//! # Available Commands
//!
//! - `check` - Ask the release feed whether a newer build exists, change nothing
//! - `run` - Run the update pipeline in the foreground (`--force` skips the throttle)
//! - `status` - Show installed version, settings, throttle state and the debug log
//! - `rollback` - Put the previous binary back in place
//!
//! A hidden `worker` command is the entry point of the detached background
//! process started by [`crate::upgrade::BackgroundRunner::trigger_check_async`].
//! It is handled by the binary before logging is set up and never prints.
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug output on stderr
//! - `--quiet` / `-q`: no log output
//! - `--config-dir <DIR>`: installation directory instead of `~/.config/walcman`
//!   (also `WALCMAN_CONFIG_DIR`)
//!
//! ```bash
//! walcman-updater status --log 20
//! walcman-updater run --force
//! RUST_LOG=walcman_updater=trace walcman-updater check
//! ```

mod status;
mod upgrade;

pub use status::{StatusCommand, StatusReport};
pub use upgrade::{CheckCommand, RollbackCommand, RunCommand};

use crate::upgrade::runner::run_worker;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Runtime settings derived from the global flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Default filter directive when `RUST_LOG` is unset; `None` disables logging
    pub log_level: Option<String>,
}

impl CliConfig {
    /// Install the stderr `tracing` subscriber.
    ///
    /// `RUST_LOG` overrides the level chosen by the flags. Calling this more
    /// than once keeps the first subscriber.
    pub fn init_logging(&self) {
        let Some(level) = &self.log_level else {
            return;
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

/// walcman self-updater.
#[derive(Parser, Debug)]
#[command(name = "walcman-updater", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Installation directory (default: ~/.config/walcman)
    #[arg(long, global = true, value_name = "DIR", env = "WALCMAN_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether a newer release is available
    Check(CheckCommand),

    /// Run the update pipeline in the foreground
    Run(RunCommand),

    /// Show update state and settings
    Status(StatusCommand),

    /// Restore the previous binary from its backup
    Rollback(RollbackCommand),

    /// Background update worker
    #[command(hide = true)]
    Worker,
}

impl Cli {
    /// Whether this is the background worker invocation.
    #[must_use]
    pub const fn is_worker(&self) -> bool {
        matches!(self.command, Commands::Worker)
    }

    /// Installation directory given on the command line or in the environment.
    #[must_use]
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    /// Derive runtime settings from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.quiet {
            None
        } else if self.verbose {
            Some("debug".to_string())
        } else {
            Some("warn".to_string())
        };

        CliConfig {
            log_level,
        }
    }

    /// Run the selected command and return the process exit code.
    ///
    /// Foreground commands get a stderr log subscriber first. `worker` gets
    /// none: it has no terminal, only an exit code.
    ///
    /// # Errors
    ///
    /// Whatever a foreground command fails with. The worker never errors; its
    /// failures become exit code 1.
    pub async fn execute(self) -> Result<ExitCode> {
        if !self.is_worker() {
            self.build_config().init_logging();
        }

        let config_dir = self.config_dir.as_deref();
        match self.command {
            Commands::Check(cmd) => cmd.execute(config_dir).await?,
            Commands::Run(cmd) => cmd.execute(config_dir).await?,
            Commands::Status(cmd) => cmd.execute(config_dir).await?,
            Commands::Rollback(cmd) => cmd.execute(config_dir).await?,
            Commands::Worker => return Ok(ExitCode::from(run_worker(config_dir).await)),
        }
        Ok(ExitCode::SUCCESS)
    }
}
