//! Fire-and-forget launching of the update pipeline.
//!
//! Two ways to run a check without the caller waiting on it:
//!
//! - [`BackgroundRunner::trigger_check_async`] starts a detached worker
//!   process (`walcman-updater worker`) with stdin, stdout and stderr on the
//!   null device. The worker outlives the host process.
//! - [`BackgroundRunner::spawn_in_process`] runs the pipeline as a detached
//!   task inside the current process.
//!
//! Neither reports back. Results are visible only through `VERSION`,
//! `.last_check` and `.update.log`.

use crate::constants::{UPDATER_BINARY_NAME, WORKER_SUBCOMMAND};
use crate::upgrade::pipeline::{UpdatePipeline, UpdateSnapshot, exit_code};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::instrument::WithSubscriber;
use tracing::subscriber::NoSubscriber;
use tracing::{debug, warn};

/// Launches update checks in the background.
///
/// # Examples
///
/// ```rust,no_run
/// use walcman_updater::upgrade::runner::BackgroundRunner;
///
/// // Host application startup
/// if let Ok(runner) = BackgroundRunner::sibling() {
///     runner.trigger_check_async();
/// }
/// // ... continues immediately
/// ```
#[derive(Debug, Clone)]
pub struct BackgroundRunner {
    updater_exe: PathBuf,
    config_dir: Option<PathBuf>,
}

impl BackgroundRunner {
    /// Runner that spawns `updater_exe worker`.
    pub fn new(updater_exe: impl Into<PathBuf>) -> Self {
        Self {
            updater_exe: updater_exe.into(),
            config_dir: None,
        }
    }

    /// Runner for the `walcman-updater` binary next to the running executable.
    ///
    /// # Errors
    ///
    /// Returns an error if the current executable's path is unavailable or no
    /// updater binary sits beside it.
    pub fn sibling() -> std::io::Result<Self> {
        Self::sibling_of(&std::env::current_exe()?)
    }

    /// Runner for the `walcman-updater` binary in the directory of `exe`.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::ErrorKind::NotFound`] when that binary does not
    /// exist.
    pub fn sibling_of(exe: &Path) -> std::io::Result<Self> {
        let file_name = format!("{UPDATER_BINARY_NAME}{}", std::env::consts::EXE_SUFFIX);
        let updater = exe.parent().map(|dir| dir.join(&file_name)).filter(|path| path.is_file());

        updater.map(Self::new).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{file_name} not found next to {}", exe.display()),
            )
        })
    }

    /// Pass `--config-dir` to the worker.
    #[must_use]
    pub fn with_config_dir(mut self, config_dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(config_dir.into());
        self
    }

    /// Start a detached worker process and return immediately.
    ///
    /// A failure to spawn is logged through `tracing` and otherwise ignored.
    /// The child handle is dropped without waiting; on Unix the finished
    /// worker stays a zombie until the host exits, when init reaps it.
    pub fn trigger_check_async(&self) {
        match self.spawn_worker() {
            Ok(pid) => debug!("Started update worker (pid {pid})"),
            Err(e) => warn!("Failed to start update worker {}: {e}", self.updater_exe.display()),
        }
    }

    /// Spawn the worker process, returning its pid.
    ///
    /// # Errors
    ///
    /// Returns the spawn error.
    pub fn spawn_worker(&self) -> std::io::Result<u32> {
        let mut command = Command::new(&self.updater_exe);
        if let Some(dir) = &self.config_dir {
            command.arg("--config-dir").arg(dir);
        }
        command
            .arg(WORKER_SUBCOMMAND)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group: a Ctrl-C in the host's terminal does not reach it
            command.process_group(0);
        }

        let child = command.spawn()?;
        Ok(child.id())
    }

    /// Run the pipeline over `snapshot` as a detached task of this process.
    ///
    /// Inside a tokio runtime the pipeline becomes a task on it; the task is
    /// dropped with the runtime if the host shuts down first. Outside a
    /// runtime a dedicated thread with its own single-threaded runtime is
    /// used.
    ///
    /// The pipeline's own `tracing` events never reach the host's subscriber;
    /// its diagnostics go to the debug log only.
    pub fn spawn_in_process(snapshot: UpdateSnapshot) {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            drop(handle.spawn(run_detached(snapshot).with_subscriber(NoSubscriber::default())));
            return;
        }

        let spawned = std::thread::Builder::new().name("walcman-update".into()).spawn(move || {
            match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime
                    .block_on(run_detached(snapshot).with_subscriber(NoSubscriber::default())),
                Err(e) => warn!("Failed to build update runtime: {e}"),
            }
        });

        if let Err(e) = spawned {
            warn!("Failed to start update thread: {e}");
        }
    }

    /// Path of the executable spawned as worker.
    pub fn updater_exe(&self) -> &Path {
        &self.updater_exe
    }
}

async fn run_detached(snapshot: UpdateSnapshot) {
    let result = UpdatePipeline::new(snapshot).run_logged().await;
    debug!("Background update check finished with exit code {}", exit_code(&result));
}

/// Body of the hidden `worker` command.
///
/// Captures a snapshot, runs the pipeline and returns the process exit code:
/// `0` for any outcome, `1` for any failure. Failures go to the debug log
/// when the installation directory is known.
pub async fn run_worker(config_dir: Option<&Path>) -> u8 {
    let snapshot = match UpdateSnapshot::capture(config_dir).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            debug!("Update worker cannot start: {e}");
            return 1;
        }
    };

    exit_code(&UpdatePipeline::new(snapshot).run_logged().await)
}
