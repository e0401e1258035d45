//! Self-update for walcman.
//!
//! Checks a release feed, decides whether a newer build exists, downloads it
//! and swaps it into place, without ever blocking or failing the host
//! application's startup.
//!
//! # Architecture Overview
//!
//! ```text
//! BackgroundRunner ─▶ throttle gate ─▶ ReleaseFetcher ─▶ metadata ─▶ is_newer
//!                                                                       │
//!      StateStore ◀── BinaryInstaller ◀── ArtifactDownloader ◀── InstallLock
//! ```
//!
//! - **[`runner::BackgroundRunner`]**: detached worker process or in-process task
//! - **[`throttle`]**: whether a check is due, from `.last_check` and `config`
//! - **[`release::ReleaseFetcher`]**: one bounded GET of the "latest release" document
//! - **[`metadata`]**: tolerant, bounded extraction of version and download URL
//! - **[`version_check`]**: ordinal comparison of version strings
//! - **[`download::ArtifactDownloader`]**: artifact transfer with a size plausibility check
//! - **[`installer::BinaryInstaller`]**: backup-then-replace swap with restore on failure
//! - **[`state::StateStore`]** and **[`debug_log::DebugLog`]**: the files under
//!   the configuration directory
//!
//! [`pipeline::UpdatePipeline`] chains the stages over an
//! [`pipeline::UpdateSnapshot`] captured once at trigger time.
//!
//! # Files
//!
//! All state lives in `~/.config/walcman` (see [`paths::InstallationPaths`]):
//!
//! | File            | Contents                                      |
//! |-----------------|-----------------------------------------------|
//! | `VERSION`       | installed version, one line                   |
//! | `config`        | `update_check_enabled`, `check_interval_hours` |
//! | `.last_check`   | epoch seconds of the last completed install   |
//! | `.update.log`   | `[epoch] message` lines                       |
//! | `.update.lock`  | advisory lock held during installs            |
//! | `walcman`       | live binary                                   |
//! | `walcman.backup`| previous binary                               |
//!
//! # Error Handling
//!
//! Every stage fails with a typed error that converts into
//! [`crate::core::UpdateError`]. The background worker never surfaces them;
//! they end up in `.update.log` and the worker exits with code 1.
//!
//! ```rust,no_run
//! use walcman_updater::upgrade::{UpdatePipeline, UpdateSnapshot};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let snapshot = UpdateSnapshot::capture(None).await?.with_force(true);
//! match UpdatePipeline::new(snapshot).run_logged().await {
//!     Ok(outcome) => println!("{outcome}"),
//!     Err(e) => eprintln!("{} failed: {e}", e.stage()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod debug_log;
pub mod download;
pub mod installer;
/// Cross-process install lock.
pub mod lock;
pub mod metadata;
pub mod paths;
pub mod pipeline;
/// Release metadata retrieval.
pub mod release;
pub mod runner;
pub mod state;
pub mod throttle;
/// Version comparison.
pub mod version_check;


pub use config::UpdateConfig;
pub use debug_log::{DebugLog, DebugLogEntry};
pub use download::ArtifactDownloader;
pub use installer::BinaryInstaller;
pub use metadata::ReleaseMetadata;
pub use paths::InstallationPaths;
pub use pipeline::{Outcome, UpdatePipeline, UpdateSnapshot};
pub use release::ReleaseFetcher;
pub use runner::BackgroundRunner;
pub use state::StateStore;
pub use throttle::{CheckState, should_check};
pub use version_check::is_newer;
