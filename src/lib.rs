//! walcman-updater - self-update subsystem of the walcman terminal player
//!
//! Keeps a walcman installation current without getting in the way of the
//! player: at startup the host fires off a background check and moves on; the
//! check runs in a detached process, and everything it does is recorded in a
//! handful of files under `~/.config/walcman`.
//!
//! # Architecture Overview
//!
//! ```text
//! host startup
//!     └── BackgroundRunner::trigger_check_async()    returns immediately
//!             └── walcman-updater worker             null stdio, own process group
//!                     ├── throttle gate              config + .last_check
//!                     ├── release fetch + parse      bounded GET, tolerant scanner
//!                     ├── version comparison         ordinal
//!                     ├── download                   size plausibility check
//!                     ├── install                    backup, replace, restore on failure
//!                     └── VERSION, .last_check       only after an install
//! ```
//!
//! # Module Structure
//!
//! - [`upgrade`] - the pipeline stages, the background runner and persistent state
//! - [`core`] - error taxonomy and user-facing error display
//! - [`cli`] - the `walcman-updater` command tree
//! - [`utils`] - atomic writes and file moves
//! - [`constants`] - endpoint, bounds, timeouts and file names
//!
//! # Example
//!
//! ```rust,no_run
//! use walcman_updater::upgrade::BackgroundRunner;
//!
//! // At host startup: never blocks, never fails the caller
//! if let Ok(runner) = BackgroundRunner::sibling() {
//!     runner.trigger_check_async();
//! }
//! ```

pub mod cli;
pub mod constants;
pub mod core;
pub mod upgrade;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
