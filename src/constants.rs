//! Global constants used throughout the updater.
//!
//! Endpoint, timeouts, parsing bounds and on-disk file names live here so the
//! numbers the pipeline depends on are discoverable in one place.

use std::time::Duration;

/// Name of the application binary that gets replaced in place.
pub const BINARY_NAME: &str = "walcman";

/// "Latest release" endpoint queried on every due check.
pub const RELEASE_URL: &str = "https://api.github.com/repos/lassedtu/walcman/releases/latest";

/// Upper bound for every network call made by the pipeline (5 seconds).
///
/// Applies to the release metadata request and to the artifact download
/// individually. There is no bound on the pipeline as a whole.
pub fn fetch_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Minimum plausible length of a release metadata response, in bytes.
pub const MIN_RELEASE_BODY_LEN: usize = 50;

/// Upper bound on the release metadata response, in bytes (4 MiB).
pub const MAX_RELEASE_BODY_LEN: usize = 4 * 1024 * 1024;

/// Marker that must appear in a response for it to count as release metadata.
pub const RELEASE_TAG_MARKER: &str = "tag_name";

/// Longest version value the metadata extractor will read.
pub const MAX_VERSION_LEN: usize = 50;

/// Longest download URL the metadata extractor will read.
pub const MAX_URL_LEN: usize = 1024;

/// Downloads smaller than this are treated as error pages or truncated transfers.
pub const MIN_ARTIFACT_SIZE: u64 = 50_000;

/// Default interval between checks, in hours.
pub const DEFAULT_CHECK_INTERVAL_HOURS: u64 = 24;

/// Debug log size that triggers rotation before the next append (1 MiB).
pub const MAX_DEBUG_LOG_LEN: u64 = 1024 * 1024;

/// Number of characters of an unexpected body kept in debug log lines.
pub const BODY_PREVIEW_LEN: usize = 80;

/// Per-user configuration directory, relative to the home directory.
pub const CONFIG_DIR: &str = ".config/walcman";

/// Installed version record.
pub const VERSION_FILE: &str = "VERSION";

/// User-editable `key=value` configuration.
pub const CONFIG_FILE: &str = "config";

/// Epoch seconds of the last completed check.
pub const LAST_CHECK_FILE: &str = ".last_check";

/// Append-only diagnostics of the background worker.
pub const DEBUG_LOG_FILE: &str = ".update.log";

/// Suffix appended to the debug log name when it is rotated.
pub const DEBUG_LOG_ROTATED_SUFFIX: &str = ".1";

/// Advisory lock guarding download and install.
pub const LOCK_FILE: &str = ".update.lock";

/// Suffix of the previous binary kept next to the live one.
pub const BACKUP_SUFFIX: &str = ".backup";

/// Temporary download target, placed in the configuration directory.
pub const TEMP_DOWNLOAD_FILE: &str = ".walcman.update";

/// Overrides the configuration directory.
pub const ENV_CONFIG_DIR: &str = "WALCMAN_CONFIG_DIR";

/// Overrides the release endpoint.
pub const ENV_RELEASE_URL: &str = "WALCMAN_RELEASE_URL";

/// Hidden subcommand the detached worker process is started with.
pub const WORKER_SUBCOMMAND: &str = "worker";

/// File name of the updater binary, installed next to the host binary.
pub const UPDATER_BINARY_NAME: &str = "walcman-updater";
