//! Error handling for the updater
//!
//! Every stage of the update pipeline reports failures through a typed error:
//! - [`FetchError`] - release metadata request failed or returned junk
//! - [`ParseError`] - a metadata field is missing or malformed
//! - [`DownloadError`] - the artifact transfer failed or is implausibly small
//! - [`InstallError`] - one of the file moves of the swap failed
//!
//! [`UpdateError`] wraps them together with the configuration, local state,
//! lock and path failures. Inside the background worker nothing is surfaced to
//! the user: errors end up in the debug log, prefixed with
//! [`UpdateError::stage`]. Foreground commands go through
//! [`user_friendly_error`] which attaches a suggestion where one is useful.
//!
//! # Examples
//!
//! ```rust,no_run
//! use walcman_updater::core::{ParseError, UpdateError};
//!
//! let error = UpdateError::from(ParseError::MissingField { field: "tag_name" });
//! assert_eq!(error.stage(), "parse");
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error of the update pipeline.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The configuration file is missing or unreadable.
    ///
    /// Never fatal: the loader turns this into defaults.
    #[error("configuration unavailable at {path}: {reason}")]
    ConfigUnavailable {
        /// Path of the configuration file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The per-user configuration directory could not be determined.
    #[error("cannot resolve installation paths: {reason}")]
    Paths {
        /// What went wrong
        reason: String,
    },

    /// Fetching release metadata failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Release metadata did not contain a usable field.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The local version record could not be read or written.
    #[error("local version record at {path}: {reason}")]
    LocalState {
        /// Path of the record
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// Downloading the update artifact failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Swapping the new binary into place failed.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// The advisory install lock could not be taken.
    #[error("failed to acquire update lock at {path}: {reason}")]
    Lock {
        /// Path of the lock file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },
}

impl UpdateError {
    /// Short name of the pipeline stage that produced this error.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::ConfigUnavailable { .. } => "config",
            Self::Paths { .. } => "paths",
            Self::Fetch(_) => "fetch",
            Self::Parse(_) => "parse",
            Self::LocalState { .. } => "local-state",
            Self::Download(_) => "download",
            Self::Install(_) => "install",
            Self::Lock { .. } => "lock",
        }
    }
}

/// Failure while retrieving release metadata.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// No response within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL
        url: String,
        /// Timeout that elapsed
        timeout_secs: u64,
    },

    /// Connection or transport failure.
    #[error("request to {url} failed")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("request to {url} returned HTTP {status}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The response exceeded the metadata size cap.
    #[error("release metadata exceeds {limit} bytes")]
    TooLarge {
        /// Size cap in bytes
        limit: usize,
    },

    /// The body does not look like release metadata.
    #[error("response does not look like release metadata ({len} bytes: {preview:?})")]
    Malformed {
        /// Body length in bytes
        len: usize,
        /// Leading part of the body
        preview: String,
    },
}

/// Failure while extracting a field from release metadata.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No `"<field>":` key was found.
    #[error("field '{field}' not found")]
    MissingField {
        /// Field name
        field: &'static str,
    },

    /// The field exists but its value is not a quoted string.
    #[error("field '{field}' is not a string")]
    NotAString {
        /// Field name
        field: &'static str,
    },

    /// The field value is an empty string.
    #[error("field '{field}' is empty")]
    Empty {
        /// Field name
        field: &'static str,
    },

    /// The value ran past the read bound without a closing quote.
    #[error("field '{field}' exceeds {limit} characters")]
    TooLong {
        /// Field name
        field: &'static str,
        /// Read bound
        limit: usize,
    },

    /// The input ended inside the value.
    #[error("field '{field}' is truncated")]
    Unterminated {
        /// Field name
        field: &'static str,
    },
}

/// Failure while retrieving the update artifact.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// Transfer did not complete within the configured timeout.
    #[error("download from {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Artifact URL
        url: String,
        /// Timeout that elapsed
        timeout_secs: u64,
    },

    /// Connection or transport failure.
    #[error("download from {url} failed")]
    Request {
        /// Artifact URL
        url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("download from {url} returned HTTP {status}")]
    Status {
        /// Artifact URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Writing or re-reading the temporary file failed.
    #[error("failed to write download to {path}")]
    Io {
        /// Temporary download path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The artifact is smaller than any real build could be.
    #[error("downloaded artifact is {size} bytes, expected at least {minimum}")]
    Undersized {
        /// Observed size in bytes
        size: u64,
        /// Plausibility threshold in bytes
        minimum: u64,
    },
}

/// Failure while swapping the new binary into place.
#[derive(Error, Debug)]
pub enum InstallError {
    /// Moving the live binary aside failed. Nothing was touched.
    #[error("failed to move {live} to {backup}")]
    Backup {
        /// Live binary path
        live: PathBuf,
        /// Backup path
        backup: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Moving the new binary into place failed.
    ///
    /// `restored` reports whether the backup was moved back to the live path.
    /// When it is `false` there is no binary at the live path.
    #[error("failed to move {temp} to {live} (previous binary restored: {restored})")]
    Replace {
        /// Downloaded binary path
        temp: PathBuf,
        /// Live binary path
        live: PathBuf,
        /// Whether the rollback move succeeded
        restored: bool,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Rollback was requested but no backup exists.
    #[error("no backup found at {backup}")]
    NoBackup {
        /// Backup path
        backup: PathBuf,
    },

    /// Moving the backup over the live binary failed during rollback.
    #[error("failed to restore {backup} to {live}")]
    Restore {
        /// Backup path
        backup: PathBuf,
        /// Live binary path
        live: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Error wrapper with a user-facing suggestion, used by foreground commands.
#[derive(Debug)]
pub struct ErrorContext {
    /// The error message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion when the
/// failure is one a user can act on.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let message = format!("{error:#}");

    if let Some(update_error) = error.downcast_ref::<UpdateError>() {
        return match update_error {
            UpdateError::Paths { .. } => ErrorContext::new(message)
                .with_suggestion("Set HOME or pass --config-dir to point at the installation"),
            UpdateError::LocalState { .. } => ErrorContext::new(message)
                .with_suggestion("Reinstall walcman so the VERSION file is recreated"),
            UpdateError::Fetch(_) | UpdateError::Download(_) => ErrorContext::new(message)
                .with_suggestion("Check your network connection and try again later"),
            UpdateError::Install(InstallError::Replace { restored: false, live, .. }) => {
                ErrorContext::new(message)
                    .with_details(format!("There is currently no binary at {}", live.display()))
                    .with_suggestion("Run `walcman-updater rollback` or reinstall walcman")
            }
            UpdateError::Install(InstallError::NoBackup { .. }) => ErrorContext::new(message)
                .with_details("A backup is only kept after a successful update"),
            UpdateError::Lock { .. } => ErrorContext::new(message)
                .with_suggestion("Another update may be running; wait for it to finish"),
            _ => ErrorContext::new(message),
        };
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(message)
            .with_suggestion("Check ownership of the walcman configuration directory");
    }

    ErrorContext::new(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(UpdateError::from(ParseError::Empty { field: "name" }).stage(), "parse");
        assert_eq!(
            UpdateError::from(FetchError::Status {
                url: "http://x".to_string(),
                status: 500
            })
            .stage(),
            "fetch"
        );
        assert_eq!(
            UpdateError::from(DownloadError::Undersized {
                size: 10,
                minimum: 50_000
            })
            .stage(),
            "download"
        );
        assert_eq!(
            UpdateError::LocalState {
                path: PathBuf::from("VERSION"),
                reason: "missing".to_string()
            }
            .stage(),
            "local-state"
        );
    }

    #[test]
    fn test_error_messages_carry_context() {
        let error = DownloadError::Undersized {
            size: 10,
            minimum: 50_000,
        };
        assert_eq!(error.to_string(), "downloaded artifact is 10 bytes, expected at least 50000");

        let error = ParseError::TooLong {
            field: "tag_name",
            limit: 50,
        };
        assert_eq!(error.to_string(), "field 'tag_name' exceeds 50 characters");
    }

    #[test]
    fn test_user_friendly_error_for_unrestored_install() {
        let error = UpdateError::from(InstallError::Replace {
            temp: PathBuf::from("/tmp/new"),
            live: PathBuf::from("/home/u/.config/walcman/walcman"),
            restored: false,
            source: std::io::Error::other("boom"),
        });

        let ctx = user_friendly_error(anyhow::Error::from(error));
        assert!(ctx.details.unwrap().contains("no binary"));
        assert!(ctx.suggestion.unwrap().contains("rollback"));
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new("it broke").with_details("why").with_suggestion("fix it");
        assert_eq!(ctx.to_string(), "it broke\nDetails: why\nSuggestion: fix it");
    }
}
