//! Core types for the updater
//!
//! Holds the error taxonomy shared by every pipeline stage and the
//! user-facing error display used by the CLI. See [`error`] for details.

pub mod error;

pub use error::{
    DownloadError, ErrorContext, FetchError, InstallError, ParseError, UpdateError,
    user_friendly_error,
};
