//! Utility modules shared across the updater.

pub mod fs;

pub use fs::{atomic_write, make_executable, move_file};
