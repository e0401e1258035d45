//! Integration test suite for walcman-updater
//!
//! End-to-end tests driving the update pipeline against a local HTTP server
//! and a temporary installation, through the library and through the
//! `walcman-updater` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **background**: detached worker process and in-process background task
//! - **cli**: `check`, `run`, `status` and `rollback` commands
//! - **worker**: exit codes and on-disk effects of the hidden `worker` command

mod background;
mod cli;
mod common;
mod worker;
