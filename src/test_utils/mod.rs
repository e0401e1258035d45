//! Test utilities for walcman-updater
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration tests:
//! - [`init_test_logging`] for `RUST_LOG`-controlled output in tests
//! - [`TestServer`] serving canned HTTP responses on an ephemeral port
//! - [`release_body`] and [`artifact`] payloads
//! - [`InstallFixture`], an installation in a temporary directory
//!
//! # Example
//!
//! ```rust,no_run
//! use walcman_updater::test_utils::{InstallFixture, TestResponse, TestServer, artifact, release_body};
//! use walcman_updater::upgrade::UpdatePipeline;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let fixture = InstallFixture::new("1.0.0").await?;
//! let server = TestServer::start(vec![]).await?;
//! server.route("/bin", TestResponse::ok(artifact("1.1.0")));
//! server.route("/latest", TestResponse::ok(release_body("v1.1.0", Some(&server.url("/bin")))));
//!
//! let outcome = UpdatePipeline::new(fixture.snapshot(&server.url("/latest")).await).run().await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod server;

pub use fixtures::{InstallFixture, OLD_BINARY, artifact, release_body};
pub use server::{TestResponse, TestServer};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging
/// stays off.
///
/// ```bash
/// RUST_LOG=walcman_updater=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
