//! Shared helpers for the integration tests.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::{Duration, Instant};
use walcman_updater::constants::ENV_RELEASE_URL;
use walcman_updater::test_utils::{TestResponse, TestServer, artifact, release_body};

/// Server announcing `tag` with a plausible artifact at `/bin`.
pub async fn release_server(tag: &str) -> TestServer {
    let version = tag.trim_start_matches('v');
    let server =
        TestServer::start(vec![("/bin", TestResponse::ok(artifact(version)))]).await.unwrap();
    server.route("/latest", TestResponse::ok(release_body(tag, Some(&server.url("/bin")))));
    server
}

/// Path of the built `walcman-updater` binary.
pub fn updater_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("walcman-updater")
}

/// Run the binary against `config_dir` and `release_url` off the runtime
/// threads, so the test server keeps serving.
pub async fn run_updater(config_dir: &Path, release_url: &str, args: &[&str]) -> Output {
    let mut cmd = Command::cargo_bin("walcman-updater").unwrap();
    cmd.env(ENV_RELEASE_URL, release_url)
        .env_remove("RUST_LOG")
        .arg("--config-dir")
        .arg(config_dir)
        .args(args);

    tokio::task::spawn_blocking(move || cmd.output()).await.unwrap().unwrap()
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}
