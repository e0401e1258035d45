//! Fire-and-forget launching: the caller returns at once, results show up
//! only on disk.

use crate::common::{release_server, updater_bin, wait_for};
use serial_test::serial;
use std::time::{Duration, Instant};
use walcman_updater::constants::ENV_RELEASE_URL;
use walcman_updater::test_utils::{InstallFixture, artifact};
use walcman_updater::upgrade::{BackgroundRunner, UpdateSnapshot};

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_trigger_check_async_detached_worker() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    let server = release_server("v1.1.0").await;
    // The worker inherits the environment of the host
    unsafe {
        std::env::set_var(ENV_RELEASE_URL, server.url("/latest"));
    }

    let started = Instant::now();
    BackgroundRunner::new(updater_bin()).with_config_dir(fixture.dir()).trigger_check_async();
    assert!(started.elapsed() < Duration::from_secs(1), "trigger must not wait for the worker");

    let version_file = fixture.paths.version_file();
    let updated = wait_for(Duration::from_secs(20), || {
        std::fs::read_to_string(&version_file).is_ok_and(|v| v == "1.1.0\n")
    })
    .await;

    unsafe {
        std::env::remove_var(ENV_RELEASE_URL);
    }

    assert!(updated, "worker did not install the update: {}", fixture.debug_log().await);
    assert_eq!(fixture.live_binary().await.unwrap(), artifact("1.1.0"));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_snapshot_capture_reads_environment() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    fixture.write_config("check_interval_hours=3\nupdate_check_enabled=false\n").await.unwrap();
    unsafe {
        std::env::set_var(ENV_RELEASE_URL, "http://mirror.invalid/latest");
    }

    let snapshot = UpdateSnapshot::capture(Some(fixture.dir())).await.unwrap();

    unsafe {
        std::env::remove_var(ENV_RELEASE_URL);
    }

    assert_eq!(snapshot.paths.config_dir(), fixture.dir());
    assert_eq!(snapshot.release_url, "http://mirror.invalid/latest");
    assert_eq!(snapshot.config.check_interval_hours, 3);
    assert!(!snapshot.config.enabled);
    assert!(!snapshot.force);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_spawn_in_process_inside_runtime() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    let server = release_server("v1.1.0").await;

    BackgroundRunner::spawn_in_process(fixture.snapshot(&server.url("/latest")).await);

    let version_file = fixture.paths.version_file();
    let updated = wait_for(Duration::from_secs(10), || {
        std::fs::read_to_string(&version_file).is_ok_and(|v| v == "1.1.0\n")
    })
    .await;
    assert!(updated, "{}", fixture.debug_log().await);
}

#[test]
fn test_spawn_in_process_outside_runtime() {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
    let fixture = runtime.block_on(InstallFixture::new("1.0.0")).unwrap();
    let server = runtime.block_on(release_server("v1.1.0"));
    let snapshot = runtime.block_on(fixture.snapshot(&server.url("/latest")));

    // Called from a plain thread: the runner brings its own runtime
    BackgroundRunner::spawn_in_process(snapshot);

    let version_file = fixture.paths.version_file();
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline
        && !std::fs::read_to_string(&version_file).is_ok_and(|v| v == "1.1.0\n")
    {
        std::thread::sleep(Duration::from_millis(50));
    }

    assert_eq!(std::fs::read_to_string(&version_file).unwrap(), "1.1.0\n");
}

/// Host log output, shared with the subscriber's writer.
#[derive(Clone, Default)]
struct HostLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for HostLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_spawn_in_process_keeps_host_log_quiet() {
    // A host that logs walcman_updater events at info to its terminal
    let host_log = HostLog::default();
    let writer = host_log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("walcman_updater=info"))
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let in_runtime = InstallFixture::new("1.0.0").await.unwrap();
    let own_thread = InstallFixture::new("1.0.0").await.unwrap();
    let server = release_server("v1.1.0").await;

    BackgroundRunner::spawn_in_process(in_runtime.snapshot(&server.url("/latest")).await);
    let snapshot = own_thread.snapshot(&server.url("/latest")).await;
    std::thread::spawn(move || BackgroundRunner::spawn_in_process(snapshot)).join().unwrap();

    for fixture in [&in_runtime, &own_thread] {
        let version_file = fixture.paths.version_file();
        let updated = wait_for(Duration::from_secs(10), || {
            std::fs::read_to_string(&version_file).is_ok_and(|v| v == "1.1.0\n")
        })
        .await;
        assert!(updated, "{}", fixture.debug_log().await);
        assert!(fixture.debug_log().await.contains("updated 1.0.0 -> 1.1.0"));
    }

    let output = String::from_utf8_lossy(&host_log.0.lock().unwrap()).into_owned();
    assert!(output.is_empty(), "update task wrote to the host log: {output}");
}
