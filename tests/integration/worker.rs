//! The hidden `worker` command: exit codes and files, never any output.

use crate::common::{release_server, run_updater};
use walcman_updater::test_utils::{InstallFixture, OLD_BINARY, TestResponse, TestServer, artifact};

#[tokio::test(flavor = "multi_thread")]
async fn test_worker_up_to_date_is_silent_noop() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    let server = release_server("v1.0.0").await;

    let output = run_updater(fixture.dir(), &server.url("/latest"), &["worker"]).await;

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
    assert_eq!(fixture.version().await.unwrap(), "1.0.0\n");
    assert_eq!(fixture.live_binary().await.unwrap(), OLD_BINARY);
    assert!(fixture.last_check().await.is_none());
    assert!(fixture.debug_log().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_worker_installs_update() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    let server = release_server("v1.1.0").await;

    let output = run_updater(fixture.dir(), &server.url("/latest"), &["worker"]).await;

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    assert_eq!(fixture.version().await.unwrap(), "1.1.0\n");
    assert_eq!(fixture.live_binary().await.unwrap(), artifact("1.1.0"));
    assert_eq!(fixture.backup_binary().await.unwrap(), OLD_BINARY);
    assert!(fixture.last_check().await.is_some());
    assert!(fixture.debug_log().await.contains("updated 1.0.0 -> 1.1.0"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(fixture.paths.live_binary()).unwrap().permissions().mode();
        assert_eq!(mode & 0o755, 0o755);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_worker_failure_exits_one() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    let server =
        TestServer::start(vec![("/latest", TestResponse::status(403, "rate limited"))])
            .await
            .unwrap();

    let output = run_updater(fixture.dir(), &server.url("/latest"), &["worker"]).await;

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
    let log = fixture.debug_log().await;
    assert!(log.contains("fetch failed: request to "), "{log}");
    assert!(log.contains("HTTP 403"), "{log}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_worker_respects_throttle() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    fixture.write_last_check(chrono::Utc::now().timestamp()).await.unwrap();
    let server = release_server("v1.1.0").await;

    let output = run_updater(fixture.dir(), &server.url("/latest"), &["worker"]).await;

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(server.request_count(), 0);
    assert_eq!(fixture.version().await.unwrap(), "1.0.0\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_worker_disabled() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    fixture.write_config("# managed by walcman\nupdate_check_enabled=0\n").await.unwrap();
    let server = release_server("v1.1.0").await;

    let output = run_updater(fixture.dir(), &server.url("/latest"), &["worker"]).await;

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(server.request_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_worker_missing_version_record() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    tokio::fs::remove_file(fixture.paths.version_file()).await.unwrap();
    let server = release_server("v1.1.0").await;

    let output = run_updater(fixture.dir(), &server.url("/latest"), &["worker"]).await;

    assert_eq!(output.status.code(), Some(1));
    assert!(fixture.debug_log().await.contains("local-state failed: "));
    assert_eq!(fixture.live_binary().await.unwrap(), OLD_BINARY);
}
