//! Foreground commands of the `walcman-updater` binary.

use crate::common::{release_server, run_updater};
use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use walcman_updater::test_utils::{InstallFixture, OLD_BINARY, artifact};

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    fixture.write_config("check_interval_hours=12\n").await.unwrap();
    fixture.write_last_check(1_700_000_000).await.unwrap();

    let output =
        run_updater(fixture.dir(), "http://127.0.0.1:9/latest", &["status", "--json"]).await;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["installed_version"], "1.0.0");
    assert_eq!(report["config"]["enabled"], true);
    assert_eq!(report["config"]["check_interval_hours"], 12);
    assert_eq!(report["last_check"], 1_700_000_000);
    assert_eq!(report["next_check_due"], 1_700_000_000 + 12 * 3600);
    assert_eq!(report["backup_available"], false);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_text_with_log() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    let server = release_server("v1.1.0").await;
    run_updater(fixture.dir(), &server.url("/latest"), &["worker"]).await;

    let output =
        run_updater(fixture.dir(), &server.url("/latest"), &["status", "--log", "5"]).await;

    output
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed version: 1.1.0"))
        .stdout(predicate::str::contains("Backup: available"))
        .stdout(predicate::str::contains("updated 1.0.0 -> 1.1.0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_reports_available_update() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    let server = release_server("v1.2.0").await;

    let output = run_updater(fixture.dir(), &server.url("/latest"), &["check"]).await;

    output
        .assert()
        .success()
        .stdout(predicate::str::contains("Latest version:  1.2.0 (update available)"));
    // check never installs
    assert_eq!(fixture.version().await.unwrap(), "1.0.0\n");
    assert!(fixture.last_check().await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_force_and_rollback() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    fixture.write_last_check(chrono::Utc::now().timestamp()).await.unwrap();
    let server = release_server("v1.1.0").await;

    let output = run_updater(fixture.dir(), &server.url("/latest"), &["run"]).await;
    output.assert().success().stdout(predicate::str::contains("no check due until"));
    assert_eq!(fixture.version().await.unwrap(), "1.0.0\n");

    let output = run_updater(fixture.dir(), &server.url("/latest"), &["run", "--force"]).await;
    output.assert().success().stdout(predicate::str::contains("updated 1.0.0 -> 1.1.0"));
    assert_eq!(fixture.live_binary().await.unwrap(), artifact("1.1.0"));

    let output = run_updater(fixture.dir(), &server.url("/latest"), &["rollback"]).await;
    output.assert().success().stdout(predicate::str::contains("Successfully rolled back"));
    assert_eq!(fixture.live_binary().await.unwrap(), OLD_BINARY);
    // VERSION is not rewound
    assert_eq!(fixture.version().await.unwrap(), "1.1.0\n");
    assert!(fixture.debug_log().await.contains("rolled back to backup binary"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rollback_without_backup() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();

    let output = run_updater(fixture.dir(), "http://127.0.0.1:9/latest", &["rollback"]).await;

    output
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no backup found"));
    assert_eq!(fixture.live_binary().await.unwrap(), OLD_BINARY);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_run_failure_is_reported() {
    let fixture = InstallFixture::new("1.0.0").await.unwrap();
    // Nothing listens on the discard port
    let output = run_updater(fixture.dir(), "http://127.0.0.1:9/latest", &["run"]).await;

    output
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Check your network connection"));
    assert!(fixture.debug_log().await.contains("fetch failed: "));
}
