//! End-to-end CLI tests for the edl-downloader binary.

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use support::{AuthorizationIs, Servers, basic_header};
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, ResponseTemplate};

fn command() -> Command {
    let mut cmd = Command::cargo_bin("edl-downloader").unwrap();
    cmd.env_clear();
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Earthdata Login"));
}

#[test]
fn test_binary_version_displays_version() {
    command()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("edl-downloader"));
}

#[test]
fn test_binary_without_url_fails() {
    command()
        .args(["--client-id", "cid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("<URL>"));
}

#[test]
fn test_binary_rejects_zero_retry_limit() {
    command()
        .args(["--client-id", "cid", "-r", "0", "https://example.com/granule.nc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--max-retries"));
}

#[test]
fn test_binary_rejects_non_network_url_and_leaves_no_file() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let output = temp_dir.path().join("key.nc");
    command()
        .args(["--client-id", "cid", "--fallback-authn", "-o"])
        .arg(&output)
        .arg("s3://bucket/key.nc")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported URL scheme"));
    assert!(!output.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_downloads_into_directory_with_generated_name() {
    let Some(servers) = Servers::start().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/data/granule.nc4"))
        .and(AuthorizationIs(basic_header()))
        .and(body_string("param=value"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"netcdf".to_vec()))
        .expect(1)
        .mount(&servers.resource)
        .await;

    let temp_dir = tempfile::TempDir::new().unwrap();
    command()
        .env("EDL_URL", servers.edl.uri())
        .env("OAUTH_CLIENT_ID", support::CLIENT_ID)
        .env("OAUTH_CLIENT_SECRET", support::CLIENT_SECRET)
        .args(["--fallback-authn", "-q", "-d", "param=value", "-o"])
        .arg(temp_dir.path())
        .arg(servers.resource_url("/data/granule.nc4?format=nc4"))
        .assert()
        .success();

    let written = std::fs::read(temp_dir.path().join("granule.nc4")).unwrap();
    assert_eq!(written, b"netcdf");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_removes_partial_file_on_failure() {
    let Some(servers) = Servers::start().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&servers.resource)
        .await;

    let temp_dir = tempfile::TempDir::new().unwrap();
    let output = temp_dir.path().join("missing.nc");
    command()
        .env("EDL_URL", servers.edl.uri())
        .args(["--client-id", "cid", "--fallback-authn", "-o"])
        .arg(&output)
        .arg(servers.resource_url("/missing.nc"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("404"));
    assert!(!output.exists());
}
