//! Integration tests for the `flair` CLI binary.
//!
//! Argument parsing, help output, completions and error exits run without a
//! network. The connected tests point `--api-url` at a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `flair` binary with env isolation.
///
/// Clears every `FLAIR_*` variable the CLI reads and points the config
/// directories at `home` so tests never touch a real configuration.
fn flair_cmd(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("flair");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("FLAIR_PROFILE")
        .env_remove("FLAIR_CLIENT_ID")
        .env_remove("FLAIR_CLIENT_SECRET")
        .env_remove("FLAIR_API_URL")
        .env_remove("FLAIR_UNITS")
        .env_remove("FLAIR_OUTPUT")
        .env_remove("FLAIR_TIMEOUT");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// A connected command against `server` with inline credentials.
fn connected_cmd(home: &std::path::Path, server: &MockServer) -> assert_cmd::Command {
    let mut cmd = flair_cmd(home);
    cmd.args([
        "--api-url",
        &server.uri(),
        "--client-id",
        "client-abc",
        "--client-secret",
        "s3cret",
        "--color",
        "never",
        "--timeout",
        "5",
    ]);
    cmd
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

async fn mount_list(server: &MockServer, route: &str, data: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
        .mount(server)
        .await;
}

/// One auto-mode structure with a room and a vent in it.
async fn mount_home(server: &MockServer) {
    mount_token(server).await;
    mount_list(
        server,
        "/api/structures",
        json!([{
            "id": "s1",
            "type": "structures",
            "attributes": {
                "name": "Home",
                "mode": "auto",
                "set-point-temperature-c": 21.5,
                "structure-heat-cool-mode": "heat",
                "home": true
            },
            "relationships": {}
        }]),
    )
    .await;
    mount_list(
        server,
        "/api/structures/s1/rooms",
        json!([{
            "id": "r1",
            "type": "rooms",
            "attributes": { "name": "Den", "current-temperature-c": 20.0, "set-point-c": 21.0 }
        }]),
    )
    .await;
    mount_list(
        server,
        "/api/structures/s1/vents",
        json!([{
            "id": "v1",
            "type": "vents",
            "attributes": { "name": "Den vent", "percent-open": 100, "inactive": false },
            "relationships": { "room": { "data": { "type": "rooms", "id": "r1" } } }
        }]),
    )
    .await;
    for empty in ["pucks", "bridges", "hvac-units", "schedules"] {
        mount_list(server, &format!("/api/structures/s1/{empty}"), json!([])).await;
    }
    Mock::given(method("GET"))
        .and(path("/api/vents/v1/current-reading"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": "cr1", "type": "sensor-readings", "attributes": { "duct-temperature-c": 30.0 } }
        })))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = flair_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    flair_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("Flair")
            .and(predicate::str::contains("validate"))
            .and(predicate::str::contains("entities"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("press")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    flair_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("flair"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    flair_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    flair_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Usage errors ────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = flair_cmd(home.path()).arg("thermostat").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("thermostat"),
        "Expected error mentioning the subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_units_value() {
    let home = tempfile::tempdir().unwrap();
    flair_cmd(home.path())
        .args(["--units", "kelvin", "status"])
        .assert()
        .code(2);
}

#[test]
fn test_set_requires_value() {
    let home = tempfile::tempdir().unwrap();
    flair_cmd(home.path())
        .args(["set", "r1_room"])
        .assert()
        .code(2);
}

// ── Credential errors ───────────────────────────────────────────────

#[test]
fn test_status_without_credentials() {
    let home = tempfile::tempdir().unwrap();
    flair_cmd(home.path())
        .arg("status")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No credentials"));
}

#[test]
fn test_secret_flag_without_client_id() {
    let home = tempfile::tempdir().unwrap();
    flair_cmd(home.path())
        .args(["--client-secret", "s3cret", "entities", "list"])
        .assert()
        .code(3);
}

#[cfg(target_os = "linux")]
#[test]
fn test_unknown_profile_lists_available() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("flair");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "default_profile = \"home\"\n\n[profiles.home]\nclient_id = \"abc\"\nclient_secret = \"s\"\n",
    )
    .unwrap();

    flair_cmd(home.path())
        .args(["--profile", "cabin", "status"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("cabin").and(predicate::str::contains("home")));
}

#[cfg(target_os = "linux")]
#[test]
fn test_config_show_redacts_secret() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("flair");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "[profiles.default]\nclient_id = \"abc\"\nclient_secret = \"hunter2\"\n",
    )
    .unwrap();

    flair_cmd(home.path())
        .args(["config", "show", "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("abc").and(predicate::str::contains("hunter2").not()));
}

// ── Connected commands ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_validate_lists_users_and_structures() {
    let server = MockServer::start().await;
    mount_home(&server).await;
    mount_list(
        &server,
        "/api/users",
        json!([{ "id": "u1", "type": "users", "attributes": { "name": "Ada" } }]),
    )
    .await;

    let home = tempfile::tempdir().unwrap();
    connected_cmd(home.path(), &server)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada").and(predicate::str::contains("Home")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_credentials_exit_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "Client authentication failed"
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    connected_cmd(home.path(), &server)
        .arg("status")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Authentication failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_entities_list_plain() {
    let server = MockServer::start().await;
    mount_home(&server).await;

    let home = tempfile::tempdir().unwrap();
    connected_cmd(home.path(), &server)
        .args(["entities", "list", "--output", "plain"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("s1_climate")
                .and(predicate::str::contains("r1_room"))
                .and(predicate::str::contains("v1_vent")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_entities_get_unknown_id() {
    let server = MockServer::start().await;
    mount_home(&server).await;

    let home = tempfile::tempdir().unwrap();
    connected_cmd(home.path(), &server)
        .args(["entities", "get", "nope_room"])
        .assert()
        .code(4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_vent_closed_patches_and_reports() {
    let server = MockServer::start().await;
    mount_home(&server).await;
    Mock::given(method("PATCH"))
        .and(path("/api/vents/v1"))
        .and(body_string_contains("\"percent-open\":0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    connected_cmd(home.path(), &server)
        .args(["set", "v1_vent", "close"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0% open"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_press_rejects_non_buttons() {
    let server = MockServer::start().await;
    mount_home(&server).await;

    let home = tempfile::tempdir().unwrap();
    connected_cmd(home.path(), &server)
        .args(["press", "v1_vent"])
        .assert()
        .code(2);
}
