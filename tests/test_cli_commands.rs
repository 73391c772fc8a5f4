//! End-to-end tests for the genforge binary
//!
//! These tests execute the compiled binary with `assert_cmd`. None of them
//! reach the network: `plan` never calls a backend, and the configs used
//! here leave every backend without a credential.

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn genforge_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("genforge"));
    cmd.stdin(Stdio::null());
    cmd.env_remove("GENFORGE_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd.env("NO_COLOR", "1");
    cmd
}

fn write_config(dir: &Path) -> PathBuf {
    let config_dir = dir.join(".genforge");
    fs::create_dir_all(&config_dir).unwrap();
    let path = config_dir.join("config.toml");
    fs::write(
        &path,
        r#"
[[backends]]
name = "keyless"
family = "chat"
base_url = "https://api.example.invalid/v1"
api_key_env = "GENFORGE_CLI_TEST_KEY_NEVER_SET"
model = "gpt-4o-mini"
"#,
    )
    .unwrap();
    path
}

#[test]
fn version_output() {
    genforge_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("genforge"));
}

#[test]
fn plan_prints_layers() {
    genforge_cmd()
        .args(["plan", "app.js", "style.css", "index.html"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Layer 0: index.html"))
        .stdout(predicate::str::contains("Layer 1: style.css"))
        .stdout(predicate::str::contains("Layer 2: app.js"));
}

#[test]
fn plan_accepts_category_hints() {
    genforge_cmd()
        .args(["plan", "theme.css", "layout.tpl:markup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Layer 0: layout.tpl"))
        .stdout(predicate::str::contains("Layer 1: theme.css"));
}

#[test]
fn plan_json_is_parseable() {
    let output = genforge_cmd()
        .args(["plan", "utils.py", "config.py", "service.py", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["layers"][0], serde_json::json!(["utils.py", "config.py"]));
    assert_eq!(json["layers"][1], serde_json::json!(["service.py"]));
}

#[test]
fn plan_rejects_duplicates_with_plan_exit_code() {
    genforge_cmd()
        .args(["plan", "a.html", "a.html"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Duplicate artifact path: a.html"));
}

#[test]
fn plan_does_not_need_config() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join(".git")).unwrap();

    genforge_cmd()
        .current_dir(temp.path())
        .args(["plan", "index.html"])
        .assert()
        .success();
}

#[test]
fn backends_without_config_is_cli_error() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join(".git")).unwrap();

    genforge_cmd()
        .current_dir(temp.path())
        .arg("backends")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn backends_json_reports_missing_credential() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let output = genforge_cmd()
        .arg("--config")
        .arg(&config)
        .args(["backends", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["name"], "keyless");
    assert_eq!(json[0]["state"], "unavailable");
    assert_eq!(json[0]["available"], false);
}

#[test]
fn generate_with_no_usable_backend_is_partial_failure() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    genforge_cmd()
        .arg("--config")
        .arg(&config)
        .args(["generate", "index.html", "--prompt", "A page"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("index.html"))
        .stderr(predicate::str::contains("No backend available"));
}
