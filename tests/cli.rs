// ABOUTME: Integration tests for the tinyci CLI commands.
// ABOUTME: Validates --help output, init and status without a container runtime.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn tinyci_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("tinyci"))
}

#[test]
fn help_shows_commands() {
    tinyci_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("ci"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("shutdown"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("tinyci.yml");

    tinyci_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--namespace", "acme"])
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("namespace: acme"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("tinyci.yml"), "namespace: old\n").unwrap();

    tinyci_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_force_overwrites() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("tinyci.yml"), "namespace: old\n").unwrap();

    tinyci_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--force", "--namespace", "fresh"])
        .assert()
        .success();

    let content = fs::read_to_string(temp_dir.path().join("tinyci.yml")).unwrap();
    assert!(content.contains("namespace: fresh"));
}

#[test]
fn status_prints_resolved_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("tinyci.yml"),
        "namespace: acme\nretention:\n  keep_images: 7\n",
    )
    .unwrap();

    tinyci_cmd()
        .current_dir(temp_dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("namespace: acme"))
        .stdout(predicate::str::contains("keep_images: 7"));
}

#[test]
fn status_with_explicit_config_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("custom.yml");
    fs::write(&path, "namespace: elsewhere\n").unwrap();

    tinyci_cmd()
        .arg("status")
        .arg("--config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("namespace: elsewhere"));
}

#[test]
fn status_without_config_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    tinyci_cmd()
        .current_dir(temp_dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
