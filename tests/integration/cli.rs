//! Tests for the `dutil` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// `dutil` pointed at a hive and config inside `dir`, with colors off.
fn dutil(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dutil").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(dir.join("config.toml"))
        .arg("--hive")
        .arg(dir.join("registry.json"));
    cmd
}

fn register_provider(dir: &Path, key: &str, version: &str, name: &str) {
    dutil(dir)
        .args(["register", key, "--version", version, "--name", name])
        .assert()
        .success();
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("dutil")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("register-dependent"))
        .stdout(predicate::str::contains("unregister-dependent"))
        .stdout(predicate::str::contains("dependents"));
}

#[test]
fn test_install_uninstall_flow() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();

    dutil(dir)
        .args(["register", "ProviderA", "--version", "2.5", "--name", "Package A"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ProviderA"));
    assert!(dir.join("registry.json").exists());

    dutil(dir)
        .args(["check", "ProviderA", "--min", "2.0", "--min-inclusive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All dependencies satisfied"));

    dutil(dir)
        .args(["register-dependent", "ProviderA", "ProviderB", "--min", "2.0", "--min-inclusive"])
        .assert()
        .success();

    // removal of ProviderA is blocked while ProviderB is registered
    dutil(dir)
        .args(["dependents", "ProviderA"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("is still required by"))
        .stdout(predicate::str::contains("ProviderB"));

    dutil(dir)
        .args(["unregister-dependent", "ProviderA", "ProviderB"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no longer depends on"))
        // ProviderA still carries its own registration values
        .stdout(predicate::str::contains("Removed empty provider key").not());

    dutil(dir)
        .args(["dependents", "ProviderA"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No dependents of"));

    dutil(dir).args(["unregister", "ProviderA"]).assert().success();
    dutil(dir)
        .args(["check", "ProviderA"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Missing or incompatible dependencies"));
}

#[test]
fn test_last_dependent_removes_placeholder_provider() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();

    dutil(dir).args(["register-dependent", "Shared", "App"]).assert().success();
    dutil(dir)
        .args(["unregister-dependent", "Shared", "App"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed empty provider key Shared"));

    // provider is gone entirely, so listing its dependents is an error
    dutil(dir)
        .args(["dependents", "Shared"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("corrupt"))
        .stderr(predicate::str::contains("Shared"));
}

#[test]
fn test_check_reports_each_failure_once() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    register_provider(dir, "Old", "1.0", "Old Package");
    register_provider(dir, "New", "3.0", "New Package");

    dutil(dir)
        .args(["check", "Old", "New", "Gone", "gone", "--min", "2.0", "--format", "json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""key": "Old""#))
        .stdout(predicate::str::contains(r#""name": "Old Package""#))
        .stdout(predicate::str::contains(r#""key": "Gone""#))
        .stdout(predicate::str::contains(r#""key": "gone""#).not())
        .stdout(predicate::str::contains("New").not());
}

#[test]
fn test_check_version_bounds_exclusive_by_default() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    register_provider(dir, "P", "2.0", "P");

    dutil(dir).args(["check", "P", "--min", "2.0"]).assert().code(1);
    dutil(dir).args(["check", "P", "--min", "2.0", "--min-inclusive"]).assert().success();
    dutil(dir).args(["check", "P", "--max", "2.0"]).assert().code(1);
    dutil(dir).args(["check", "P", "--max", "2.0", "--max-inclusive"]).assert().success();
}

#[test]
fn test_dependents_ignore_is_case_insensitive() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    register_provider(dir, "Runtime", "1.0", "Runtime");
    register_provider(dir, "AppOne", "1.0", "Application One");
    dutil(dir).args(["register-dependent", "Runtime", "AppOne"]).assert().success();
    dutil(dir).args(["register-dependent", "Runtime", "AppTwo"]).assert().success();

    dutil(dir)
        .args(["dependents", "Runtime", "--ignore", "apptwo", "--format", "json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""name": "Application One""#))
        .stdout(predicate::str::contains("AppTwo").not());

    dutil(dir)
        .args(["dependents", "Runtime", "--ignore", "APPONE", "--ignore", "AppTwo"])
        .assert()
        .success();
}

#[test]
fn test_info_output() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    dutil(dir)
        .args(["register", "P", "--version", "1.2", "--name", "Package", "--id", "{P-ID}"])
        .assert()
        .success();

    dutil(dir)
        .args(["info", "P"])
        .assert()
        .success()
        .stdout(predicate::str::contains("{P-ID}"))
        .stdout(predicate::str::contains("1.2.0.0"));

    dutil(dir)
        .args(["info", "P", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""version": "1.2.0.0""#));

    dutil(dir)
        .args(["info", "Nope"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn test_orphaned_provider_info_warns() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    dutil(dir).args(["register-dependent", "Orphan", "App"]).assert().success();

    dutil(dir)
        .args(["info", "Orphan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("treated as absent"));
}

#[test]
fn test_user_scope_is_separate() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    dutil(dir)
        .args(["--user", "register", "P", "--version", "1.0", "--name", "P"])
        .assert()
        .success();

    dutil(dir).args(["--user", "check", "P"]).assert().success();
    dutil(dir).args(["check", "P"]).assert().code(1);
}

#[test]
fn test_invalid_version_rejected() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();

    dutil(dir)
        .args(["register", "P", "--version", "1.x", "--name", "P"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("1.x"));
    assert!(!dir.join("registry.json").exists());
}

#[test]
fn test_invalid_provider_key_rejected() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();

    dutil(dir)
        .args(["register", r"A\B", "--version", "1.0", "--name", "P"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid argument"));
}

#[test]
fn test_config_selects_hive_and_scope() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    let config = dir.join("dutil.toml");
    std::fs::write(&config, "hive_path = \"hives/main.json\"\nscope = \"user\"\n").unwrap();

    Command::cargo_bin("dutil")
        .unwrap()
        .env("NO_COLOR", "1")
        .env("DUTIL_CONFIG", &config)
        .args(["register", "P", "--version", "1.0", "--name", "P"])
        .assert()
        .success();
    let hive = dir.join("hives").join("main.json");
    assert!(hive.exists());

    // scope came from the configuration, so a per-machine check misses it
    Command::cargo_bin("dutil")
        .unwrap()
        .env("DUTIL_CONFIG", dir.join("absent.toml"))
        .arg("--hive")
        .arg(&hive)
        .args(["check", "P"])
        .assert()
        .code(1);
    Command::cargo_bin("dutil")
        .unwrap()
        .env("DUTIL_CONFIG", dir.join("absent.toml"))
        .arg("--hive")
        .arg(&hive)
        .args(["--user", "check", "P"])
        .assert()
        .success();
}

#[test]
fn test_malformed_config_reported() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    std::fs::write(dir.join("config.toml"), "scope = [").unwrap();

    dutil(dir)
        .args(["check", "P"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_corrupt_hive_reported() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    std::fs::write(dir.join("registry.json"), "{ not json").unwrap();

    dutil(dir)
        .args(["check", "P"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Registry hive error"));
}
