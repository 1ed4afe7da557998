use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use assert_cmd::Command;
use filetime::FileTime;
use predicates::prelude::*;
use tempfile::TempDir;

/// Run the binary with HOME pointed at a scratch dir so no real config leaks in
fn agesweep(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("agesweep").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG").arg("--no-color");
    cmd
}

fn aged_file(dir: &Path, name: &str, age: Duration) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"data").unwrap();
    filetime::set_file_mtime(&path, FileTime::from_system_time(SystemTime::now() - age)).unwrap();
    path
}

const TWO_DAYS: Duration = Duration::from_secs(2 * 86400);

// ─── Help & version ──────────────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    agesweep(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("older than"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("once"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("Excludes always win"));
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    agesweep(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("agesweep"));
}

// ─── Once ────────────────────────────────────────────────────────────────────

#[test]
fn test_once_dry_run_json() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let old = aged_file(work.path(), "old.log", TWO_DAYS);
    aged_file(work.path(), "new.log", Duration::from_secs(60));

    agesweep(home.path())
        .args(["once", "--dry-run", "--age", "1d", "--format", "json", "-d"])
        .arg(work.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"files_would_delete\": 1"))
        .stdout(predicate::str::contains("\"files_deleted\": 0"))
        .stdout(predicate::str::contains("\"dry_run\": true"));

    assert!(old.exists());
}

#[test]
fn test_once_deletes_and_respects_exclude() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let a = aged_file(work.path(), "a.txt", TWO_DAYS);
    let keep = aged_file(work.path(), "keep.txt", TWO_DAYS);

    agesweep(home.path())
        .args(["once", "--age", "86400", "--exclude", "keep.txt", "--detailed", "-d"])
        .arg(work.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted"))
        .stdout(predicate::str::contains("a.txt"));

    assert!(!a.exists());
    assert!(keep.exists());
}

#[test]
fn test_once_quiet_format() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    aged_file(work.path(), "a.txt", TWO_DAYS);

    agesweep(home.path())
        .args(["once", "--dry-run", "--age", "1d", "--format", "quiet", "-d"])
        .arg(work.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("1\t4\t0"));
}

#[test]
fn test_once_without_directories_is_a_no_op() {
    let home = TempDir::new().unwrap();
    agesweep(home.path())
        .arg("once")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to do"));
}

#[test]
fn test_run_without_directories_returns_immediately() {
    let home = TempDir::new().unwrap();
    agesweep(home.path())
        .arg("run")
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to do"));
}

#[test]
fn test_run_with_zero_interval_runs_once_and_exits() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let old = aged_file(work.path(), "old.tmp", TWO_DAYS);

    agesweep(home.path())
        .args(["run", "--interval", "0", "--age", "1d", "--format", "json", "-d"])
        .arg(work.path())
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"files_deleted\":1"));

    assert!(!old.exists());
}

// ─── Validation ──────────────────────────────────────────────────────────────

#[test]
fn test_negative_age_fails() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    agesweep(home.path())
        .args(["once", "--age", "-1", "-d"])
        .arg(work.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("positive number"));
}

#[test]
fn test_bad_duration_fails() {
    let home = TempDir::new().unwrap();
    agesweep(home.path())
        .args(["once", "--age", "soon", "-d", "/tmp/agesweep-unused"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid duration"));
}

#[test]
fn test_protected_root_refused() {
    let home = TempDir::new().unwrap();
    agesweep(home.path())
        .args(["once", "--dry-run", "-d", "/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("protected"));
}

#[test]
fn test_invalid_regex_fails() {
    let home = TempDir::new().unwrap();
    agesweep(home.path())
        .args(["once", "--include", "/([unclosed/", "-d", "/tmp/agesweep-unused"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid pattern"));
}

// ─── Check ───────────────────────────────────────────────────────────────────

#[test]
fn test_check_json_verdicts() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let keep = aged_file(work.path(), "keep.txt", TWO_DAYS);
    let a = aged_file(work.path(), "a.txt", TWO_DAYS);

    let output = agesweep(home.path())
        .args(["check", "--exclude", "keep.txt", "--age", "1d", "--format", "json"])
        .arg(&keep)
        .arg(&a)
        .output()
        .unwrap();
    assert!(output.status.success());

    let verdicts: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(verdicts[0]["matched"], false);
    assert_eq!(verdicts[0]["would_delete"], false);
    assert_eq!(verdicts[1]["matched"], true);
    assert_eq!(verdicts[1]["would_delete"], true);
    assert!(keep.exists() && a.exists(), "check never deletes");
}

#[test]
fn test_check_missing_path_has_no_age() {
    let home = TempDir::new().unwrap();
    let output = agesweep(home.path())
        .args(["check", "--format", "json", "/tmp/agesweep-missing/file.txt"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let verdicts: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(verdicts[0]["matched"], true);
    assert!(verdicts[0]["age_secs"].is_null());
    assert_eq!(verdicts[0]["would_delete"], false);
}

#[test]
fn test_check_requires_a_path() {
    let home = TempDir::new().unwrap();
    agesweep(home.path()).arg("check").assert().failure();
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[test]
fn test_config_path_defaults_under_home() {
    let home = TempDir::new().unwrap();
    agesweep(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".agesweep/config.toml"));
}

#[test]
fn test_config_init_then_refuses_overwrite() {
    let home = TempDir::new().unwrap();
    let path = home.path().join(".agesweep/config.toml");

    agesweep(home.path())
        .args(["config", "init"])
        .assert()
        .success();
    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("age"));

    agesweep(home.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    agesweep(home.path())
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_config_file_is_loaded() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let old = aged_file(work.path(), "old.log", TWO_DAYS);
    let config = home.path().join("custom.toml");
    fs::write(
        &config,
        format!(
            "directories = [{:?}]\nage = \"1d\"\ndry_run = true\n",
            work.path().display().to_string()
        ),
    )
    .unwrap();

    agesweep(home.path())
        .args(["once", "--format", "json", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"files_would_delete\": 1"));

    assert!(old.exists());
}

#[test]
fn test_verbose_from_config_file_enables_progress_logs() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    aged_file(work.path(), "young.log", Duration::from_secs(60));
    let config = home.path().join("verbose.toml");
    fs::write(
        &config,
        format!(
            "directories = [{:?}]\nverbose = true\n",
            work.path().display().to_string()
        ),
    )
    .unwrap();

    agesweep(home.path())
        .args(["once", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::contains("Processing directory"));
}

#[test]
fn test_config_show_json() {
    let home = TempDir::new().unwrap();
    agesweep(home.path())
        .args(["config", "show", "--format", "json", "--age", "2h", "--exclude", "keep.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("7200"))
        .stdout(predicate::str::contains("keep.txt"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let home = TempDir::new().unwrap();
    agesweep(home.path())
        .args(["once", "--config"])
        .arg(home.path().join("nope.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config"));
}

// ─── Completions ─────────────────────────────────────────────────────────────

#[test]
fn test_bash_completions() {
    let home = TempDir::new().unwrap();
    agesweep(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("agesweep"));
}
