//! CLI smoke tests for mbuild.
//!
//! These tests run the binary end to end: argument handling, exit codes, and a
//! full release against a stand-in toolchain script.

use std::path::Path;
use std::process::Command as StdCommand;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Variables the CLI reads; cleared so the host environment cannot leak in.
const ENV_VARS: &[&str] = &[
  "PLATFORM",
  "BUILDER_MAIN",
  "BUILDER_BINARY",
  "BUILDER_OUT_DIR",
  "BUILDER_CONCURRENCY",
  "ARCHIVE_OUT_DIR",
  "PROJECT",
  "README",
  "MBUILD_GO",
  "MBUILD_VERSION_VAR",
  "MBUILD_TIMEOUT",
  "GITHUB_REF_NAME",
  "GITHUB_REF_TYPE",
  "GITHUB_SHA",
  "GITHUB_TOKEN",
  "GITHUB_REPOSITORY",
  "GITHUB_API_URL",
  "RUST_LOG",
];

/// Get a Command for the mbuild binary with a clean environment.
fn mbuild_cmd() -> Command {
  let mut cmd = cargo_bin_cmd!("mbuild");
  for var in ENV_VARS {
    cmd.env_remove(var);
  }
  cmd
}

fn git(dir: &Path, args: &[&str]) {
  let status = StdCommand::new("git")
    .args(["-c", "user.name=test-user", "-c", "user.email=test@example.com"])
    .args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"])
    .args(args)
    .current_dir(dir)
    .status()
    .unwrap();
  assert!(status.success(), "git {:?} failed", args);
}

/// A repository whose HEAD is tagged `tag`.
fn tagged_repo(tag: &str) -> TempDir {
  let temp = TempDir::new().unwrap();
  git(temp.path(), &["init", "-q"]);
  git(temp.path(), &["commit", "-q", "--allow-empty", "-m", "initial"]);
  git(temp.path(), &["tag", tag]);
  temp
}

/// A stand-in for `go` that writes `$GOOS/$GOARCH` to the `-o` path.
#[cfg(unix)]
fn fake_go(dir: &Path, fail_for: Option<&str>) -> std::path::PathBuf {
  use std::os::unix::fs::PermissionsExt;

  let fail = fail_for
    .map(|os| format!("if [ \"$GOOS\" = \"{}\" ]; then echo boom >&2; exit 1; fi\n", os))
    .unwrap_or_default();
  let script = format!(
    "#!/bin/sh\nif [ \"$1\" = \"build\" ]; then\n{}printf '%s/%s' \"$GOOS\" \"$GOARCH\" > \"$3\"\nfi\nexit 0\n",
    fail
  );
  let path = dir.join("fake-go");
  std::fs::write(&path, script).unwrap();
  std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  path
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  mbuild_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  mbuild_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("mbuild"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["release", "version", "info"] {
    mbuild_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// info / version
// =============================================================================

#[test]
fn info_prints_host_platform() {
  mbuild_cmd()
    .arg("info")
    .assert()
    .success()
    .stdout(predicate::str::contains("Host platform"));
}

#[test]
fn info_json_is_valid() {
  let output = mbuild_cmd().args(["info", "--json"]).output().unwrap();
  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert!(json.get("host").is_some());
}

#[test]
fn version_uses_repository_tag() {
  let repo = tagged_repo("v1.2.3");

  mbuild_cmd()
    .args(["version", "--repo"])
    .arg(repo.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("v1.2.3").and(predicate::str::contains("1.2.3")));
}

#[test]
fn version_prefers_ci_metadata() {
  let repo = tagged_repo("v1.2.3");

  mbuild_cmd()
    .args(["version", "--json", "--repo"])
    .arg(repo.path())
    .env("GITHUB_REF_TYPE", "branch")
    .env("GITHUB_REF_NAME", "main")
    .env("GITHUB_SHA", "0123456789abcdef")
    .assert()
    .success()
    .stdout(predicate::str::contains("\"main-0123456\""));
}

#[test]
fn version_outside_repository_fails() {
  let temp = TempDir::new().unwrap();

  mbuild_cmd()
    .args(["version", "--repo"])
    .arg(temp.path())
    .assert()
    .code(1)
    .stderr(predicate::str::contains("no versioning strategy"));
}

// =============================================================================
// release
// =============================================================================

#[test]
fn release_rejects_bad_platform() {
  let temp = TempDir::new().unwrap();

  mbuild_cmd()
    .current_dir(temp.path())
    .args(["release", "--platform", "linux/amd64,linux", "--builder-main", "./cmd/tool"])
    .args(["--builder-binary", "tool"])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("invalid platform 'linux'"));
}

#[test]
fn release_requires_builder_settings() {
  mbuild_cmd()
    .args(["release", "--platform", "linux/amd64", "--builder-binary", "tool"])
    .assert()
    .code(2)
    .stderr(predicate::str::contains("--builder-main"));
}

#[test]
fn release_rejects_zero_concurrency() {
  mbuild_cmd()
    .args(["release", "--builder-main", "./cmd/tool", "--builder-binary", "tool"])
    .args(["--builder-concurrency", "0"])
    .assert()
    .code(2);
}

#[test]
#[cfg(unix)]
fn release_builds_and_archives_every_target() {
  let repo = tagged_repo("v1.2.3");
  let root = repo.path();
  std::fs::write(root.join("README.md"), "# tool").unwrap();
  let go = fake_go(root, None);

  mbuild_cmd()
    .current_dir(root)
    .args(["release", "--platform", "linux/amd64,windows/amd64,linux/arm/7"])
    .args(["--builder-main", "./cmd/tool", "--builder-binary", "tool"])
    .args(["--builder-out-dir", "build", "--archive-out-dir", "dist"])
    .arg("--go")
    .arg(&go)
    .arg("--no-publish")
    .assert()
    .success()
    .stdout(predicate::str::contains("Release v1.2.3 complete"));

  assert_eq!(
    std::fs::read_to_string(root.join("build/windows_amd64/tool.exe")).unwrap(),
    "windows/amd64"
  );
  for archive in [
    "tool_1.2.3_linux_amd64.tar.gz",
    "tool_1.2.3_windows_amd64.zip",
    "tool_1.2.3_linux_arm7.tar.gz",
  ] {
    assert!(root.join("dist").join(archive).is_file(), "missing {}", archive);
  }
}

#[test]
#[cfg(unix)]
fn release_archives_built_targets_when_another_fails() {
  let repo = tagged_repo("v1.2.3");
  let root = repo.path();
  let go = fake_go(root, Some("windows"));

  // One worker so linux finishes before windows is attempted.
  mbuild_cmd()
    .current_dir(root)
    .args(["release", "--platform", "linux/amd64,windows/amd64"])
    .args(["--builder-main", "./cmd/tool", "--builder-binary", "tool"])
    .args(["--builder-concurrency", "1"])
    .args(["--archive-out-dir", "dist", "--project", "acme"])
    .arg("--go")
    .arg(&go)
    .arg("--no-publish")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("1 of 2 target(s) did not build"));

  assert!(root.join("dist/acme_1.2.3_linux_amd64.tar.gz").is_file());
  assert!(!root.join("dist/acme_1.2.3_windows_amd64.zip").exists());
}
