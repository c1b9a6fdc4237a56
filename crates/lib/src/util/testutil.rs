//! Test utilities for mbuild-lib.
//!
//! Cross-platform helpers for tests that run external processes or need a
//! throwaway git repository.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

/// Run the system `git` in `dir` and return its trimmed stdout.
///
/// Identity and signing are pinned so the user's config cannot interfere.
pub fn git(dir: &Path, args: &[&str]) -> String {
  let output = Command::new("git")
    .args([
      "-c",
      "user.name=test-user",
      "-c",
      "user.email=test@example.com",
      "-c",
      "commit.gpgsign=false",
      "-c",
      "tag.gpgsign=false",
    ])
    .args(args)
    .current_dir(dir)
    .output()
    .unwrap();
  assert!(
    output.status.success(),
    "git {:?} failed: {}",
    args,
    String::from_utf8_lossy(&output.stderr)
  );
  String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create an empty repository in a temporary directory.
pub fn init_repo() -> TempDir {
  let dir = TempDir::new().unwrap();
  git(dir.path(), &["init", "-q"]);
  dir
}

/// Create an empty commit and return its full hash.
pub fn commit(dir: &Path, message: &str) -> String {
  git(dir, &["commit", "-q", "--allow-empty", "-m", message]);
  git(dir, &["rev-parse", "HEAD"])
}
