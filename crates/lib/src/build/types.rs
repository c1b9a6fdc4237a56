//! Types for build orchestration.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::consts::{DEFAULT_CONCURRENCY, DEFAULT_OUT_DIR};
use crate::target::Target;

/// Errors that can occur during a build run or a single target build.
#[derive(Debug, Error)]
pub enum BuildError {
  /// A required configuration value is empty.
  #[error("builder {0} is required")]
  MissingConfig(&'static str),

  /// Concurrency must allow at least one worker.
  #[error("builder concurrency must be at least 1")]
  InvalidConcurrency,

  /// An output directory could not be created.
  #[error("failed to create output directory '{path}': {source}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The external toolchain could not be started.
  #[error("failed to run '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The external toolchain exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed { cmd: String, code: Option<i32> },

  /// The run was cancelled before this work completed.
  #[error("build cancelled")]
  Cancelled,

  /// A worker task panicked or was aborted.
  #[error("build worker failed: {0}")]
  Worker(String),
}

/// Configuration for a build run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
  /// Entry point handed to the toolchain (e.g. `./cmd/tool`).
  pub main: String,
  /// Base name of the produced executable.
  pub binary: String,
  /// Root of the per-target output directories.
  pub out_dir: PathBuf,
  /// Maximum number of concurrent builds.
  pub concurrency: usize,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      main: String::new(),
      binary: String::new(),
      out_dir: PathBuf::from(DEFAULT_OUT_DIR),
      concurrency: DEFAULT_CONCURRENCY,
    }
  }
}

impl BuildConfig {
  pub(crate) fn validate(&self) -> Result<(), BuildError> {
    if self.main.is_empty() {
      return Err(BuildError::MissingConfig("main"));
    }
    if self.binary.is_empty() {
      return Err(BuildError::MissingConfig("binary"));
    }
    if self.concurrency == 0 {
      return Err(BuildError::InvalidConcurrency);
    }
    Ok(())
  }

  /// Directory holding the build output for `target`.
  pub fn target_dir(&self, target: &Target) -> PathBuf {
    self.out_dir.join(target.dir_name())
  }

  /// Full path of the executable built for `target`.
  pub fn binary_path(&self, target: &Target) -> PathBuf {
    self.target_dir(target).join(target.binary_name(&self.binary))
  }
}

/// Everything the external build step needs for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
  pub target: Target,
  pub main: String,
  pub output: PathBuf,
  pub version: String,
}

/// Outcome of building a single dispatched target.
#[derive(Debug)]
pub struct BuildResult {
  pub target: Target,
  /// Path of the built executable, or why the build failed.
  pub outcome: Result<PathBuf, BuildError>,
}

impl BuildResult {
  pub fn is_success(&self) -> bool {
    self.outcome.is_ok()
  }

  pub fn executable(&self) -> Option<&Path> {
    self.outcome.as_ref().ok().map(PathBuf::as_path)
  }
}

/// Result of a build run.
#[derive(Debug, Default)]
pub struct BuildReport {
  /// One entry per dispatched target, in completion order.
  pub results: Vec<BuildResult>,
  /// Targets never dispatched because the run was cancelled, in input order.
  pub not_attempted: Vec<Target>,
}

impl BuildReport {
  /// Returns true if every target was built.
  pub fn is_success(&self) -> bool {
    self.not_attempted.is_empty() && self.results.iter().all(BuildResult::is_success)
  }

  pub fn succeeded(&self) -> impl Iterator<Item = (&Target, &Path)> {
    self
      .results
      .iter()
      .filter_map(|r| r.executable().map(|path| (&r.target, path)))
  }

  pub fn failed(&self) -> impl Iterator<Item = (&Target, &BuildError)> {
    self
      .results
      .iter()
      .filter_map(|r| r.outcome.as_ref().err().map(|e| (&r.target, e)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> BuildConfig {
    BuildConfig {
      main: "./cmd/tool".to_string(),
      binary: "tool".to_string(),
      out_dir: PathBuf::from("out"),
      concurrency: 2,
    }
  }

  #[test]
  fn validate_requires_main_and_binary() {
    let missing_main = BuildConfig {
      main: String::new(),
      ..config()
    };
    assert!(matches!(missing_main.validate(), Err(BuildError::MissingConfig("main"))));

    let missing_binary = BuildConfig {
      binary: String::new(),
      ..config()
    };
    assert!(matches!(missing_binary.validate(), Err(BuildError::MissingConfig("binary"))));

    let zero = BuildConfig {
      concurrency: 0,
      ..config()
    };
    assert!(matches!(zero.validate(), Err(BuildError::InvalidConcurrency)));
  }

  #[test]
  fn binary_path_follows_layout() {
    let config = config();
    assert_eq!(
      config.binary_path(&Target::new("windows", "amd64", "")),
      PathBuf::from("out").join("windows_amd64").join("tool.exe")
    );
    assert_eq!(
      config.binary_path(&Target::new("linux", "arm", "7")),
      PathBuf::from("out").join("linux_arm7").join("tool")
    );
  }

  #[test]
  fn report_partitions_results() {
    let report = BuildReport {
      results: vec![
        BuildResult {
          target: Target::new("linux", "amd64", ""),
          outcome: Ok(PathBuf::from("out/linux_amd64/tool")),
        },
        BuildResult {
          target: Target::new("darwin", "arm64", ""),
          outcome: Err(BuildError::CmdFailed {
            cmd: "go build".to_string(),
            code: Some(1),
          }),
        },
      ],
      not_attempted: vec![Target::new("windows", "amd64", "")],
    };

    assert!(!report.is_success());
    assert_eq!(report.succeeded().count(), 1);
    let failed: Vec<_> = report.failed().map(|(t, _)| t.to_string()).collect();
    assert_eq!(failed, vec!["darwin/arm64"]);
  }

  #[test]
  fn empty_report_is_success() {
    assert!(BuildReport::default().is_success());
  }
}
