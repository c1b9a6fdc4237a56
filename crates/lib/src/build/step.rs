//! External build steps.
//!
//! The orchestrator never compiles anything itself; each target is handed to a
//! [`BuildStep`] that drives an external toolchain. Cross-compilation settings
//! are passed per invocation on the child process, never through the
//! orchestrator's own environment, so concurrent builds stay isolated.

use std::future::Future;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::cancel::CancelToken;
use super::types::{BuildError, BuildRequest};

/// Produces one executable for one target.
///
/// Implementations must honor `cancel` by aborting promptly (terminating any
/// external process) and returning [`BuildError::Cancelled`].
pub trait BuildStep: Send + Sync + 'static {
  fn build(&self, request: &BuildRequest, cancel: &CancelToken) -> impl Future<Output = Result<(), BuildError>> + Send;
}

/// Builds Go programs with `go build`.
#[derive(Debug, Clone)]
pub struct GoBuildStep {
  go: String,
  version_var: String,
}

impl Default for GoBuildStep {
  fn default() -> Self {
    Self {
      go: "go".to_string(),
      version_var: "main.Version".to_string(),
    }
  }
}

impl GoBuildStep {
  pub fn new() -> Self {
    Self::default()
  }

  /// Use a specific `go` executable instead of the one on `PATH`.
  pub fn with_go(mut self, go: impl Into<String>) -> Self {
    self.go = go.into();
    self
  }

  /// Package variable that receives the version via `-ldflags -X`.
  pub fn with_version_var(mut self, var: impl Into<String>) -> Self {
    self.version_var = var.into();
    self
  }

  /// Download module dependencies once before any target is built.
  pub async fn prepare(&self, cancel: &CancelToken) -> Result<(), BuildError> {
    info!("downloading modules");
    let mut command = Command::new(&self.go);
    command.args(["mod", "download"]);
    run_command(command, cancel).await
  }

  pub(crate) fn command(&self, request: &BuildRequest) -> Command {
    let mut command = Command::new(&self.go);
    command
      .arg("build")
      .arg("-o")
      .arg(&request.output)
      .arg("-ldflags")
      .arg(format!("-X \"{}={}\"", self.version_var, request.version))
      .arg(&request.main)
      .env("GOOS", &request.target.os)
      .env("GOARCH", &request.target.arch);

    if !request.target.variant.is_empty() {
      if let Some(var) = variant_env(&request.target.arch) {
        command.env(var, &request.target.variant);
      }
    }

    command
  }
}

impl BuildStep for GoBuildStep {
  async fn build(&self, request: &BuildRequest, cancel: &CancelToken) -> Result<(), BuildError> {
    run_command(self.command(request), cancel).await
  }
}

/// Environment variable carrying the sub-architecture for `arch`.
fn variant_env(arch: &str) -> Option<&'static str> {
  match arch {
    "arm" => Some("GOARM"),
    "amd64" => Some("GOAMD64"),
    "386" => Some("GO386"),
    "mips" | "mipsle" => Some("GOMIPS"),
    _ => None,
  }
}

/// Run a command to completion with inherited stdio, killing it on cancel.
pub(crate) async fn run_command(mut command: Command, cancel: &CancelToken) -> Result<(), BuildError> {
  let description = describe(&command);
  let program = command.as_std().get_program().to_string_lossy().to_string();

  command
    .stdin(Stdio::null())
    .stdout(Stdio::inherit())
    .stderr(Stdio::inherit())
    .kill_on_drop(true);

  debug!(cmd = %description, "spawning process");
  let mut child = command.spawn().map_err(|source| BuildError::Spawn { program, source })?;

  tokio::select! {
    status = child.wait() => {
      let status = status.map_err(|source| BuildError::Spawn {
        program: description.clone(),
        source,
      })?;
      if status.success() {
        Ok(())
      } else {
        Err(BuildError::CmdFailed {
          cmd: description,
          code: status.code(),
        })
      }
    }
    _ = cancel.cancelled() => {
      debug!(cmd = %description, "cancelled, killing process");
      if let Err(e) = child.kill().await {
        warn!(cmd = %description, error = %e, "failed to kill process");
      }
      Err(BuildError::Cancelled)
    }
  }
}

fn describe(command: &Command) -> String {
  let std = command.as_std();
  std::iter::once(std.get_program())
    .chain(std.get_args())
    .map(|s| s.to_string_lossy())
    .collect::<Vec<_>>()
    .join(" ")
}
