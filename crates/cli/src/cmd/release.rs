//! Implementation of the `mbuild release` command.
//!
//! Runs the full pipeline:
//! - resolves the target list (host platform when none is given)
//! - determines the version from CI metadata or repository history
//! - downloads modules, then builds every target concurrently
//! - archives each built binary, even when other targets failed
//! - publishes the archives as release assets when credentials are present
//!   and every target built

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Args;
use clap::builder::TypedValueParser;
use tracing::{info, warn};

use mbuild_lib::archive::{ArchiveConfig, Archiver};
use mbuild_lib::build::{BuildConfig, BuildReport, CancelToken, GoBuildStep, build};
use mbuild_lib::ci::CiContext;
use mbuild_lib::consts::{DEFAULT_CONCURRENCY, DEFAULT_OUT_DIR, DEFAULT_README};
use mbuild_lib::platform::host_target;
use mbuild_lib::publish::{GitHubPublisher, Publisher};
use mbuild_lib::target::{Target, parse_platforms};
use mbuild_lib::version::{determine_version, normalize};

use super::UsageError;
use crate::output::{format_bytes, format_duration, print_failure, print_info, print_stat, print_success, print_warning};

#[derive(Debug, Args)]
pub struct ReleaseArgs {
  /// Platforms to build, as OS/ARCH[/VARIANT] (default: host platform)
  #[arg(long = "platform", env = "PLATFORM", value_delimiter = ',')]
  pub platforms: Vec<String>,

  /// Package to build (e.g. ./cmd/tool)
  #[arg(long, env = "BUILDER_MAIN")]
  pub builder_main: String,

  /// Name of the produced executable
  #[arg(long, env = "BUILDER_BINARY")]
  pub builder_binary: String,

  /// Root directory for per-target build output
  #[arg(long, env = "BUILDER_OUT_DIR", default_value = DEFAULT_OUT_DIR)]
  pub builder_out_dir: PathBuf,

  /// Maximum number of concurrent builds
  #[arg(
    long,
    env = "BUILDER_CONCURRENCY",
    default_value_t = DEFAULT_CONCURRENCY,
    value_parser = clap::value_parser!(u16).range(1..).map(usize::from),
  )]
  pub builder_concurrency: usize,

  /// Directory receiving the release archives
  #[arg(long, env = "ARCHIVE_OUT_DIR", default_value = DEFAULT_OUT_DIR)]
  pub archive_out_dir: PathBuf,

  /// Project name used in archive names (default: binary name)
  #[arg(long, env = "PROJECT")]
  pub project: Option<String>,

  /// Companion file added to each archive when present
  #[arg(long, env = "README", default_value = DEFAULT_README)]
  pub readme: PathBuf,

  /// Repository used to derive the version
  #[arg(long, default_value = ".")]
  pub repo: PathBuf,

  /// Go toolchain executable
  #[arg(long, env = "MBUILD_GO", default_value = "go")]
  pub go: String,

  /// Package variable receiving the version via -ldflags -X
  #[arg(long, env = "MBUILD_VERSION_VAR", default_value = "main.Version")]
  pub version_var: String,

  /// Abort the run after this long (e.g. 10m, 1h30m)
  #[arg(long, env = "MBUILD_TIMEOUT", value_parser = humantime::parse_duration)]
  pub timeout: Option<Duration>,

  /// Build and archive without publishing a release
  #[arg(long)]
  pub no_publish: bool,
}

/// Execute the release command.
pub fn cmd_release(args: ReleaseArgs) -> Result<()> {
  let started = Instant::now();

  let targets = resolve_targets(&args.platforms)?;
  let ci = CiContext::from_env();
  let version = determine_version(&ci, &args.repo).context("Failed to determine version")?;
  let project = args.project.clone().unwrap_or_else(|| args.builder_binary.clone());

  print_info(&format!(
    "Releasing {} {} for {} target(s)",
    project,
    version,
    targets.len()
  ));

  let config = BuildConfig {
    main: args.builder_main.clone(),
    binary: args.builder_binary.clone(),
    out_dir: args.builder_out_dir.clone(),
    concurrency: args.builder_concurrency,
  };
  let step = Arc::new(
    GoBuildStep::new()
      .with_go(args.go.clone())
      .with_version_var(args.version_var.clone()),
  );

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let shutdown = CancelToken::new();

  let report = rt.block_on(async {
    watch_shutdown(&shutdown, args.timeout);
    step.prepare(&shutdown).await.context("Failed to download modules")?;
    build(&config, &targets, normalize(&version), Arc::clone(&step), &shutdown)
      .await
      .context("Build failed")
  })?;

  print_report(&report);

  let archiver = Archiver::new(
    ArchiveConfig {
      out_dir: args.archive_out_dir.clone(),
    },
    project,
    &version,
  )
  .with_readme(args.readme.clone());
  let archives = archiver
    .archive_build_results(&report)
    .context("Failed to write archives")?;

  if !archives.is_empty() {
    println!();
    println!("Archives:");
  }
  for archive in &archives {
    let size = std::fs::metadata(&archive.archive).map(|m| m.len()).unwrap_or(0);
    print_stat(&archive.target.to_string(), &format!("{} ({})", archive.archive.display(), format_bytes(size)));
  }

  // A partial release is never published; built targets stay archived on disk.
  if !report.is_success() {
    bail!(
      "{} of {} target(s) did not build",
      report.failed().count() + report.not_attempted.len(),
      targets.len()
    );
  }

  let paths: Vec<PathBuf> = archives.into_iter().map(|a| a.archive).collect();
  if args.no_publish {
    info!("publishing disabled");
  } else {
    match GitHubPublisher::from_ci(&ci).context("Invalid publishing configuration")? {
      Some(publisher) => {
        let release = rt
          .block_on(publisher.publish(&paths, &version))
          .with_context(|| format!("Failed to publish release {}", version))?;
        println!();
        print_success(&format!("Published {} asset(s) to {}", paths.len(), release.html_url));
      }
      None => print_warning("No publishing credentials found, skipping publish"),
    }
  }

  println!();
  print_success(&format!("Release {} complete in {}", version, format_duration(started.elapsed())));
  Ok(())
}

/// Parse `--platform` values, defaulting to the host platform.
fn resolve_targets(platforms: &[String]) -> Result<Vec<Target>> {
  let platforms: Vec<&str> = platforms.iter().map(|p| p.trim()).filter(|p| !p.is_empty()).collect();

  if platforms.is_empty() {
    let host = host_target().ok_or_else(|| UsageError("unsupported host platform, pass --platform".to_string()))?;
    info!(target = %host, "no platforms given, building for host");
    return Ok(vec![host]);
  }

  Ok(parse_platforms(&platforms)?)
}

/// Cancel the run on Ctrl-C or when the timeout elapses.
fn watch_shutdown(shutdown: &CancelToken, timeout: Option<Duration>) {
  let token = shutdown.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling builds");
      token.cancel();
    }
  });

  if let Some(timeout) = timeout {
    let token = shutdown.clone();
    tokio::spawn(async move {
      tokio::time::sleep(timeout).await;
      warn!(timeout = %humantime::format_duration(timeout), "timed out, cancelling builds");
      token.cancel();
    });
  }
}

fn print_report(report: &BuildReport) {
  println!();
  println!("Builds:");
  for result in &report.results {
    match &result.outcome {
      Ok(path) => print_success(&format!("{} {}", result.target, path.display())),
      Err(e) => print_failure(&format!("{} {}", result.target, e)),
    }
  }
  for target in &report.not_attempted {
    print_stat(&target.to_string(), "not attempted");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_platforms_default_to_host() {
    let targets = resolve_targets(&[" ".to_string()]).unwrap();
    assert_eq!(targets, vec![host_target().unwrap()]);
  }

  #[test]
  fn platforms_are_trimmed_and_parsed() {
    let targets = resolve_targets(&["linux/amd64".to_string(), " darwin/arm64 ".to_string()]).unwrap();
    assert_eq!(
      targets,
      vec![Target::new("linux", "amd64", ""), Target::new("darwin", "arm64", "")]
    );
  }

  #[test]
  fn bad_platform_is_a_target_error() {
    let err = resolve_targets(&["linux".to_string()]).unwrap_err();
    assert!(err.downcast_ref::<mbuild_lib::target::TargetError>().is_some());
  }
}
