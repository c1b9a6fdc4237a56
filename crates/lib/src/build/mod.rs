//! Concurrent build orchestration.
//!
//! [`build`] runs a bounded pool of workers over a job queue of targets:
//!
//! - `min(targets, concurrency)` workers pull targets FIFO and hand each to a
//!   [`BuildStep`]
//! - the dispatcher enqueues targets while draining results, so a full result
//!   channel never deadlocks dispatch
//! - the first failed target cancels the run: workers stop pulling jobs and
//!   in-flight toolchain processes are asked to terminate
//! - per-target failures are reported inside [`BuildResult`]s; only setup
//!   failures and run-level cancellation fail [`build`] itself
//!
//! Results arrive in completion order. Targets never dispatched are listed in
//! [`BuildReport::not_attempted`].

mod cancel;
mod queue;
mod step;
mod types;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub use cancel::CancelToken;
pub use step::{BuildStep, GoBuildStep};
pub use types::{BuildConfig, BuildError, BuildReport, BuildRequest, BuildResult};

use crate::target::Target;
use queue::{JobReceiver, job_queue};

/// Build every target with at most `config.concurrency` builds in flight.
///
/// `shutdown` is the caller's run-level cancellation (interrupt, timeout);
/// when it fires the run is abandoned and [`BuildError::Cancelled`] returned.
///
/// # Errors
///
/// Returns an error if the configuration is incomplete, the output directory
/// cannot be created, or `shutdown` is cancelled.
pub async fn build<S: BuildStep>(
  config: &BuildConfig,
  targets: &[Target],
  version: &str,
  step: Arc<S>,
  shutdown: &CancelToken,
) -> Result<BuildReport, BuildError> {
  config.validate()?;

  tokio::fs::create_dir_all(&config.out_dir)
    .await
    .map_err(|source| BuildError::CreateDir {
      path: config.out_dir.clone(),
      source,
    })?;

  let targets = dedup(targets);
  if targets.is_empty() {
    return Ok(BuildReport::default());
  }

  let worker_count = targets.len().min(config.concurrency);
  info!(targets = targets.len(), workers = worker_count, version, "starting builds");

  let jobs_cancel = CancelToken::new();
  let (job_tx, job_rx) = job_queue(targets.len());
  let (result_tx, mut result_rx) = mpsc::channel::<BuildResult>(worker_count);

  let config = Arc::new(config.clone());
  let version: Arc<str> = Arc::from(version);
  let mut workers = JoinSet::new();
  for id in 0..worker_count {
    workers.spawn(run_worker(
      id,
      Arc::clone(&step),
      Arc::clone(&config),
      Arc::clone(&version),
      job_rx.clone(),
      result_tx.clone(),
      jobs_cancel.clone(),
    ));
  }
  drop(job_rx);
  drop(result_tx);

  let mut collector = Collector::new(jobs_cancel.clone());

  'dispatch: for target in &targets {
    loop {
      if jobs_cancel.is_cancelled() {
        debug!("run cancelled, stopping dispatch");
        break 'dispatch;
      }

      tokio::select! {
        _ = shutdown.cancelled() => {
          jobs_cancel.cancel();
          return Err(BuildError::Cancelled);
        }
        permit = job_tx.reserve() => {
          match permit {
            Some(permit) => {
              permit.send(target.clone());
              continue 'dispatch;
            }
            None => break 'dispatch,
          }
        }
        Some(result) = result_rx.recv() => collector.handle(result),
      }
    }
  }

  // No more jobs will be produced.
  job_tx.close();

  while !workers.is_empty() {
    tokio::select! {
      _ = shutdown.cancelled() => {
        jobs_cancel.cancel();
        return Err(BuildError::Cancelled);
      }
      Some(result) = result_rx.recv() => collector.handle(result),
      Some(joined) = workers.join_next() => {
        if let Err(e) = joined {
          jobs_cancel.cancel();
          return Err(BuildError::Worker(e.to_string()));
        }
      }
    }
  }

  // Results buffered by workers that finished before we drained them.
  while let Ok(result) = result_rx.try_recv() {
    collector.handle(result);
  }

  Ok(collector.finish(&targets))
}

/// Pull jobs until the queue closes or the run is cancelled.
///
/// A failed target cancels the run before its result is reported, so no other
/// worker picks up a new job after it.
async fn run_worker<S: BuildStep>(
  id: usize,
  step: Arc<S>,
  config: Arc<BuildConfig>,
  version: Arc<str>,
  jobs: JobReceiver,
  results: mpsc::Sender<BuildResult>,
  cancel: CancelToken,
) {
  loop {
    let target = tokio::select! {
      biased;
      _ = cancel.cancelled() => break,
      job = jobs.next() => match job {
        Some(target) => target,
        None => break,
      },
    };

    let outcome = build_target(step.as_ref(), &config, &version, &target, &cancel).await;
    let failed = outcome.is_err();
    if failed {
      cancel.cancel();
    }

    if results.send(BuildResult { target, outcome }).await.is_err() || failed {
      break;
    }
  }
  debug!(worker = id, "worker done");
}

async fn build_target<S: BuildStep>(
  step: &S,
  config: &BuildConfig,
  version: &str,
  target: &Target,
  cancel: &CancelToken,
) -> Result<std::path::PathBuf, BuildError> {
  let dir = config.target_dir(target);
  tokio::fs::create_dir_all(&dir)
    .await
    .map_err(|source| BuildError::CreateDir { path: dir, source })?;

  let output = config.binary_path(target);
  info!(target = %target, binary = %output.display(), "building target");

  let request = BuildRequest {
    target: target.clone(),
    main: config.main.clone(),
    output: output.clone(),
    version: version.to_string(),
  };
  step.build(&request, cancel).await?;

  Ok(output)
}

/// Accumulates results and triggers fail-fast cancellation.
struct Collector {
  cancel: CancelToken,
  results: Vec<BuildResult>,
  failed: bool,
}

impl Collector {
  fn new(cancel: CancelToken) -> Self {
    Self {
      cancel,
      results: Vec::new(),
      failed: false,
    }
  }

  fn handle(&mut self, result: BuildResult) {
    match &result.outcome {
      Ok(path) => info!(target = %result.target, binary = %path.display(), "built"),
      Err(e) => {
        error!(target = %result.target, error = %e, "build failed");
        if !self.failed {
          self.failed = true;
          warn!("cancelling outstanding builds");
          self.cancel.cancel();
        }
      }
    }
    self.results.push(result);
  }

  fn finish(self, targets: &[Target]) -> BuildReport {
    let reported: HashSet<&Target> = self.results.iter().map(|r| &r.target).collect();
    let not_attempted: Vec<Target> = targets.iter().filter(|t| !reported.contains(t)).cloned().collect();
    if !not_attempted.is_empty() {
      warn!(count = not_attempted.len(), "targets not attempted");
    }
    BuildReport {
      results: self.results,
      not_attempted,
    }
  }
}

/// Drop repeated targets, keeping the first occurrence.
fn dedup(targets: &[Target]) -> Vec<Target> {
  let mut seen = HashSet::new();
  let mut unique = Vec::with_capacity(targets.len());
  for target in targets {
    if seen.insert(target) {
      unique.push(target.clone());
    } else {
      warn!(target = %target, "ignoring duplicate target");
    }
  }
  unique
}
