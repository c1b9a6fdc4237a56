//! Job queue shared between the dispatcher and build workers.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::target::Target;

/// Create a job queue holding up to `capacity` targets.
///
/// The queue closes when the [`JobSender`] is dropped; workers then drain the
/// remaining jobs and see `None`.
pub(crate) fn job_queue(capacity: usize) -> (JobSender, JobReceiver) {
  let (tx, rx) = mpsc::channel(capacity.max(1));
  (JobSender { tx }, JobReceiver { rx: Arc::new(Mutex::new(rx)) })
}

/// Producer side, owned by the dispatcher.
pub(crate) struct JobSender {
  tx: mpsc::Sender<Target>,
}

impl JobSender {
  /// Wait for a free slot. Cancel-safe: nothing is enqueued until the permit
  /// is used.
  pub(crate) async fn reserve(&self) -> Option<mpsc::Permit<'_, Target>> {
    self.tx.reserve().await.ok()
  }

  pub(crate) fn close(self) {
    drop(self);
  }
}

/// Consumer side, cloned into every worker.
///
/// Jobs are handed out FIFO to whichever worker asks next. The mutex only
/// serializes access to the receiver: both `lock()` and `recv()` are
/// cancel-safe, so a worker dropped while waiting (cancellation `select!`)
/// releases the lock without consuming a job.
#[derive(Clone)]
pub(crate) struct JobReceiver {
  rx: Arc<Mutex<mpsc::Receiver<Target>>>,
}

impl JobReceiver {
  pub(crate) async fn next(&self) -> Option<Target> {
    self.rx.lock().await.recv().await
  }
}
