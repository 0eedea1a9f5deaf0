use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::QueueError;
use crate::handler::JobHandler;
use crate::queue::Queue;

/// Worker group handle.
/// - 各ワーカーは `pop` を繰り返し、空か handler 失敗なら `poll_interval` だけ待つ
/// - `request_shutdown()` で新しい job を取らなくなる
/// - `shutdown_and_join()` で処理中の handler の完了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers polling `queue`.
    pub fn spawn(n: usize, queue: Queue, handler: Arc<dyn JobHandler>, poll_interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let q = queue.clone();
            let h = Arc::clone(&handler);
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, q, h, poll_interval, &mut rx).await;
            });
            joins.push(join);
        }
        info!(queue = %queue.name(), workers = n, "workers started");

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Request shutdown for all workers.
    /// In-flight handlers are not cancelled; workers just stop claiming.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            if let Err(e) = j.await {
                error!(error = %e, "worker task ended abnormally");
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Queue,
    handler: Arc<dyn JobHandler>,
    poll_interval: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // pop は待たない。handler 実行中は shutdown で中断しない
        let idle = match queue.pop(handler.as_ref()).await {
            Ok(Some(envelope)) => {
                debug!(worker_id, id = %envelope.id, "job done");
                false
            }
            Ok(None) => true,
            Err(QueueError::Handler(failure)) => {
                warn!(worker_id, error = %failure, "job failed");
                true
            }
            Err(err) => {
                error!(worker_id, error = %err, "pop failed");
                true
            }
        };

        if idle {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    // sender dropped: group handle is gone
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }
    debug!(worker_id, "worker stopped");
}
