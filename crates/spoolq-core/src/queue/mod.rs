//! Queue engine.
//!
//! 状態はディレクトリだけが持つ:
//! - `tmp`: 書き込み中（consumer からは見えない）
//! - `new`: pending
//! - `cur`: claim 済み（処理中）
//!
//! # 不変条件
//! - `new` / `cur` のファイルをその場で書き換えない（別の場所に書いて rename）
//! - claim は `new -> cur` の rename のみ。NotFound は「負けた」扱い
//! - pending 一覧はキャッシュしない（毎回 readdir）

mod claim;
mod layout;
mod listing;
mod retry;
mod state;
mod sweep;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::QueueConfig;
use crate::domain::{Envelope, JobFileName};
use crate::error::{HandlerFailure, Result};
use crate::handler::JobHandler;
use crate::impls::LocalStorage;
use crate::observability::QueueCounts;
use crate::ports::{Clock, IdGenerator, Storage, StorageError, SystemClock, UlidGenerator};

pub use self::claim::{ClaimedJob, try_claim};
pub use self::layout::QueueLayout;
pub use self::listing::{PendingJob, select_pending};
pub use self::retry::{Disposition, RetryPolicy};
pub use self::state::JobState;

/// Handle to one named on-disk queue.
///
/// Cloning is cheap and every clone (or any other process pointed at the
/// same directory) may `add` and `pop` concurrently.
#[derive(Debug, Clone)]
pub struct Queue {
    name: String,
    config: QueueConfig,
    layout: QueueLayout,
    retry_policy: RetryPolicy,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

/// Builder for a [`Queue`] with injected ports.
#[derive(Debug)]
pub struct QueueBuilder {
    name: String,
    config: QueueConfig,
    storage: Option<Arc<dyn Storage>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

impl QueueBuilder {
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Create the three state directories and return the handle.
    ///
    /// Safe to call concurrently from several processes on the same queue.
    pub async fn open(self) -> Result<Queue> {
        let storage: Arc<dyn Storage> = match self.storage {
            Some(storage) => storage,
            None => Arc::new(LocalStorage::new()),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(Arc::clone(&clock))),
        };

        let layout = QueueLayout::new(&self.config.dir, &self.name);
        for state in JobState::ALL {
            storage.create_dir_all(layout.dir(state)).await?;
        }
        debug!(queue = %self.name, root = %layout.root().display(), "queue opened");

        Ok(Queue {
            retry_policy: RetryPolicy::new(self.config.retry_limit()),
            name: self.name,
            config: self.config,
            layout,
            storage,
            clock,
            ids,
        })
    }
}

impl Queue {
    /// Open `<config.dir>/<name>` on the local filesystem.
    pub async fn open(name: impl Into<String>, config: QueueConfig) -> Result<Self> {
        Self::builder(name, config).open().await
    }

    pub fn builder(name: impl Into<String>, config: QueueConfig) -> QueueBuilder {
        QueueBuilder {
            name: name.into(),
            config,
            storage: None,
            clock: None,
            ids: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &QueueLayout {
        &self.layout
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Enqueue a payload.
    ///
    /// The envelope is written into `tmp` and then renamed into `new`, so
    /// consumers never see a partially written file. A failed rename leaves
    /// an orphan in `tmp` for [`Queue::empty`] to reclaim.
    pub async fn add<T: Serialize + ?Sized>(&self, payload: &T) -> Result<Envelope> {
        let payload = serde_json::to_value(payload)?;
        let envelope = Envelope::new(self.ids.generate(), payload, self.clock.now_millis());
        let name = envelope.file_name();

        let staged = self.layout.path(JobState::Staging, &name);
        self.storage.write(&staged, &envelope.to_json()?).await?;
        debug!(queue = %self.name, id = %envelope.id, "written into tmp");

        let pending = self.layout.path(JobState::Pending, &name);
        self.storage.rename(&staged, &pending).await?;
        debug!(queue = %self.name, id = %envelope.id, "moved to new");

        Ok(envelope)
    }

    /// Pending jobs, oldest first. Expired and malformed entries are left out.
    ///
    /// This is a snapshot: by the time the caller acts on it another
    /// consumer may already have claimed some of these jobs.
    pub async fn list(&self) -> Result<Vec<PendingJob>> {
        let dir = self.layout.dir(JobState::Pending);
        let names = self.storage.list(dir).await?;
        Ok(select_pending(dir, names, self.clock.now(), self.config.ttl()))
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }

    /// Claim the oldest pending job and run `handler` on it.
    ///
    /// - `Ok(Some(envelope))`: handled and deleted
    /// - `Ok(None)`: nothing could be claimed in one pass over the snapshot
    /// - `Err(QueueError::Handler(..))`: the handler failed; the job has
    ///   already been requeued or discarded
    ///
    /// `pop` never waits: jobs another consumer holds are not retried.
    pub async fn pop<H>(&self, handler: &H) -> Result<Option<Envelope>>
    where
        H: JobHandler + ?Sized,
    {
        let Some(job) = self.claim_next().await? else {
            return Ok(None);
        };

        match handler.handle(&job.envelope).await {
            Ok(()) => {
                self.complete(&job).await;
                Ok(Some(job.envelope))
            }
            Err(source) => {
                let disposition = match self.settle_failure(&job).await {
                    Ok(disposition) => disposition,
                    Err(err) => {
                        error!(
                            queue = %self.name,
                            id = %job.envelope.id,
                            handler_error = %source,
                            error = %err,
                            "failed to settle failed job"
                        );
                        return Err(err);
                    }
                };
                Err(HandlerFailure {
                    envelope: job.envelope,
                    disposition,
                    source,
                }
                .into())
            }
        }
    }

    /// File counts per state.
    pub async fn counts(&self) -> Result<QueueCounts> {
        let now = self.clock.now();
        let ttl = self.config.ttl();
        let mut counts = QueueCounts::default();

        for state in JobState::ALL {
            let names = self.storage.list(self.layout.dir(state)).await?;
            for name in names.iter().filter_map(|n| JobFileName::parse(n)) {
                match state {
                    JobState::Pending if name.is_expired(now, ttl) => counts.expired += 1,
                    JobState::Pending => counts.pending += 1,
                    JobState::Staging => counts.staging += 1,
                    JobState::Claimed => counts.claimed += 1,
                }
            }
        }
        Ok(counts)
    }

    /// Walk the snapshot and take the first job whose rename succeeds.
    async fn claim_next(&self) -> Result<Option<ClaimedJob>> {
        for candidate in self.list().await? {
            let name = candidate.file_name();
            let claimed = self.layout.path(JobState::Claimed, &name);
            if !try_claim(self.storage.as_ref(), &candidate.path, &claimed).await? {
                debug!(queue = %self.name, id = %candidate.id, "lost claim race");
                continue;
            }

            let raw = match self.storage.read(&claimed).await {
                Ok(raw) => raw,
                Err(StorageError::NotFound { .. }) => continue,
                Err(e) => return Err(e.into()),
            };
            match Envelope::from_json(&raw) {
                Ok(envelope) => {
                    debug!(queue = %self.name, id = %envelope.id, retry = envelope.retry, "claimed");
                    return Ok(Some(ClaimedJob {
                        envelope,
                        name,
                        path: claimed,
                    }));
                }
                Err(err) => {
                    // 壊れたファイルは cur に残す（empty が回収する）
                    warn!(
                        queue = %self.name,
                        path = %claimed.display(),
                        error = %err,
                        "skipping unreadable envelope"
                    );
                }
            }
        }
        Ok(None)
    }

    /// Success: delete from `cur`. A failed delete does not undo the success.
    async fn complete(&self, job: &ClaimedJob) {
        match self.storage.remove(&job.path).await {
            Ok(()) => debug!(queue = %self.name, id = %job.envelope.id, "completed"),
            Err(err) => warn!(
                queue = %self.name,
                id = %job.envelope.id,
                error = %err,
                "completed, but could not delete claimed file"
            ),
        }
    }

    /// Failure: discard, or rewrite in place and rename back into `new`
    /// under a fresh name.
    async fn settle_failure(&self, job: &ClaimedJob) -> Result<Disposition> {
        let disposition = self.retry_policy.decide(job.envelope.retry);
        match disposition {
            Disposition::Discarded { retry } => {
                match self.storage.remove(&job.path).await {
                    Ok(()) | Err(StorageError::NotFound { .. }) => {}
                    Err(e) => return Err(e.into()),
                }
                debug!(queue = %self.name, id = %job.envelope.id, retry, "retries exhausted, discarded");
            }
            Disposition::Requeued { .. } => {
                let mut envelope = job.envelope.clone();
                envelope.mark_retry(self.clock.now_millis());
                self.storage.write(&job.path, &envelope.to_json()?).await?;

                let name = JobFileName::new(envelope.updated_at, job.name.id().clone());
                let pending = self.layout.path(JobState::Pending, &name);
                self.storage.rename(&job.path, &pending).await?;
                debug!(queue = %self.name, id = %job.name.id(), retry = envelope.retry, "requeued");
            }
        }
        Ok(disposition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BoxError, QueueError};
    use crate::handler::sync_handler;
    use crate::impls::InMemoryStorage;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    const T0: i64 = 1_700_000_000_000;

    struct Fixture {
        queue: Queue,
        storage: Arc<InMemoryStorage>,
        clock: FixedClock,
    }

    async fn fixture(config: QueueConfig) -> Fixture {
        let storage = Arc::new(InMemoryStorage::new());
        let clock = FixedClock::new(Utc.timestamp_millis_opt(T0).unwrap());
        let queue = Queue::builder("jobs", config.with_dir("/spool"))
            .storage(storage.clone())
            .clock(Arc::new(clock.clone()))
            .open()
            .await
            .unwrap();
        Fixture { queue, storage, clock }
    }

    fn ok() -> impl JobHandler {
        sync_handler(|_: &Envelope| Ok::<_, BoxError>(()))
    }

    fn failing() -> impl JobHandler {
        sync_handler(|_: &Envelope| Err("boom"))
    }

    #[tokio::test]
    async fn open_creates_state_dirs() {
        let f = fixture(QueueConfig::default()).await;
        for state in JobState::ALL {
            assert!(f.storage.list(f.queue.layout().dir(state)).await.unwrap().is_empty());
        }
        assert_eq!(f.queue.layout().root(), Path::new("/spool/jobs"));
    }

    #[tokio::test]
    async fn add_leaves_nothing_in_tmp() {
        let f = fixture(QueueConfig::default()).await;
        let env = f.queue.add(&serde_json::json!({"a": 1})).await.unwrap();

        assert_eq!(env.retry, 0);
        assert_eq!(env.created_at.timestamp_millis(), T0);
        assert!(f.storage.files_in("/spool/jobs/tmp").is_empty());
        assert_eq!(
            f.storage.files_in("/spool/jobs/new"),
            vec![f.queue.layout().path(JobState::Pending, &env.file_name())]
        );
    }

    #[tokio::test]
    async fn failed_rename_leaves_orphan_in_tmp_only() {
        let f = fixture(QueueConfig::default()).await;
        f.storage.fail_renames(true);

        assert!(matches!(f.queue.add(&1).await, Err(QueueError::Storage(_))));
        assert_eq!(f.storage.files_in("/spool/jobs/tmp").len(), 1);
        assert_eq!(f.queue.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn success_deletes_claimed_file() {
        let f = fixture(QueueConfig::default()).await;
        let added = f.queue.add(&"x").await.unwrap();

        let popped = f.queue.pop(&ok()).await.unwrap().unwrap();
        assert_eq!(popped, added);
        assert!(f.storage.files_in("/spool/jobs/cur").is_empty());
        assert!(f.queue.pop(&ok()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_delete_after_success_still_returns_envelope() {
        let f = fixture(QueueConfig::default()).await;
        let added = f.queue.add(&"x").await.unwrap();
        f.storage.fail_removes(true);

        let popped = f.queue.pop(&ok()).await.unwrap();
        assert_eq!(popped.map(|e| e.id), Some(added.id));
        assert_eq!(f.storage.files_in("/spool/jobs/cur").len(), 1);
    }

    #[tokio::test]
    async fn failure_requeues_with_fresh_name() {
        let f = fixture(QueueConfig::default()).await;
        let added = f.queue.add(&"x").await.unwrap();
        f.clock.advance(Duration::from_millis(250));

        let err = f.queue.pop(&failing()).await.unwrap_err();
        let failure = err.as_handler_failure().unwrap();
        assert_eq!(failure.disposition, Disposition::Requeued { retry: 1 });
        assert_eq!(failure.envelope, added);
        assert_eq!(failure.source.to_string(), "boom");

        let pending = f.queue.list().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].updated_at.timestamp_millis(), T0 + 250);
        assert!(f.storage.files_in("/spool/jobs/cur").is_empty());

        let again = f.queue.pop(&ok()).await.unwrap().unwrap();
        assert_eq!(again.retry, 1);
        assert_eq!(again.created_at, added.created_at);
    }

    #[tokio::test]
    async fn exhausted_job_is_discarded() {
        let f = fixture(QueueConfig::default().with_retries(Some(1))).await;
        f.queue.add(&"x").await.unwrap();

        let first = f.queue.pop(&failing()).await.unwrap_err();
        assert!(first.as_handler_failure().unwrap().disposition.is_requeued());

        let second = f.queue.pop(&failing()).await.unwrap_err();
        assert_eq!(
            second.as_handler_failure().unwrap().disposition,
            Disposition::Discarded { retry: 1 }
        );
        assert_eq!(f.queue.counts().await.unwrap(), QueueCounts::default());
    }

    #[tokio::test]
    async fn transport_error_during_settle_wins() {
        let f = fixture(QueueConfig::default()).await;
        f.queue.add(&"x").await.unwrap();
        f.storage.fail_writes(true);

        let err = f.queue.pop(&failing()).await.unwrap_err();
        assert!(matches!(err, QueueError::Storage(_)));
        assert_eq!(f.queue.counts().await.unwrap().claimed, 1);
    }

    #[tokio::test]
    async fn requeue_names_file_after_claimed_name() {
        let f = fixture(QueueConfig::default()).await;
        let raw = serde_json::json!({
            "id": "",
            "payload": 1,
            "retry": 0,
            "createdAt": "2023-11-14T22:13:19.000Z",
            "updatedAt": "2023-11-14T22:13:19.000Z"
        });
        f.storage.insert(format!("/spool/jobs/new/{}-good.json", T0 - 1_000), raw.to_string());

        let err = f.queue.pop(&failing()).await.unwrap_err();
        assert!(err.as_handler_failure().unwrap().disposition.is_requeued());

        assert_eq!(
            f.storage.files_in("/spool/jobs/new"),
            vec![PathBuf::from(format!("/spool/jobs/new/{T0}-good.json"))]
        );
        let pending = f.queue.list().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id.as_str(), "good");
    }

    #[tokio::test]
    async fn requeue_ignores_path_like_ids_in_content() {
        let f = fixture(QueueConfig::default()).await;
        let raw = serde_json::json!({
            "id": "../../escape",
            "payload": null,
            "retry": 0,
            "createdAt": "2023-11-14T22:13:19.000Z",
            "updatedAt": "2023-11-14T22:13:19.000Z"
        });
        f.storage.insert(format!("/spool/jobs/new/{}-abc.json", T0 - 1_000), raw.to_string());

        f.queue.pop(&failing()).await.unwrap_err();

        assert_eq!(f.queue.count().await.unwrap(), 1);
        assert!(f.storage.exists(format!("/spool/jobs/new/{T0}-abc.json")));
    }

    #[tokio::test]
    async fn corrupt_envelope_is_skipped() {
        let f = fixture(QueueConfig::default()).await;
        f.storage.insert(format!("/spool/jobs/new/{}-bad.json", T0 - 10), "{oops");
        let good = f.queue.add(&"fine").await.unwrap();

        let popped = f.queue.pop(&ok()).await.unwrap().unwrap();
        assert_eq!(popped.id, good.id);
        assert!(f.storage.exists(format!("/spool/jobs/cur/{}-bad.json", T0 - 10)));
    }

    #[tokio::test]
    async fn counts_split_pending_by_expiry() {
        let f = fixture(QueueConfig::default().with_ttl(Duration::from_secs(60))).await;
        f.queue.add(&1).await.unwrap();
        f.storage.insert(format!("/spool/jobs/new/{}-old.json", T0 - 61_000), "{}");
        f.storage.insert(format!("/spool/jobs/tmp/{T0}-staged.json"), "{}");
        f.storage.insert("/spool/jobs/cur/not-a-job.txt", "");

        let counts = f.queue.counts().await.unwrap();
        assert_eq!(
            counts,
            QueueCounts {
                pending: 1,
                expired: 1,
                staging: 1,
                claimed: 0,
            }
        );
        assert_eq!(f.queue.count().await.unwrap(), counts.pending);
    }
}
