//! Job handlers: the caller-supplied processing step of `pop`.

use std::future::Future;

use async_trait::async_trait;

use crate::domain::Envelope;
use crate::error::BoxError;

/// Processes one claimed job.
///
/// `Ok(())` deletes the job. `Err` requeues or discards it according to the
/// retry policy, then the error is handed back to the caller of `pop`.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, envelope: &Envelope) -> Result<(), BoxError>;
}

/// Adapter for async closures. See [`handler_fn`].
#[derive(Debug, Clone, Copy)]
pub struct FnHandler<F>(F);

/// Wrap an async closure taking an owned envelope.
///
/// ```ignore
/// queue.pop(&handler_fn(|env: Envelope| async move {
///     println!("{}", env.payload);
///     Ok::<_, BoxError>(())
/// })).await?;
/// ```
pub fn handler_fn<F, Fut, E>(f: F) -> FnHandler<F>
where
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut, E> JobHandler for FnHandler<F>
where
    F: Fn(Envelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    async fn handle(&self, envelope: &Envelope) -> Result<(), BoxError> {
        (self.0)(envelope.clone()).await.map_err(Into::into)
    }
}

/// Adapter for synchronous closures. See [`sync_handler`].
#[derive(Debug, Clone, Copy)]
pub struct SyncHandler<F>(F);

/// Wrap a blocking-free synchronous closure. Its `Err` takes the same
/// requeue/discard path as an async failure.
pub fn sync_handler<F, E>(f: F) -> SyncHandler<F>
where
    F: Fn(&Envelope) -> Result<(), E> + Send + Sync + 'static,
    E: Into<BoxError> + 'static,
{
    SyncHandler(f)
}

#[async_trait]
impl<F, E> JobHandler for SyncHandler<F>
where
    F: Fn(&Envelope) -> Result<(), E> + Send + Sync + 'static,
    E: Into<BoxError> + 'static,
{
    async fn handle(&self, envelope: &Envelope) -> Result<(), BoxError> {
        (self.0)(envelope).map_err(Into::into)
    }
}
