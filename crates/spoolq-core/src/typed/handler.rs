//! Handler trait - 型付きペイロードを受け取る Handler
//!
//! # 学習ポイント
//! - ジェネリック trait (Handler<T>)
//! - Type erasure パターン (TypedHandler<T, H> → JobHandler)

use std::marker::PhantomData;

use async_trait::async_trait;
use tracing::warn;

use super::job::Job;
use crate::domain::Envelope;
use crate::error::BoxError;
use crate::handler::JobHandler;

/// Handler は decode 済みの Job を処理する
///
/// # 使用例
/// ```ignore
/// struct SendMailHandler;
///
/// #[async_trait]
/// impl Handler<SendMail> for SendMailHandler {
///     async fn handle(&self, job: SendMail, envelope: &Envelope) -> Result<(), BoxError> {
///         println!("{} -> {}", envelope.id, job.to);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<T: Job>: Send + Sync {
    async fn handle(&self, job: T, envelope: &Envelope) -> Result<(), BoxError>;
}

/// `Handler<T>` を `JobHandler` として `Queue::pop` に渡すためのラッパー
///
/// payload が `T` として decode できない場合は handler を呼ばずに失敗扱い
/// （retry policy に従って requeue / discard される）。
pub struct TypedHandler<T: Job, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Job, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }

    pub fn into_inner(self) -> H {
        self.handler
    }
}

#[async_trait]
impl<T: Job, H: Handler<T>> JobHandler for TypedHandler<T, H> {
    async fn handle(&self, envelope: &Envelope) -> Result<(), BoxError> {
        let job: T = envelope.payload_as().map_err(|e| {
            warn!(job = T::NAME, id = %envelope.id, error = %e, "payload does not decode");
            e
        })?;
        self.handler.handle(job, envelope).await
    }
}
