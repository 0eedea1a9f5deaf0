use std::path::PathBuf;

use thiserror::Error;

use crate::domain::Envelope;
use crate::ports::StorageError;
use crate::queue::Disposition;

/// Error type returned by caller-supplied handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = QueueError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("encode envelope: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Handler(#[from] HandlerFailure),
}

impl QueueError {
    /// The handler failure, if this error came from the caller's handler.
    pub fn as_handler_failure(&self) -> Option<&HandlerFailure> {
        match self {
            QueueError::Handler(failure) => Some(failure),
            _ => None,
        }
    }
}

/// A handler rejected a job.
///
/// By the time this is returned the job has already been requeued or
/// discarded on disk; `disposition` says which.
#[derive(Debug, Error)]
#[error("job {} failed ({disposition}): {source}", .envelope.id)]
pub struct HandlerFailure {
    /// The envelope as it was handed to the handler.
    pub envelope: Envelope,
    pub disposition: Disposition,
    #[source]
    pub source: BoxError,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
