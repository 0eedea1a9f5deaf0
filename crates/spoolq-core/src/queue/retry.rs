//! Retry policy: decides whether a failed job goes back to the queue.

use std::fmt;

/// Retry policy for failed jobs.
///
/// There is no backoff delay: a requeued job simply gets a fresh
/// `updatedAt`, which puts it at the back of the oldest-first ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of requeues. `None` retries forever.
    pub limit: Option<u32>,
}

impl RetryPolicy {
    pub fn new(limit: Option<u32>) -> Self {
        Self { limit }
    }

    /// Decide what happens to a job whose handler just failed.
    ///
    /// # Arguments
    /// * `retry` - The job's retry count before this failure.
    ///
    /// With `limit = 2` a job runs three times in total:
    /// - retry 0 fails: requeue as retry 1
    /// - retry 1 fails: requeue as retry 2
    /// - retry 2 fails: discard
    pub fn decide(&self, retry: u32) -> Disposition {
        match self.limit {
            Some(limit) if retry >= limit => Disposition::Discarded { retry },
            _ => Disposition::Requeued {
                retry: retry.saturating_add(1),
            },
        }
    }
}

/// What happened on disk to a job whose handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Rewritten and moved back to `new` with this retry count.
    Requeued { retry: u32 },

    /// Deleted permanently; `retry` is the count it had when it failed.
    Discarded { retry: u32 },
}

impl Disposition {
    pub fn is_requeued(self) -> bool {
        matches!(self, Disposition::Requeued { .. })
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Requeued { retry } => write!(f, "requeued, retry {retry}"),
            Disposition::Discarded { retry } => write!(f, "discarded after {retry} retries"),
        }
    }
}
