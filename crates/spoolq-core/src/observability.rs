use serde::{Deserialize, Serialize};

/// Per-state file counts of one queue, as returned by `Queue::counts`.
///
/// Only files with valid queue names are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Eligible for `pop`.
    pub pending: usize,

    /// In `new` but past the ttl; waiting for `empty`.
    pub expired: usize,

    pub staging: usize,
    pub claimed: usize,
}

impl QueueCounts {
    pub fn total(&self) -> usize {
        self.pending + self.expired + self.staging + self.claimed
    }
}
