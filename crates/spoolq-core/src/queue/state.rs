//! Job lifecycle state, derived from which directory a file is in.

use serde::{Deserialize, Serialize};

/// Where a job file currently lives.
///
/// State transitions:
/// - Staging -> Pending                      (add: tmp -> new)
/// - Pending -> Claimed                      (pop: new -> cur)
/// - Claimed -> (deleted)                    (success, retries exhausted)
/// - Claimed -> Pending                      (requeue under a fresh name)
/// - any -> (deleted)                        (sweep of expired files)
///
/// There is no other record of state: a file is in exactly one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Being written. Never visible to consumers.
    Staging,

    /// Visible and waiting for a consumer.
    Pending,

    /// Claimed by exactly one consumer.
    Claimed,
}

impl JobState {
    pub const ALL: [JobState; 3] = [JobState::Pending, JobState::Staging, JobState::Claimed];

    pub fn dir_name(self) -> &'static str {
        match self {
            JobState::Staging => "tmp",
            JobState::Pending => "new",
            JobState::Claimed => "cur",
        }
    }
}
