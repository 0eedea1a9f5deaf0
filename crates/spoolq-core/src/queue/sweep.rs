//! Expiry sweep across all three state directories.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{JobState, Queue};
use crate::domain::JobFileName;
use crate::error::Result;
use crate::ports::StorageError;

impl Queue {
    /// Delete every file in `new`, `tmp` and `cur` whose timestamp prefix is
    /// older than `now - ttl`. Returns how many files were removed.
    ///
    /// This is the only place orphans in `tmp` (interrupted `add`) and stale
    /// files in `cur` (crashed consumers) are reclaimed. With expiry disabled
    /// nothing is ever old enough, so the sweep does nothing.
    ///
    /// A directory that cannot be listed does not stop the others; the first
    /// such error is returned once all three were attempted.
    pub async fn empty(&self) -> Result<usize> {
        let Some(ttl) = self.config.ttl() else {
            debug!(queue = %self.name, "ttl disabled, nothing to sweep");
            return Ok(0);
        };

        let now = self.clock.now();
        let mut removed = 0;
        let mut first_error = None;
        for state in JobState::ALL {
            match self.sweep_dir(state, now, ttl).await {
                Ok(n) => removed += n,
                Err(err) => {
                    warn!(queue = %self.name, dir = state.dir_name(), error = %err, "sweep failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(removed),
        }
    }

    async fn sweep_dir(&self, state: JobState, now: DateTime<Utc>, ttl: Duration) -> Result<usize, StorageError> {
        let dir = self.layout.dir(state);
        let mut removed = 0;

        for name in self.storage.list(dir).await? {
            let Some(parsed) = JobFileName::parse(&name) else {
                continue;
            };
            if !parsed.is_expired(now, Some(ttl)) {
                continue;
            }

            let path = dir.join(&name);
            match self.storage.remove(&path).await {
                Ok(()) => {
                    removed += 1;
                    debug!(queue = %self.name, id = %parsed.id(), dir = state.dir_name(), "swept");
                }
                // 他の consumer が先に消した
                Err(StorageError::NotFound { .. }) => {}
                Err(err) => {
                    warn!(queue = %self.name, path = %path.display(), error = %err, "could not remove expired file");
                }
            }
        }
        Ok(removed)
    }
}
