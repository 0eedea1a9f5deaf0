//! Filename codec: `<updatedAt epoch millis, 13 digits><SEPARATOR><id>.json`.
//!
//! The timestamp prefix is the sort key. Anything that does not match the
//! grammar is not part of the queue and is ignored by every operation.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::ids::JobId;

pub const SEPARATOR: char = '-';
pub const EXTENSION: &str = ".json";

const TIMESTAMP_DIGITS: usize = 13;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobFileName {
    updated_at: DateTime<Utc>,
    id: JobId,
}

impl JobFileName {
    pub fn new(updated_at: DateTime<Utc>, id: JobId) -> Self {
        Self { updated_at, id }
    }

    /// Parse a directory entry name. Returns `None` for anything that is not
    /// a queue file (wrong extension, malformed prefix, empty id).
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(EXTENSION)?;
        let (timestamp, id) = stem.split_once(SEPARATOR)?;
        if timestamp.len() != TIMESTAMP_DIGITS || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if id.is_empty() {
            return None;
        }
        let millis: i64 = timestamp.parse().ok()?;
        let updated_at = DateTime::from_timestamp_millis(millis)?;
        Some(Self::new(updated_at, JobId::new(id)))
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Whether this file is older than `now - ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Option<Duration>) -> bool {
        is_expired(self.updated_at, now, ttl)
    }
}

impl fmt::Display for JobFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:0width$}{SEPARATOR}{}{EXTENSION}",
            self.updated_at.timestamp_millis(),
            self.id,
            width = TIMESTAMP_DIGITS
        )
    }
}

/// `None` ttl never expires. A ttl too large for chrono never expires either.
pub fn is_expired(timestamp: DateTime<Utc>, now: DateTime<Utc>, ttl: Option<Duration>) -> bool {
    let Some(ttl) = ttl else {
        return false;
    };
    match TimeDelta::from_std(ttl) {
        Ok(ttl) => now.signed_duration_since(timestamp) > ttl,
        Err(_) => false,
    }
}
