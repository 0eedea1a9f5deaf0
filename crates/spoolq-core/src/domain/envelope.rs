//! Envelope - the persisted record wrapping a payload with queue metadata.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::filename::JobFileName;
use super::ids::JobId;

/// On-disk unit of work.
///
/// Serialized as `{id, payload, retry, createdAt, updatedAt}` with ISO-8601
/// timestamps. `updated_at` is the ordering key and the filename prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub id: JobId,
    pub payload: serde_json::Value,

    /// Number of failed processing attempts so far.
    pub retry: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(id: JobId, payload: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            id,
            payload,
            retry: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Decode the payload into a concrete type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.payload)
    }

    /// The filename this envelope lives under while in a queue directory.
    pub fn file_name(&self) -> JobFileName {
        JobFileName::new(self.updated_at, self.id.clone())
    }

    /// Record a failed attempt: bump the retry counter and move the
    /// ordering key to `now`.
    pub fn mark_retry(&mut self, now: DateTime<Utc>) {
        self.retry = self.retry.saturating_add(1);
        self.updated_at = now;
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
