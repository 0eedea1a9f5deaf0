//! Queue configuration.
//!
//! The serialized form matches what producers and consumers in other
//! languages share: `ttl` in milliseconds (`0` disables expiry) and
//! `retries` as a signed count (negative disables the cap).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_DIR: &str = "output";
pub const DEFAULT_TTL_MS: u64 = 86_400 * 1000;
pub const DEFAULT_RETRIES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Base directory; each named queue lives in `<dir>/<name>`.
    pub dir: PathBuf,

    /// Milliseconds after which a pending job is expired. `0` disables.
    pub ttl: u64,

    /// Requeue attempts before a failing job is discarded. Negative disables.
    pub retries: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_DIR),
            ttl: DEFAULT_TTL_MS,
            retries: DEFAULT_RETRIES,
        }
    }
}

impl QueueConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// `Duration::ZERO` disables expiry.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// `None` disables the retry cap.
    pub fn with_retries(mut self, retries: Option<u32>) -> Self {
        self.retries = retries.map_or(-1, i64::from);
        self
    }

    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl > 0).then(|| Duration::from_millis(self.ttl))
    }

    pub fn retry_limit(&self) -> Option<u32> {
        u32::try_from(self.retries).ok()
    }
}
