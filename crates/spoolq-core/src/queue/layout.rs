//! On-disk layout of one named queue.

use std::path::{Path, PathBuf};

use super::JobState;
use crate::domain::JobFileName;

/// `<base>/<name>/{tmp,new,cur}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueLayout {
    root: PathBuf,
    tmp: PathBuf,
    new: PathBuf,
    cur: PathBuf,
}

impl QueueLayout {
    pub fn new(base: impl AsRef<Path>, name: &str) -> Self {
        let root = base.as_ref().join(name);
        Self {
            tmp: root.join(JobState::Staging.dir_name()),
            new: root.join(JobState::Pending.dir_name()),
            cur: root.join(JobState::Claimed.dir_name()),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, state: JobState) -> &Path {
        match state {
            JobState::Staging => &self.tmp,
            JobState::Pending => &self.new,
            JobState::Claimed => &self.cur,
        }
    }

    pub fn path(&self, state: JobState, name: &JobFileName) -> PathBuf {
        self.dir(state).join(name.to_string())
    }
}
