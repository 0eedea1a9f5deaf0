//! Snapshot of the pending directory.
//!
//! The listing is recomputed from the directory on every call and never
//! cached: other processes mutate the same directory concurrently.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{JobFileName, JobId};

/// A pending job as seen in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingJob {
    pub id: JobId,
    pub updated_at: DateTime<Utc>,

    /// Full path inside `new` at listing time.
    pub path: PathBuf,
}

impl PendingJob {
    pub fn file_name(&self) -> JobFileName {
        JobFileName::new(self.updated_at, self.id.clone())
    }
}

/// Keep the valid, unexpired names and order them oldest first.
///
/// Ties on `updated_at` are broken by id so the order is deterministic.
pub fn select_pending<I>(dir: &Path, names: I, now: DateTime<Utc>, ttl: Option<Duration>) -> Vec<PendingJob>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut jobs: Vec<PendingJob> = names
        .into_iter()
        .filter_map(|name| {
            let name = name.as_ref();
            let parsed = JobFileName::parse(name)?;
            if parsed.is_expired(now, ttl) {
                return None;
            }
            Some(PendingJob {
                id: parsed.id().clone(),
                updated_at: parsed.updated_at(),
                path: dir.join(name),
            })
        })
        .collect();

    jobs.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.cmp(&b.id)));
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const NOW: i64 = 1_700_000_000_000;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(NOW).unwrap()
    }

    fn ids(jobs: &[PendingJob]) -> Vec<&str> {
        jobs.iter().map(|j| j.id.as_str()).collect()
    }

    #[test]
    fn sorts_oldest_first() {
        let names = [
            format!("{}-c.json", NOW - 10),
            format!("{}-a.json", NOW - 30),
            format!("{}-b.json", NOW - 20),
        ];
        let jobs = select_pending(Path::new("/q/new"), &names, now(), None);
        assert_eq!(ids(&jobs), vec!["a", "b", "c"]);
        assert_eq!(jobs[0].path, PathBuf::from(format!("/q/new/{}-a.json", NOW - 30)));
    }

    #[test]
    fn ties_break_on_id() {
        let names = [format!("{NOW}-b.json"), format!("{NOW}-a.json")];
        let jobs = select_pending(Path::new("/q/new"), &names, now(), None);
        assert_eq!(ids(&jobs), vec!["a", "b"]);
    }

    #[test]
    fn drops_malformed_and_expired() {
        let names = vec![
            "000000-test.json".to_string(),
            "1517771214392-test.yml".to_string(),
            format!("{}-old.json", NOW - 61_000),
            format!("{}-fresh.json", NOW - 1_000),
        ];
        let jobs = select_pending(Path::new("/q/new"), &names, now(), Some(Duration::from_secs(60)));
        assert_eq!(ids(&jobs), vec!["fresh"]);
    }

    #[test]
    fn no_ttl_keeps_old_files() {
        let names = ["0000000000001-ancient.json"];
        let jobs = select_pending(Path::new("/q/new"), names, now(), None);
        assert_eq!(ids(&jobs), vec!["ancient"]);
    }

    #[test]
    fn file_name_reconstructs_entry() {
        let names = [format!("{NOW}-x.json")];
        let jobs = select_pending(Path::new("/q/new"), &names, now(), None);
        assert_eq!(jobs[0].file_name().to_string(), names[0]);
    }
}
