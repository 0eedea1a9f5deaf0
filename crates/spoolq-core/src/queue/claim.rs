//! Claim: the atomic `new -> cur` rename that grants exclusive processing.

use std::path::{Path, PathBuf};

use crate::domain::{Envelope, JobFileName};
use crate::ports::{Storage, StorageError};

/// Try to take ownership of a pending file by renaming it into `cur`.
///
/// Returns `Ok(false)` when the source is gone (another consumer won the
/// race, or the file was swept). Every other failure is propagated.
pub async fn try_claim<S: Storage + ?Sized>(
    storage: &S,
    pending: &Path,
    claimed: &Path,
) -> Result<bool, StorageError> {
    match storage.rename(pending, claimed).await {
        Ok(()) => Ok(true),
        Err(StorageError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// A job this consumer owns. Its file sits at `path` inside `cur`.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub envelope: Envelope,

    /// Name the file was claimed under. Its id, not `envelope.id`, names
    /// the file on requeue: the JSON content is not trusted for paths.
    pub name: JobFileName,

    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryStorage;

    #[tokio::test]
    async fn only_first_claim_wins() {
        let storage = InMemoryStorage::new();
        storage.insert("/q/new/1-a.json", "{}");
        storage.insert("/q/cur/.keep", "");

        let from = Path::new("/q/new/1-a.json");
        let to = Path::new("/q/cur/1-a.json");

        assert!(try_claim(&storage, from, to).await.unwrap());
        assert!(!try_claim(&storage, from, to).await.unwrap());
    }

    #[tokio::test]
    async fn other_errors_propagate() {
        let storage = InMemoryStorage::new();
        storage.insert("/q/new/1-a.json", "{}");
        storage.insert("/q/cur/.keep", "");
        storage.fail_renames(true);

        let err = try_claim(&storage, Path::new("/q/new/1-a.json"), Path::new("/q/cur/1-a.json"))
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
        assert!(storage.exists("/q/new/1-a.json"));
    }

    #[tokio::test]
    async fn missing_claim_dir_reads_as_lost_race() {
        let storage = InMemoryStorage::new();
        storage.insert("/q/new/1-a.json", "{}");

        let claimed = try_claim(&storage, Path::new("/q/new/1-a.json"), Path::new("/q/cur/1-a.json"))
            .await
            .unwrap();
        assert!(!claimed);
        assert!(storage.exists("/q/new/1-a.json"));
    }
}
