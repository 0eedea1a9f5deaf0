//! LocalStorage - tokio::fs backed storage.
//!
//! Writes are fsynced before returning, and renames/removals fsync the
//! directory they touched, so a completed `add` survives power loss.
//! Directory syncs are best effort and only attempted on unix.

use std::path::Path;

use async_trait::async_trait;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::ports::{Storage, StorageError};

#[derive(Debug, Clone, Copy)]
pub struct LocalStorage {
    sync: bool,
    fail_dir_sync: bool,
}

impl LocalStorage {
    pub fn new() -> Self {
        Self {
            sync: true,
            fail_dir_sync: false,
        }
    }

    /// Skip fsync calls. Faster, but a crash may lose recent transitions.
    pub fn without_sync() -> Self {
        Self {
            sync: false,
            ..Self::new()
        }
    }

    /// Fsync the directory holding `path` after a rename or removal.
    ///
    /// The directory entry has already changed when this runs; a failure is
    /// logged and never returned.
    async fn sync_parent(&self, path: &Path) {
        if !self.sync || !cfg!(unix) {
            return;
        }
        let Some(dir) = path.parent() else {
            return;
        };
        if let Err(err) = self.sync_dir(dir).await {
            warn!(dir = %dir.display(), error = %err, "directory fsync failed");
        }
    }

    async fn sync_dir(&self, dir: &Path) -> Result<(), StorageError> {
        if self.fail_dir_sync {
            return Err(StorageError::from_io(
                "fsync dir",
                dir,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "injected failure"),
            ));
        }
        let handle = File::open(dir)
            .await
            .map_err(|e| StorageError::from_io("open dir", dir, e))?;
        handle
            .sync_all()
            .await
            .map_err(|e| StorageError::from_io("fsync dir", dir, e))
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn create_dir_all(&self, dir: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StorageError::from_io("create dir", dir, e))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await
            .map_err(|e| StorageError::from_io("create", path, e))?;
        file.write_all(contents)
            .await
            .map_err(|e| StorageError::from_io("write", path, e))?;
        if self.sync {
            file.sync_all()
                .await
                .map_err(|e| StorageError::from_io("fsync", path, e))?;
        }
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        fs::read(path)
            .await
            .map_err(|e| StorageError::from_io("read", path, e))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        fs::rename(from, to)
            .await
            .map_err(|e| StorageError::from_io("rename", from, e))?;
        self.sync_parent(to).await;
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<(), StorageError> {
        fs::remove_file(path)
            .await
            .map_err(|e| StorageError::from_io("remove", path, e))?;
        self.sync_parent(path).await;
        Ok(())
    }

    async fn list(&self, dir: &Path) -> Result<Vec<String>, StorageError> {
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| StorageError::from_io("read dir", dir, e))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::from_io("read dir", dir, e))?
        {
            // Entries can vanish between readdir and stat; that is not an error.
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn write_read_rename_remove() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");

        storage.write(&a, b"hello").await.unwrap();
        storage.rename(&a, &b).await.unwrap();
        assert_eq!(storage.read(&b).await.unwrap(), b"hello");
        assert!(storage.read(&a).await.unwrap_err().is_not_found());

        storage.remove(&b).await.unwrap();
        assert!(storage.remove(&b).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn rename_of_vanished_source_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new();
        let err = storage
            .rename(&dir.path().join("gone.json"), &dir.path().join("x.json"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_returns_file_names_only() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::without_sync();
        storage.create_dir_all(&dir.path().join("sub")).await.unwrap();
        storage.create_dir_all(&dir.path().join("sub")).await.unwrap();
        storage.write(&dir.path().join("one.json"), b"1").await.unwrap();

        let names = storage.list(dir.path()).await.unwrap();
        assert_eq!(names, vec!["one.json".to_string()]);
    }

    fn failing_dir_sync() -> LocalStorage {
        LocalStorage {
            fail_dir_sync: true,
            ..LocalStorage::new()
        }
    }

    #[tokio::test]
    async fn sync_dir_reports_missing_dir() {
        let dir = tempdir().unwrap();
        let err = LocalStorage::new().sync_dir(&dir.path().join("gone")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn completed_rename_and_remove_survive_dir_sync_failure() {
        let dir = tempdir().unwrap();
        let storage = failing_dir_sync();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");

        storage.write(&a, b"1").await.unwrap();
        storage.rename(&a, &b).await.unwrap();
        assert!(b.exists());
        storage.remove(&b).await.unwrap();
        assert!(!b.exists());
    }

    #[tokio::test]
    async fn claim_survives_dir_sync_failure() {
        use crate::config::QueueConfig;
        use crate::error::BoxError;
        use crate::handler::sync_handler;
        use crate::queue::Queue;
        use std::sync::Arc;

        let dir = tempdir().unwrap();
        let queue = Queue::builder("jobs", QueueConfig::default().with_dir(dir.path()))
            .storage(Arc::new(failing_dir_sync()))
            .open()
            .await
            .unwrap();

        let added = queue.add(&"x").await.unwrap();
        let popped = queue
            .pop(&sync_handler(|_: &crate::domain::Envelope| Ok::<_, BoxError>(())))
            .await
            .unwrap();
        assert_eq!(popped.map(|e| e.id), Some(added.id));
        assert_eq!(queue.counts().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn list_missing_dir_is_not_found() {
        let dir = tempdir().unwrap();
        let err = LocalStorage::new()
            .list(&dir.path().join("missing"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
