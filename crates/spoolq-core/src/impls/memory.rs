//! InMemoryStorage - テスト用のストレージ
//!
//! # 実装詳細
//! - Mutex<State> で files と dirs を管理（rename は 1 回のロック内で完結 = アトミック）
//! - POSIX と同様、親ディレクトリがなければ NotFound
//! - 障害注入: write / rename / remove を失敗させられる

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{Storage, StorageError};

#[derive(Debug, Default)]
struct State {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl State {
    fn has_parent_dir(&self, path: &Path) -> bool {
        path.parent().is_some_and(|p| self.dirs.contains(p))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStorage {
    state: Mutex<State>,
    fail_removes: AtomicBool,
    fail_writes: AtomicBool,
    fail_renames: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `remove` fail with a permission error.
    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `write` fail with a permission error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `rename` fail with a permission error.
    pub fn fail_renames(&self, fail: bool) {
        self.fail_renames.store(fail, Ordering::SeqCst);
    }

    /// Place a file directly, creating its parent directory.
    pub fn insert(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            state.dirs.insert(parent.to_path_buf());
        }
        state.files.insert(path, contents.into());
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.lock().files.contains_key(path.as_ref())
    }

    /// Full paths of the files directly inside `dir`.
    pub fn files_in(&self, dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let dir = dir.as_ref();
        self.lock()
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(path: &Path) -> StorageError {
    StorageError::NotFound {
        path: path.to_path_buf(),
    }
}

fn injected(op: &'static str, path: &Path) -> StorageError {
    StorageError::Io {
        op,
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::PermissionDenied, "injected failure"),
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_dir_all(&self, dir: &Path) -> Result<(), StorageError> {
        let mut state = self.lock();
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            state.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("write", path));
        }
        let mut state = self.lock();
        if !state.has_parent_dir(path) {
            return Err(not_found(path));
        }
        state.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        if self.fail_renames.load(Ordering::SeqCst) {
            return Err(injected("rename", from));
        }
        let mut state = self.lock();
        if !state.has_parent_dir(to) {
            return Err(not_found(to));
        }
        let contents = state.files.remove(from).ok_or_else(|| not_found(from))?;
        state.files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<(), StorageError> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(injected("remove", path));
        }
        self.lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }

    async fn list(&self, dir: &Path) -> Result<Vec<String>, StorageError> {
        let state = self.lock();
        if !state.dirs.contains(dir) {
            return Err(not_found(dir));
        }
        Ok(state
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect())
    }
}
