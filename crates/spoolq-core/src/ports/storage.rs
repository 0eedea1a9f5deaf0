//! Storage port - the filesystem primitives the queue is built on.
//!
//! Storage はキューが依存するファイル操作の抽象化です。
//! 実装は `impls::LocalStorage`（本番用）と `impls::InMemoryStorage`（テスト用）。
//!
//! # 設計原則
//! - rename はアトミック（POSIX semantics）。claim の排他はこれだけに依存する
//! - "not found" は `StorageError::NotFound` として型で区別する
//!   （エンジン側はエラー文字列を見ない）

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Map an `io::Error`, splitting out `NotFound`.
    pub fn from_io(op: &'static str, path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            StorageError::Io {
                op,
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Filesystem capability used by the queue engine.
///
/// # Thread Safety
/// - `Send + Sync`: one storage is shared by every handle and worker
#[async_trait]
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Create a directory and its parents. Succeeds if it already exists.
    async fn create_dir_all(&self, dir: &Path) -> Result<(), StorageError>;

    /// Create or truncate `path` and write `contents` to it.
    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError>;

    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError>;

    /// Atomically move `from` to `to`, replacing `to` if it exists.
    /// Fails with `NotFound` when `from` no longer exists.
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), StorageError>;

    async fn remove(&self, path: &Path) -> Result<(), StorageError>;

    /// File names (not full paths) of the regular files in `dir`.
    async fn list(&self, dir: &Path) -> Result<Vec<String>, StorageError>;
}
