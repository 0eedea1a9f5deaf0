//! Ports - 抽象化レイヤー
//!
//! キューエンジンが外部（ファイルシステム、時計、ID 生成）に依存する箇所を
//! trait として定義します。実装は `impls` にあります。
//!
//! # 設計原則
//! - ディレクトリ一覧が唯一の正本（in-memory のインデックスは持たない）
//! - 排他制御は `Storage::rename` のアトミック性のみ

pub mod clock;
pub mod id_generator;
pub mod storage;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::storage::{Storage, StorageError};
