//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **LocalStorage**: tokio::fs + fsync（本番用）
//! - **InMemoryStorage**: プロセス内ストレージ（テスト用、障害注入つき）

pub mod local;
pub mod memory;

pub use self::local::LocalStorage;
pub use self::memory::InMemoryStorage;
