//! Typed - 型付き Job API
//!
//! envelope の payload は `serde_json::Value` のまま保存されます。
//! このモジュールは handler 側で payload を型に decode してから渡します。
//!
//! # 二層構造
//! - **表層（Typed）**: `Job` trait, `Handler<T>` trait - 型安全
//! - **内部（Dyn）**: `JobHandler` trait - `Queue::pop` が受け取る形

pub mod handler;
pub mod job;

pub use self::handler::{Handler, TypedHandler};
pub use self::job::Job;
