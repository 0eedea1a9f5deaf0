//! spoolq-core
//!
//! Disk-resident job queue in the maildir style: one directory per state,
//! atomic rename as the only lock.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, envelope, filename）
//! - **ports**: 抽象化レイヤー（Storage, Clock, IdGenerator）
//! - **impls**: 実装（LocalStorage, InMemoryStorage）
//! - **queue**: Queue エンジン（add / list / count / pop / empty）
//! - **handler**: pop に渡す handler
//! - **typed**: 型付き Job API（Job trait, Handler trait, TypedHandler）
//! - **worker**: pop を回し続けるワーカー群
//! - **config** / **error** / **observability**

pub mod config;
pub mod domain;
pub mod error;
pub mod handler;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod typed;
pub mod worker;

pub use crate::config::QueueConfig;
pub use crate::domain::{Envelope, JobId};
pub use crate::error::{BoxError, ConfigError, HandlerFailure, QueueError, Result};
pub use crate::handler::{JobHandler, handler_fn, sync_handler};
pub use crate::observability::QueueCounts;
pub use crate::queue::{Disposition, PendingJob, Queue, QueueBuilder};
pub use crate::worker::WorkerGroup;
