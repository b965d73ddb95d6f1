//! jobwatch-core
//!
//! Status logging and usage analytics for jobs run on a remote compute platform.
//!
//! # モジュール構成
//! - **domain**: データモデル（RemoteUri, JobStatus, StatusRecord, UsageRecord, JobAggregate）
//! - **ports**: 外部システムへの抽象化（ObjectStore, ContainerRuntime, Clock）
//! - **impls**: ports の開発用・テスト用実装（InMemoryObjectStore, ScriptedRuntime）
//! - **sink**: 書き込み先の抽象化（remote object / local file）
//! - **log**: Certificate と StatusRecord のログオブジェクト（remote-first, local fallback）
//! - **analytics**: 月次コスト集計と並列度の計算
//! - **config**: 設定
//! - **error**: エラー型

pub mod analytics;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod log;
pub mod ports;
pub mod sink;

pub use config::JobwatchConfig;
pub use error::{ErrorKind, JobwatchError, Result};
