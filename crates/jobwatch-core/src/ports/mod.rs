//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部システム（object store, container runtime, 時刻）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - グローバルな client / session は持たない（ハンドルを明示的に渡す）
//! - テストでは impls の InMemory / Scripted 実装に差し替える

pub mod clock;
pub mod container;
pub mod object_store;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::container::{
    ContainerRuntime, ContainerState, ContainerStats, CpuSample, ProcessPhase, RuntimeError,
};
pub use self::object_store::{ObjectStore, StoreError};
