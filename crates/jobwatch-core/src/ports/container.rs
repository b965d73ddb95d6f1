//! ContainerRuntime port - 実行中プロセスのテレメトリ取得
//!
//! StatusRecord の update_file はこの port から状態・リソース使用量・ログを取得します。
//!
//! # 実装
//! - 本番: Docker Engine API などのアダプタ（このクレートの外）
//! - テスト: impls::ScriptedRuntime

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no such container: {0}")]
    NoSuchContainer(String),

    #[error("container runtime failure: {0}")]
    Failure(String),
}

/// Lifecycle phase as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessPhase {
    /// Created but never started.
    Created,
    Running,
    Exited,
}

/// Result of inspecting a container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerState {
    pub phase: ProcessPhase,

    /// Meaningful only once the process has exited.
    pub exit_code: i64,

    /// Error text the runtime attached to the exit, if any.
    pub error: Option<String>,

    /// ISO-8601 timestamps.
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl ContainerState {
    pub fn created() -> Self {
        Self {
            phase: ProcessPhase::Created,
            exit_code: 0,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn running(started_at: impl Into<String>) -> Self {
        Self {
            phase: ProcessPhase::Running,
            exit_code: 0,
            error: None,
            started_at: Some(started_at.into()),
            finished_at: None,
        }
    }

    pub fn exited(
        exit_code: i64,
        started_at: impl Into<String>,
        finished_at: impl Into<String>,
    ) -> Self {
        Self {
            phase: ProcessPhase::Exited,
            exit_code,
            error: None,
            started_at: Some(started_at.into()),
            finished_at: Some(finished_at.into()),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Cumulative CPU counters at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuSample {
    /// Total CPU time consumed by the process, in nanoseconds.
    pub total_usage: u64,

    /// Total CPU time of the host, in nanoseconds.
    pub system_usage: u64,

    pub online_cpus: u32,
}

/// One stats read: the current sample plus the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
    pub cpu: CpuSample,
    pub precpu: CpuSample,
    pub memory_usage: Option<u64>,
    pub memory_limit: Option<u64>,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn inspect(&self, container: &str) -> Result<ContainerState, RuntimeError>;

    async fn stats(&self, container: &str) -> Result<ContainerStats, RuntimeError>;

    /// Captured stdout and stderr, interleaved as the runtime stored them.
    async fn logs(&self, container: &str) -> Result<String, RuntimeError>;
}
