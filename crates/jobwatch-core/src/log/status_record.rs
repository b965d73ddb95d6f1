//! Status record backed by live container telemetry.
//!
//! # 更新の流れ
//! 1. `get_status`: inspect → StatusSnapshot
//! 2. `get_usage`: stats → Usage（失敗しても 0% / N/A）
//! 3. `get_stdout`: logs → 末尾 `stdout_window` 行
//! 4. `update_file`: 1〜3 をまとめて StatusRecord 全体を置き換える
//! 5. `write`: sink へ書き込み

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{InstanceInfo, LogDocument, StatusLog};
use crate::config::JobwatchConfig;
use crate::domain::{JobStatus, NOT_AVAILABLE, StatusRecord};
use crate::error::Result;
use crate::ports::{ContainerRuntime, ContainerState, ContainerStats, ObjectStore, ProcessPhase};

const TEMPLATE: &str = include_str!("../../templates/status.json");

impl LogDocument for StatusRecord {
    const KIND: &'static str = "status";

    fn default_template() -> &'static str {
        TEMPLATE
    }

    fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn fallback_path(config: &JobwatchConfig) -> PathBuf {
        config.status_fallback()
    }
}

/// Lifecycle fields read from one `inspect`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub status: JobStatus,
    pub reason: String,
    pub started_at: String,
    pub finished_at: String,
}

impl StatusSnapshot {
    pub fn from_state(state: &ContainerState) -> Self {
        let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let error = state.error.clone().filter(|e| !e.is_empty());

        match state.phase {
            ProcessPhase::Created => Self {
                status: JobStatus::Initializing,
                reason: error.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                started_at: NOT_AVAILABLE.to_string(),
                finished_at: NOT_AVAILABLE.to_string(),
            },
            ProcessPhase::Running => Self {
                status: JobStatus::Running,
                reason: error.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                started_at: or_na(&state.started_at),
                finished_at: NOT_AVAILABLE.to_string(),
            },
            ProcessPhase::Exited => Self {
                status: JobStatus::from_exit_code(state.exit_code),
                reason: error.unwrap_or_else(|| format!("exit code {}", state.exit_code)),
                started_at: or_na(&state.started_at),
                finished_at: or_na(&state.finished_at),
            },
        }
    }
}

/// Resource usage at one instant, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Usage {
    pub cpu_total: f64,

    /// `None` when the process is not running or reported no memory figures.
    pub memory_percent: Option<f64>,
}

impl Usage {
    pub fn cpu_display(&self) -> String {
        format!("{:.2}%", self.cpu_total)
    }

    pub fn memory_display(&self) -> String {
        self.memory_percent
            .map(|m| format!("{m:.2}%"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

/// CPU share over the last sampling interval, scaled to the number of online CPUs.
///
/// A process that has not consumed any CPU yet reports 0 without looking at
/// the system counters. So does an interval in which the system counter did
/// not advance.
pub fn cpu_percent(stats: &ContainerStats) -> f64 {
    if stats.cpu.total_usage == 0 {
        return 0.0;
    }
    let cpu_delta = stats.cpu.total_usage as f64 - stats.precpu.total_usage as f64;
    let system_delta = stats.cpu.system_usage as f64 - stats.precpu.system_usage as f64;
    if system_delta <= 0.0 || cpu_delta < 0.0 {
        return 0.0;
    }
    let cpus = f64::from(stats.cpu.online_cpus.max(1));
    cpu_delta / system_delta * cpus * 100.0
}

pub fn memory_percent(stats: &ContainerStats) -> Option<f64> {
    match (stats.memory_usage, stats.memory_limit) {
        (Some(usage), Some(limit)) if limit > 0 => Some(usage as f64 / limit as f64 * 100.0),
        _ => None,
    }
}

/// Escape tabs and carriage returns, then keep the last `window` lines.
///
/// Kept lines stay keyed by their index in the full output.
pub fn clean_output(logs: &str, window: Option<usize>) -> BTreeMap<usize, String> {
    let escaped = logs.replace('\t', "\\t").replace('\r', "\\r");
    let lines: Vec<&str> = escaped.lines().collect();
    let skip = window.map_or(0, |w| lines.len().saturating_sub(w));
    lines
        .into_iter()
        .enumerate()
        .skip(skip)
        .map(|(idx, line)| (idx, line.to_string()))
        .collect()
}

/// A [`StatusRecord`] log bound to the container that executes its dataset.
pub struct LiveStatusRecord {
    log: StatusLog<StatusRecord>,
    runtime: Arc<dyn ContainerRuntime>,
    container: String,
    stdout_window: Option<usize>,
}

impl LiveStatusRecord {
    /// Load the record at `uri`, or start from the default template.
    pub async fn open(
        store: Arc<dyn ObjectStore>,
        runtime: Arc<dyn ContainerRuntime>,
        uri: &str,
        container: impl Into<String>,
        config: &JobwatchConfig,
    ) -> Self {
        Self {
            log: StatusLog::open(store, uri, config).await,
            runtime,
            container: container.into(),
            stdout_window: config.stdout_window,
        }
    }

    /// Write `record` to `uri` and bind it to `container`.
    pub async fn create(
        store: Arc<dyn ObjectStore>,
        runtime: Arc<dyn ContainerRuntime>,
        uri: &str,
        container: impl Into<String>,
        config: &JobwatchConfig,
        record: StatusRecord,
    ) -> Result<Self> {
        Ok(Self {
            log: StatusLog::create(store, uri, config, record).await?,
            runtime,
            container: container.into(),
            stdout_window: config.stdout_window,
        })
    }

    pub async fn get_status(&self) -> Result<StatusSnapshot> {
        let state = self.runtime.inspect(&self.container).await?;
        Ok(StatusSnapshot::from_state(&state))
    }

    /// Never fails: anything the runtime cannot report reads as 0% CPU and no memory figure.
    pub async fn get_usage(&self) -> Usage {
        let running = match self.runtime.inspect(&self.container).await {
            Ok(state) => state.phase == ProcessPhase::Running,
            Err(err) => {
                debug!(container = %self.container, error = %err, "inspect failed, usage unavailable");
                return Usage::default();
            }
        };
        if !running {
            return Usage::default();
        }

        match self.runtime.stats(&self.container).await {
            Ok(stats) => Usage {
                cpu_total: cpu_percent(&stats),
                memory_percent: memory_percent(&stats),
            },
            Err(err) => {
                warn!(container = %self.container, error = %err, "stats unavailable");
                Usage::default()
            }
        }
    }

    pub async fn get_stdout(&self) -> Result<BTreeMap<usize, String>> {
        let logs = self.runtime.logs(&self.container).await?;
        Ok(clean_output(&logs, self.stdout_window))
    }

    /// Recompute every telemetry field and replace the record in one assignment.
    ///
    /// Identity fields (`command`, `input`) are carried over. An `instance`
    /// still at `N/A` takes the container id.
    pub async fn update_file(&mut self) -> Result<()> {
        let snapshot = self.get_status().await?;
        let usage = self.get_usage().await;
        let std = self.get_stdout().await?;

        let current = self.log.document();
        let instance = if current.instance == NOT_AVAILABLE {
            self.container.clone()
        } else {
            current.instance.clone()
        };
        let job_finish = if snapshot.status.is_terminal() {
            snapshot.finished_at
        } else {
            NOT_AVAILABLE.to_string()
        };
        let next = StatusRecord {
            instance,
            command: current.command.clone(),
            input: current.input.clone(),
            status: snapshot.status,
            reason: snapshot.reason,
            memory_usage: usage.memory_display(),
            cpu_usage: usage.cpu_display(),
            job_start: snapshot.started_at,
            job_finish,
            std,
        };

        debug!(container = %self.container, status = %next.status, "status record refreshed");
        *self.log = next;
        Ok(())
    }

    pub async fn write(&self) -> Result<()> {
        self.log.write().await
    }

    pub fn record(&self) -> &StatusRecord {
        self.log.document()
    }

    pub fn log(&self) -> &StatusLog<StatusRecord> {
        &self.log
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Certificate line describing this record at `now`.
    pub fn summary(&self, now: DateTime<Utc>) -> InstanceInfo {
        InstanceInfo::from_record(self.record(), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryObjectStore, ScriptedRuntime};
    use crate::ports::CpuSample;
    use rstest::rstest;

    const URI: &str = "s3://lab/grp/results/job1/logs/DATASET_NAME:a.bam_STATUS.txt";
    const KEY: &str = "grp/results/job1/logs/DATASET_NAME:a.bam_STATUS.txt";

    fn sample(total: u64, system: u64) -> CpuSample {
        CpuSample {
            total_usage: total,
            system_usage: system,
            online_cpus: 2,
        }
    }

    #[test]
    fn default_template_parses() {
        let record = StatusRecord::fallback();
        assert_eq!(record.status, JobStatus::Initializing);
        assert_eq!(record.instance, NOT_AVAILABLE);
        assert!(!record.is_finished());
    }

    #[test]
    fn cpu_percent_scales_by_online_cpus() {
        let stats = ContainerStats {
            cpu: sample(200, 2000),
            precpu: sample(100, 1000),
            ..ContainerStats::default()
        };
        assert!((cpu_percent(&stats) - 20.0).abs() < 1e-9);
    }

    #[rstest]
    #[case::no_system_counters(0, 0)]
    #[case::system_advanced(0, 5000)]
    #[case::system_behind(0, 10)]
    fn zero_cpu_counter_reports_zero(#[case] pre_system: u64, #[case] system: u64) {
        let stats = ContainerStats {
            cpu: sample(0, system),
            precpu: sample(0, pre_system),
            ..ContainerStats::default()
        };
        assert_eq!(cpu_percent(&stats), 0.0);
    }

    #[test]
    fn stalled_system_counter_reports_zero() {
        let stats = ContainerStats {
            cpu: sample(500, 1000),
            precpu: sample(100, 1000),
            ..ContainerStats::default()
        };
        assert_eq!(cpu_percent(&stats), 0.0);
    }

    #[rstest]
    #[case(Some(256), Some(1024), Some(25.0))]
    #[case(Some(256), Some(0), None)]
    #[case(None, Some(1024), None)]
    fn memory_needs_usage_and_positive_limit(
        #[case] usage: Option<u64>,
        #[case] limit: Option<u64>,
        #[case] expected: Option<f64>,
    ) {
        let stats = ContainerStats {
            memory_usage: usage,
            memory_limit: limit,
            ..ContainerStats::default()
        };
        assert_eq!(memory_percent(&stats), expected);
    }

    #[test]
    fn output_is_escaped_and_windowed() {
        let logs = "one\ntwo\tcols\nthree\rback\nfour\n";

        let all = clean_output(logs, None);
        assert_eq!(all.len(), 4);
        assert_eq!(all[&1], "two\\tcols");
        assert_eq!(all[&2], "three\\rback");

        let tail = clean_output(logs, Some(2));
        assert_eq!(tail.keys().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(tail[&3], "four");
    }

    #[rstest]
    #[case::created(ContainerState::created(), JobStatus::Initializing, "N/A")]
    #[case::running(ContainerState::running("2024-03-01T10:00:00Z"), JobStatus::Running, "N/A")]
    #[case::success(
        ContainerState::exited(0, "2024-03-01T10:00:00Z", "2024-03-01T11:00:00Z"),
        JobStatus::Success,
        "exit code 0"
    )]
    #[case::oom(
        ContainerState::exited(137, "2024-03-01T10:00:00Z", "2024-03-01T11:00:00Z"),
        JobStatus::SigkillOom,
        "exit code 137"
    )]
    #[case::failed_with_error(
        ContainerState::exited(2, "2024-03-01T10:00:00Z", "2024-03-01T11:00:00Z")
            .with_error("input not found"),
        JobStatus::Failed,
        "input not found"
    )]
    fn snapshot_from_state(
        #[case] state: ContainerState,
        #[case] status: JobStatus,
        #[case] reason: &str,
    ) {
        let snapshot = StatusSnapshot::from_state(&state);
        assert_eq!(snapshot.status, status);
        assert_eq!(snapshot.reason, reason);
        if status.is_terminal() {
            assert_eq!(snapshot.finished_at, "2024-03-01T11:00:00Z");
        } else {
            assert_eq!(snapshot.finished_at, NOT_AVAILABLE);
        }
    }

    #[tokio::test]
    async fn usage_of_stopped_container_is_zero_and_not_available() {
        let runtime = ScriptedRuntime::new().with_container(
            "c1",
            ContainerState::exited(0, "2024-03-01T10:00:00Z", "2024-03-01T11:00:00Z"),
        );
        runtime.set_stats(
            "c1",
            ContainerStats {
                cpu: sample(200, 2000),
                precpu: sample(100, 1000),
                memory_usage: Some(10),
                memory_limit: Some(100),
            },
        );
        let record = LiveStatusRecord::open(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(runtime),
            URI,
            "c1",
            &JobwatchConfig::default(),
        )
        .await;

        let usage = record.get_usage().await;
        assert_eq!(usage, Usage::default());
        assert_eq!(usage.cpu_display(), "0.00%");
        assert_eq!(usage.memory_display(), "N/A");
    }

    #[tokio::test]
    async fn update_file_replaces_telemetry_and_keeps_identity() {
        let store = Arc::new(InMemoryObjectStore::new());
        let runtime = Arc::new(
            ScriptedRuntime::new()
                .with_container("c1", ContainerState::running("2024-03-01T10:00:00Z")),
        );
        runtime.set_stats(
            "c1",
            ContainerStats {
                cpu: sample(200, 2000),
                precpu: sample(100, 1000),
                memory_usage: Some(512),
                memory_limit: Some(2048),
            },
        );
        runtime.set_logs("c1", "start\naligning\t50%\n");

        let mut record = LiveStatusRecord::create(
            store.clone(),
            runtime.clone(),
            URI,
            "c1",
            &JobwatchConfig::default(),
            StatusRecord::initializing(NOT_AVAILABLE, "align", "grp/inputs/a.bam"),
        )
        .await
        .unwrap();

        record.update_file().await.unwrap();
        let current = record.record();
        assert_eq!(current.instance, "c1");
        assert_eq!(current.command, "align");
        assert_eq!(current.status, JobStatus::Running);
        assert_eq!(current.cpu_usage, "20.00%");
        assert_eq!(current.memory_usage, "25.00%");
        assert_eq!(current.job_start, "2024-03-01T10:00:00Z");
        assert_eq!(current.job_finish, NOT_AVAILABLE);
        assert_eq!(current.std[&1], "aligning\\t50%");

        runtime.set_state(
            "c1",
            ContainerState::exited(137, "2024-03-01T10:00:00Z", "2024-03-01T10:30:00Z"),
        );
        record.update_file().await.unwrap();
        record.write().await.unwrap();

        let stored: StatusRecord =
            serde_json::from_str(&store.text("lab", KEY).unwrap()).unwrap();
        assert_eq!(stored.status, JobStatus::SigkillOom);
        assert_eq!(stored.job_finish, "2024-03-01T10:30:00Z");
        assert_eq!(stored.memory_usage, NOT_AVAILABLE);
        assert!(stored.is_finished());
    }

    #[tokio::test]
    async fn unknown_container_surfaces_runtime_error() {
        let mut record = LiveStatusRecord::open(
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(ScriptedRuntime::new()),
            URI,
            "missing",
            &JobwatchConfig::default(),
        )
        .await;

        let err = record.update_file().await.unwrap_err();
        assert!(matches!(err, crate::JobwatchError::Runtime(_)));
        assert_eq!(record.record().status, JobStatus::Initializing);
    }
}
