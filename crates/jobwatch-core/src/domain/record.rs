//! Per-dataset status record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::status::JobStatus;

/// Sentinel for a field whose value is not known (yet).
pub const NOT_AVAILABLE: &str = "N/A";

/// Status of one (job, dataset) execution attempt.
///
/// Field order is the serialized order, so a record stays readable when
/// opened by hand. Keys that are not listed here (the old `stdout` /
/// `stderr` pair, for example) are dropped when a record is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub instance: String,
    pub command: String,
    pub input: String,
    pub status: JobStatus,
    pub reason: String,
    pub memory_usage: String,
    pub cpu_usage: String,
    pub job_start: String,
    pub job_finish: String,

    /// Captured output, keyed by line index.
    #[serde(default)]
    pub std: BTreeMap<usize, String>,
}

impl StatusRecord {
    /// The record the submission layer writes before the dataset starts running.
    pub fn initializing(
        instance: impl Into<String>,
        command: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            instance: instance.into(),
            command: command.into(),
            input: input.into(),
            status: JobStatus::Initializing,
            reason: NOT_AVAILABLE.to_string(),
            memory_usage: NOT_AVAILABLE.to_string(),
            cpu_usage: NOT_AVAILABLE.to_string(),
            job_start: NOT_AVAILABLE.to_string(),
            job_finish: NOT_AVAILABLE.to_string(),
            std: BTreeMap::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.job_finish != NOT_AVAILABLE
    }
}

/// Object key of the status record for `dataset` under `prefix`.
///
/// Only the last path segment of the dataset names the key:
/// `("grp/results/job1/logs", "grp/inputs/a.bam")` → `grp/results/job1/logs/DATASET_NAME:a.bam_STATUS.txt`.
pub fn status_key(prefix: &str, dataset: &str) -> String {
    let name = dataset.rsplit('/').next().unwrap_or(dataset);
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("DATASET_NAME:{name}_STATUS.txt")
    } else {
        format!("{prefix}/DATASET_NAME:{name}_STATUS.txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_initializing_and_unfinished() {
        let record = StatusRecord::initializing("i-0abc", "run.sh", "grp/inputs/a.bam");
        assert_eq!(record.status, JobStatus::Initializing);
        assert!(!record.is_finished());
        assert!(record.std.is_empty());
    }

    #[test]
    fn serializes_fields_in_fixed_order() {
        let record = StatusRecord::initializing("i-0abc", "run.sh", "a.bam");
        let json = serde_json::to_string(&record).unwrap();

        let order = [
            "\"instance\"",
            "\"command\"",
            "\"input\"",
            "\"status\"",
            "\"reason\"",
            "\"memory_usage\"",
            "\"cpu_usage\"",
            "\"job_start\"",
            "\"job_finish\"",
            "\"std\"",
        ];
        let positions: Vec<usize> = order.iter().map(|f| json.find(f).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
    }

    #[test]
    fn legacy_output_fields_are_dropped() {
        let raw = r#"{
            "instance": "i-1", "command": "c", "input": "d",
            "status": "RUNNING", "reason": "N/A",
            "memory_usage": "N/A", "cpu_usage": "N/A",
            "job_start": "N/A", "job_finish": "N/A",
            "stdout": "old", "stderr": "older"
        }"#;
        let record: StatusRecord = serde_json::from_str(raw).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("stdout"));
        assert!(!json.contains("stderr"));
        assert!(json.contains("\"std\":{}"));
    }

    #[test]
    fn status_key_uses_dataset_basename() {
        assert_eq!(
            status_key("grp/results/job1/logs/", "grp/inputs/a.bam"),
            "grp/results/job1/logs/DATASET_NAME:a.bam_STATUS.txt"
        );
        assert_eq!(status_key("", "a.bam"), "DATASET_NAME:a.bam_STATUS.txt");
    }
}
