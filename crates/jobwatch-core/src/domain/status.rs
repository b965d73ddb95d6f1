//! Execution status of one dataset run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Exit code the platform reports when the kernel OOM killer sent SIGKILL.
pub const OOM_KILL_EXIT_CODE: i64 = 137;

/// Status of a dataset run.
///
/// State transitions:
/// - Initializing -> Running -> Success
/// - Initializing -> Running -> Failed | SigkillOom
///
/// `NotAvailable` is what a record holds when the status could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(rename = "INITIALIZING")]
    Initializing,

    #[serde(rename = "RUNNING")]
    Running,

    #[serde(rename = "SUCCESS")]
    Success,

    #[serde(rename = "FAILED")]
    Failed,

    #[serde(rename = "SIGKILL_OOM")]
    SigkillOom,

    #[serde(rename = "N/A")]
    NotAvailable,
}

impl JobStatus {
    /// Status of a process that has exited with `code`.
    pub fn from_exit_code(code: i64) -> Self {
        match code {
            0 => JobStatus::Success,
            OOM_KILL_EXIT_CODE => JobStatus::SigkillOom,
            _ => JobStatus::Failed,
        }
    }

    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failed | JobStatus::SigkillOom
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Initializing => "INITIALIZING",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
            JobStatus::SigkillOom => "SIGKILL_OOM",
            JobStatus::NotAvailable => "N/A",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
