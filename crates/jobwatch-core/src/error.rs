//! Errors - エラー型と分類

use thiserror::Error;

use crate::ports::{RuntimeError, StoreError};

/// ErrorKind は実行エラーの運用分類
///
/// - Transient: 一時的なエラー（再構築・再実行で回復しうる）
/// - Permanent: データや呼び出しが壊れている（再試行しても無意味）
/// - Infrastructure: store / runtime / filesystem の障害
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum JobwatchError {
    /// A write destination is missing a field its mode requires.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Corrupted certificate text or malformed timestamps.
    #[error("format error: {0}")]
    Format(String),

    /// The initial state could not be read from the remote store.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("line offset {loc} is outside the writable region ({size} lines)")]
    IndexOutOfRange { loc: usize, size: usize },

    /// Usage record without a start or end timestamp.
    #[error("incomplete usage record for instance {0}")]
    IncompleteRecord(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl JobwatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobwatchError::RemoteUnavailable(_) | JobwatchError::IncompleteRecord(_) => {
                ErrorKind::Transient
            }
            JobwatchError::Configuration(_)
            | JobwatchError::Format(_)
            | JobwatchError::IndexOutOfRange { .. }
            | JobwatchError::Json(_) => ErrorKind::Permanent,
            JobwatchError::Store(_) | JobwatchError::Runtime(_) | JobwatchError::Io(_) => {
                ErrorKind::Infrastructure
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, JobwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_out_of_range_names_offset_and_size() {
        let err = JobwatchError::IndexOutOfRange { loc: 9, size: 4 };
        assert_eq!(
            err.to_string(),
            "line offset 9 is outside the writable region (4 lines)"
        );
        assert_eq!(err.kind(), ErrorKind::Permanent);
    }

    #[test]
    fn store_errors_are_infrastructure() {
        let err: JobwatchError = StoreError::Unreachable("connection refused".into()).into();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert!(err.to_string().contains("connection refused"));
    }
}
