//! Write sinks: where a log object persists itself.
//!
//! A sink is either a remote object (`bucket/key` in an [`ObjectStore`]) or a
//! local file. Both `put` variants replace the destination as a whole, so a
//! reader never observes a half-written record:
//! - remote: a single object put
//! - local: write to a hidden sibling file, then rename over the destination

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::domain::RemoteUri;
use crate::error::{JobwatchError, Result};
use crate::ports::ObjectStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    Remote,
    Local,
}

impl FromStr for SinkMode {
    type Err = JobwatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "remote" => Ok(SinkMode::Remote),
            "local" => Ok(SinkMode::Local),
            other => Err(JobwatchError::Configuration(format!(
                "unknown sink mode {other:?} (expected \"remote\" or \"local\")"
            ))),
        }
    }
}

impl fmt::Display for SinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkMode::Remote => f.write_str("remote"),
            SinkMode::Local => f.write_str("local"),
        }
    }
}

#[derive(Clone)]
pub enum WriteSink {
    Remote {
        store: Arc<dyn ObjectStore>,
        bucket: String,
        key: String,
    },
    Local {
        path: PathBuf,
    },
}

impl fmt::Debug for WriteSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteSink::Remote { bucket, key, .. } => f
                .debug_struct("Remote")
                .field("bucket", bucket)
                .field("key", key)
                .finish_non_exhaustive(),
            WriteSink::Local { path } => f.debug_struct("Local").field("path", path).finish(),
        }
    }
}

impl WriteSink {
    pub fn builder(mode: SinkMode) -> WriteSinkBuilder {
        WriteSinkBuilder::new(mode)
    }

    pub fn remote(store: Arc<dyn ObjectStore>, uri: &RemoteUri) -> Self {
        WriteSink::Remote {
            store,
            bucket: uri.bucket().to_string(),
            key: uri.key().to_string(),
        }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        WriteSink::Local { path: path.into() }
    }

    pub fn mode(&self) -> SinkMode {
        match self {
            WriteSink::Remote { .. } => SinkMode::Remote,
            WriteSink::Local { .. } => SinkMode::Local,
        }
    }

    /// Replace the destination with `body`.
    pub async fn put(&self, body: &str) -> Result<()> {
        match self {
            WriteSink::Remote { store, bucket, key } => {
                debug!(bucket = %bucket, key = %key, bytes = body.len(), "put remote object");
                store.put(bucket, key, body.as_bytes().to_vec()).await?;
            }
            WriteSink::Local { path } => {
                debug!(path = %path.display(), bytes = body.len(), "put local file");
                replace_file(path, body.as_bytes()).await?;
            }
        }
        Ok(())
    }

    /// Replace the destination with `body` rendered as pretty-printed JSON.
    pub async fn put_structured<T: Serialize + ?Sized>(&self, body: &T) -> Result<()> {
        let text = serde_json::to_string_pretty(body)?;
        self.put(&text).await
    }
}

/// Fail-fast construction of a [`WriteSink`] from a mode tag plus loose fields.
///
/// # 使用例
/// ```ignore
/// let sink = WriteSink::builder("remote".parse()?)
///     .store(store)
///     .bucket("lab-bucket")
///     .key("grp/results/job1/certificate.txt")
///     .build()?;
/// ```
pub struct WriteSinkBuilder {
    mode: SinkMode,
    store: Option<Arc<dyn ObjectStore>>,
    bucket: Option<String>,
    key: Option<String>,
    path: Option<PathBuf>,
}

impl WriteSinkBuilder {
    pub fn new(mode: SinkMode) -> Self {
        Self {
            mode,
            store: None,
            bucket: None,
            key: None,
            path: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// # 検証
    /// - remote: store, bucket, key が必須
    /// - local: path が必須
    ///
    /// 不足があれば `JobwatchError::Configuration` を返す
    pub fn build(self) -> Result<WriteSink> {
        let mode = self.mode;
        let missing = move |field: &str| {
            JobwatchError::Configuration(format!("{mode} sink requires `{field}`"))
        };
        match mode {
            SinkMode::Remote => {
                let store = self.store.ok_or_else(|| missing("store"))?;
                let bucket = non_empty(self.bucket).ok_or_else(|| missing("bucket"))?;
                let key = non_empty(self.key).ok_or_else(|| missing("key"))?;
                Ok(WriteSink::Remote { store, bucket, key })
            }
            SinkMode::Local => {
                let path = self
                    .path
                    .filter(|p| !p.as_os_str().is_empty())
                    .ok_or_else(|| missing("path"))?;
                Ok(WriteSink::Local { path })
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Each put stages into its own uniquely named sibling, so concurrent puts to
/// one path never share a staging file. The last rename wins.
async fn replace_file(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    tokio::fs::create_dir_all(&parent).await?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let path = path.to_path_buf();
    let body = body.to_vec();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut staging = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".partial")
            .tempfile_in(&parent)?;
        staging.write_all(&body)?;
        staging.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await?
}
