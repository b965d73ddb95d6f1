//! Log objects: documents that load from the remote store and fall back to a
//! compiled-in template when the store cannot deliver them.
//!
//! # 二層構造
//! - **LogDocument**: 型ごとの parse / serialize / template（Certificate, StatusRecord）
//! - **StatusLog<D>**: remote-first の読み込みと fallback、書き込み先（WriteSink）の管理
//!
//! Construction never fails. Either the document came from `bucket/key` and
//! the sink points back at that object, or the document is the type's default
//! template and the sink is the type's fixed local fallback file. Once a log
//! has fallen back it stays local until it is opened again.

pub mod certificate;
pub mod status_record;

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::JobwatchConfig;
use crate::domain::RemoteUri;
use crate::error::{JobwatchError, Result};
use crate::ports::ObjectStore;
use crate::sink::{SinkMode, WriteSink};

pub use certificate::{Certificate, DIVIDER, InstanceInfo, UNASSIGNED};
pub use status_record::{LiveStatusRecord, StatusSnapshot, Usage};

/// A document type that can live in a [`StatusLog`].
pub trait LogDocument: Sized + Send + Sync {
    /// Short name used in log output.
    const KIND: &'static str;

    /// Text of the document a log starts from when the remote copy is unavailable.
    fn default_template() -> &'static str;

    fn parse(raw: &str) -> Result<Self>;

    fn serialize(&self) -> Result<String>;

    /// Where a log of this type writes once it has fallen back.
    fn fallback_path(config: &JobwatchConfig) -> PathBuf;

    /// The parsed default template.
    ///
    /// # Panics
    /// If the compiled-in template does not parse. Both templates are parsed
    /// by the unit tests of their document types, so a shipped build cannot
    /// reach this from [`StatusLog::open`].
    fn fallback() -> Self {
        Self::parse(Self::default_template())
            .unwrap_or_else(|e| panic!("{} template does not parse: {e}", Self::KIND))
    }
}

/// A document plus the destination it is written back to.
#[derive(Debug)]
pub struct StatusLog<D> {
    document: D,
    sink: WriteSink,
}

impl<D: LogDocument> StatusLog<D> {
    /// Load `uri` from `store`, or fall back to the default template.
    pub async fn open(store: Arc<dyn ObjectStore>, uri: &str, config: &JobwatchConfig) -> Self {
        match load_remote::<D>(store.as_ref(), uri, &config.remote_scheme).await {
            Ok((remote, document)) => {
                info!(kind = D::KIND, uri = %remote, "loaded log object from remote store");
                Self {
                    document,
                    sink: WriteSink::remote(store, &remote),
                }
            }
            Err(err) => {
                let path = D::fallback_path(config);
                warn!(
                    kind = D::KIND,
                    uri,
                    error = %err,
                    fallback = %path.display(),
                    "remote log object unavailable, continuing from local template"
                );
                Self {
                    document: D::fallback(),
                    sink: WriteSink::local(path),
                }
            }
        }
    }

    /// Write a brand-new document to `uri` and return the log tracking it.
    ///
    /// Unlike [`StatusLog::open`] this surfaces every failure.
    pub async fn create(
        store: Arc<dyn ObjectStore>,
        uri: &str,
        config: &JobwatchConfig,
        document: D,
    ) -> Result<Self> {
        let remote = RemoteUri::parse(uri, &config.remote_scheme)?;
        let log = Self {
            document,
            sink: WriteSink::remote(store, &remote),
        };
        log.write().await?;
        info!(kind = D::KIND, uri = %remote, "created log object");
        Ok(log)
    }

    /// Persist the whole document through the sink.
    pub async fn write(&self) -> Result<()> {
        self.sink.put(&self.document.serialize()?).await
    }

    /// Persist the whole document to `path`, leaving the sink untouched.
    pub async fn write_local(&self, path: impl AsRef<Path>) -> Result<()> {
        WriteSink::local(path.as_ref())
            .put(&self.document.serialize()?)
            .await
    }

    pub fn sink(&self) -> &WriteSink {
        &self.sink
    }

    /// `true` while writes go to the shared remote object.
    pub fn is_remote(&self) -> bool {
        self.sink.mode() == SinkMode::Remote
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn into_document(self) -> D {
        self.document
    }
}

impl<D> Deref for StatusLog<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.document
    }
}

impl<D> DerefMut for StatusLog<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.document
    }
}

/// Every failure on the way in (bad URI, missing object, unreachable store,
/// bytes that are not UTF-8, a document that does not parse) is reported as
/// `RemoteUnavailable`.
async fn load_remote<D: LogDocument>(
    store: &dyn ObjectStore,
    uri: &str,
    scheme: &str,
) -> Result<(RemoteUri, D)> {
    let remote = RemoteUri::parse(uri, scheme).map_err(unavailable)?;
    let bytes = store
        .get(remote.bucket(), remote.key())
        .await
        .map_err(unavailable)?;
    let raw = String::from_utf8(bytes).map_err(unavailable)?;
    let document = D::parse(&raw).map_err(unavailable)?;
    Ok((remote, document))
}

fn unavailable(err: impl std::fmt::Display) -> JobwatchError {
    JobwatchError::RemoteUnavailable(err.to_string())
}
